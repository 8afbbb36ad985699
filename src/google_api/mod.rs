//! Native Google API clients (Gmail, Calendar, OAuth) via reqwest.
//!
//! Modules:
//! - auth: OAuth2 identity client (refresh grant + browser consent flow)
//! - gmail: Gmail API v1 (list, per-message get, send)
//! - calendar: Google Calendar API v3 (day-window event list)
//! - classify: pure importance filter and task-badge derivation

pub mod auth;
pub mod calendar;
pub mod classify;
pub mod gmail;

use std::sync::Arc;

use crate::db::BriefDb;

/// OAuth2 scopes used by the pipeline.
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/gmail.readonly",
    "https://www.googleapis.com/auth/gmail.send",
    "https://www.googleapis.com/auth/calendar.readonly",
];

#[derive(Debug, thiserror::Error)]
pub enum GoogleApiError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Token expired or revoked")]
    AuthExpired,
    #[error("OAuth client not configured")]
    NotConfigured,
    #[error("OAuth flow cancelled")]
    FlowCancelled,
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Identity client seam: obtains a fresh bearer token for the given scopes.
///
/// Implementations distinguish "not configured" (`NotConfigured`), "user
/// declined" (`FlowCancelled`), and transient failures so callers can log
/// the reason, even though the pipeline collapses all of them to
/// cannot-proceed.
#[async_trait::async_trait]
pub trait IdentityClient: Send + Sync {
    async fn request_access_token(&self, scopes: &[&str]) -> Result<String, GoogleApiError>;
}

/// Obtains and persists bearer tokens for the Google API clients.
///
/// No expiry tracking is kept; callers invoke `refresh` reactively after a
/// downstream 401/403 and persist the result themselves via
/// `BriefDb::save_access_token`.
pub struct TokenProvider {
    db: Arc<BriefDb>,
    identity: Arc<dyn IdentityClient>,
}

impl TokenProvider {
    pub fn new(db: Arc<BriefDb>, identity: Arc<dyn IdentityClient>) -> Self {
        Self { db, identity }
    }

    /// Read the last-saved access token from the user's profile record.
    pub fn stored_token(&self, user_id: &str) -> Option<String> {
        match self.db.get_user(user_id) {
            Ok(Some(profile)) => profile.access_token,
            Ok(None) => None,
            Err(e) => {
                log::warn!("Failed to read stored token for {}: {}", user_id, e);
                None
            }
        }
    }

    /// Interactively re-authorize and return a new bearer token.
    ///
    /// Has no persistence side effect of its own — callers persist the
    /// token. Returns `None` when the identity client is unavailable,
    /// misconfigured, or the user declined; callers must treat `None` as
    /// cannot-proceed, not retry in a loop.
    pub async fn refresh(&self, scopes: &[&str]) -> Option<String> {
        match self.identity.request_access_token(scopes).await {
            Ok(token) => Some(token),
            Err(GoogleApiError::NotConfigured) => {
                log::warn!("Identity client not configured; cannot refresh token");
                None
            }
            Err(GoogleApiError::FlowCancelled) => {
                log::warn!("User declined re-authorization");
                None
            }
            Err(e) => {
                log::warn!("Token refresh failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticIdentity(Option<&'static str>);

    #[async_trait::async_trait]
    impl IdentityClient for StaticIdentity {
        async fn request_access_token(&self, _scopes: &[&str]) -> Result<String, GoogleApiError> {
            match self.0 {
                Some(token) => Ok(token.to_string()),
                None => Err(GoogleApiError::NotConfigured),
            }
        }
    }

    fn provider(identity: StaticIdentity) -> (tempfile::TempDir, TokenProvider) {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(BriefDb::open_at(dir.path().join("t.db")).unwrap());
        (dir, TokenProvider::new(db, Arc::new(identity)))
    }

    #[tokio::test]
    async fn test_stored_token_absent_user() {
        let (_dir, tokens) = provider(StaticIdentity(None));
        assert!(tokens.stored_token("nobody").is_none());
    }

    #[tokio::test]
    async fn test_refresh_returns_token_without_persisting() {
        let (_dir, tokens) = provider(StaticIdentity(Some("ya29.fresh")));
        let token = tokens.refresh(SCOPES).await;
        assert_eq!(token.as_deref(), Some("ya29.fresh"));
        // refresh itself must not write the profile record
        assert!(tokens.stored_token("me").is_none());
    }

    #[tokio::test]
    async fn test_refresh_unconfigured_is_none() {
        let (_dir, tokens) = provider(StaticIdentity(None));
        assert!(tokens.refresh(SCOPES).await.is_none());
    }
}
