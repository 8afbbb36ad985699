//! Pipeline error taxonomy.
//!
//! Errors are classified by how the caller should react:
//! - Authorization failures are recovered inside the sources via a one-shot
//!   token refresh; when exhausted, the source degrades to an empty result.
//! - Transient fetch failures degrade the affected source to empty.
//! - Generation failures never surface at all (fallback draft/summary).
//! - Store failures are fatal for the operation and surface a retry
//!   affordance to the caller.

use thiserror::Error;

use crate::db::DbError;
use crate::google_api::GoogleApiError;

#[derive(Debug, Error)]
pub enum BriefError {
    #[error("Not authenticated — connect Google first")]
    NotAuthenticated,

    #[error("Google API error: {0}")]
    Google(#[from] GoogleApiError),

    #[error("Store error: {0}")]
    Store(#[from] DbError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BriefError {
    /// Whether retrying the same operation may succeed without user action.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BriefError::Google(_) | BriefError::Store(_))
    }

    /// A short user-facing recovery suggestion.
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            BriefError::NotAuthenticated => "Run `daybrief auth` to connect your Google account.",
            BriefError::Google(_) => "Check your connection and try again.",
            BriefError::Store(_) => "Retry; if it persists, check disk space and permissions.",
            BriefError::Config(_) => "Check ~/.daybrief/config.json.",
            BriefError::Io(_) => "Check file permissions and disk space.",
        }
    }
}
