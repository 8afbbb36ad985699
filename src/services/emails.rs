//! Email Source — candidate fetch, classification, and outbound send.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::db::BriefDb;
use crate::google_api::classify;
use crate::google_api::gmail::{self, MailClient};
use crate::google_api::{GoogleApiError, TokenProvider, SCOPES};
use crate::types::{DraftStatus, EmailDraft, EmailItem};

/// Candidate query: unread OR important OR received within the last day.
pub const CANDIDATE_QUERY: &str = "is:unread OR is:important OR newer_than:1d";

/// Fixed page size for the candidate list.
pub const CANDIDATE_PAGE_SIZE: u32 = 50;

pub struct EmailSource {
    mail: Arc<dyn MailClient>,
    tokens: Arc<TokenProvider>,
    db: Arc<BriefDb>,
    allowlist: Vec<String>,
}

impl EmailSource {
    pub fn new(
        mail: Arc<dyn MailClient>,
        tokens: Arc<TokenProvider>,
        db: Arc<BriefDb>,
        allowlist: Vec<String>,
    ) -> Self {
        Self {
            mail,
            tokens,
            db,
            allowlist,
        }
    }

    /// Fetch the important-email subset for the brief.
    pub async fn fetch_important(&self, user_id: &str) -> Vec<EmailItem> {
        self.fetch_important_at(user_id, Utc::now()).await
    }

    /// Same as `fetch_important` with an injected `now` for the recency rule.
    pub async fn fetch_important_at(&self, user_id: &str, now: DateTime<Utc>) -> Vec<EmailItem> {
        let Some(mut token) = self.tokens.stored_token(user_id) else {
            log::warn!("No stored token for {}; skipping email fetch", user_id);
            return Vec::new();
        };

        let ids = match self
            .mail
            .list_message_ids(&token, CANDIDATE_QUERY, CANDIDATE_PAGE_SIZE)
            .await
        {
            Ok(ids) => ids,
            Err(GoogleApiError::AuthExpired) => {
                let Some(fresh) = self.refresh_and_persist(user_id).await else {
                    return Vec::new();
                };
                token = fresh;
                match self
                    .mail
                    .list_message_ids(&token, CANDIDATE_QUERY, CANDIDATE_PAGE_SIZE)
                    .await
                {
                    Ok(ids) => ids,
                    Err(e) => {
                        log::warn!("Email list failed after refresh: {}", e);
                        return Vec::new();
                    }
                }
            }
            Err(e) => {
                log::warn!("Email list failed: {}", e);
                return Vec::new();
            }
        };

        // One detail request per message; individual failures are skipped.
        let mut emails = Vec::with_capacity(ids.len());
        for id in &ids {
            match self.mail.get_message(&token, id).await {
                Ok(email) => emails.push(email),
                Err(e) => {
                    log::debug!("Skipping message {}: {}", id, e);
                }
            }
        }

        classify::filter_important(emails, &self.allowlist, now)
    }

    /// Send a reply draft. On success the draft's status flips to `Sent`
    /// locally; the canonical sent state lives with the mail provider.
    pub async fn send_draft(&self, user_id: &str, draft: &mut EmailDraft) -> bool {
        let Some(token) = self.tokens.stored_token(user_id) else {
            log::warn!("No stored token for {}; cannot send", user_id);
            return false;
        };

        let raw = gmail::encode_draft(draft);
        let sent = match self.mail.send_raw(&token, &raw).await {
            Ok(()) => true,
            Err(GoogleApiError::AuthExpired) => {
                let Some(fresh) = self.refresh_and_persist(user_id).await else {
                    return false;
                };
                match self.mail.send_raw(&fresh, &raw).await {
                    Ok(()) => true,
                    Err(e) => {
                        log::warn!("Send failed after refresh: {}", e);
                        false
                    }
                }
            }
            Err(e) => {
                log::warn!("Send failed: {}", e);
                false
            }
        };

        if sent {
            draft.status = DraftStatus::Sent;
        }
        sent
    }

    /// One-shot reactive refresh: obtain a fresh token and persist it to
    /// the profile record before the single retry.
    async fn refresh_and_persist(&self, user_id: &str) -> Option<String> {
        let fresh = self.tokens.refresh(SCOPES).await?;
        if let Err(e) = self.db.save_access_token(user_id, &fresh) {
            log::warn!("Failed to persist refreshed token: {}", e);
        }
        Some(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google_api::IdentityClient;
    use crate::types::Priority;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticIdentity {
        token: Option<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl IdentityClient for StaticIdentity {
        async fn request_access_token(&self, _scopes: &[&str]) -> Result<String, GoogleApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.token {
                Some(t) => Ok(t.to_string()),
                None => Err(GoogleApiError::NotConfigured),
            }
        }
    }

    /// Mail mock: rejects `expired_token`, accepts anything else.
    struct MockMail {
        expired_token: &'static str,
        list_calls: AtomicUsize,
        send_calls: AtomicUsize,
        message_ids: Vec<&'static str>,
    }

    impl MockMail {
        fn new(expired_token: &'static str, message_ids: Vec<&'static str>) -> Self {
            Self {
                expired_token,
                list_calls: AtomicUsize::new(0),
                send_calls: AtomicUsize::new(0),
                message_ids,
            }
        }

        fn sample_email(id: &str, now: DateTime<Utc>) -> EmailItem {
            EmailItem {
                id: id.to_string(),
                thread_id: format!("t-{}", id),
                from: "Jane <jane@co.com>".to_string(),
                subject: "Please review the deck".to_string(),
                snippet: "can you check this by Friday".to_string(),
                date: now - chrono::Duration::hours(1),
                is_read: false,
                priority: Priority::Medium,
            }
        }
    }

    #[async_trait::async_trait]
    impl MailClient for MockMail {
        async fn list_message_ids(
            &self,
            access_token: &str,
            _query: &str,
            _max_results: u32,
        ) -> Result<Vec<String>, GoogleApiError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if access_token == self.expired_token {
                return Err(GoogleApiError::AuthExpired);
            }
            Ok(self.message_ids.iter().map(|s| s.to_string()).collect())
        }

        async fn get_message(
            &self,
            access_token: &str,
            message_id: &str,
        ) -> Result<EmailItem, GoogleApiError> {
            if access_token == self.expired_token {
                return Err(GoogleApiError::AuthExpired);
            }
            if message_id == "broken" {
                return Err(GoogleApiError::ApiError {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            Ok(Self::sample_email(message_id, Utc::now()))
        }

        async fn send_raw(&self, access_token: &str, _raw: &str) -> Result<(), GoogleApiError> {
            self.send_calls.fetch_add(1, Ordering::SeqCst);
            if access_token == self.expired_token {
                return Err(GoogleApiError::AuthExpired);
            }
            Ok(())
        }
    }

    fn build_source(
        mail: Arc<MockMail>,
        identity_token: Option<&'static str>,
        stored_token: Option<&str>,
    ) -> (tempfile::TempDir, Arc<BriefDb>, Arc<StaticIdentity>, EmailSource) {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(BriefDb::open_at(dir.path().join("t.db")).unwrap());
        if let Some(token) = stored_token {
            db.save_access_token("u1", token).unwrap();
        }
        let identity = Arc::new(StaticIdentity {
            token: identity_token,
            calls: AtomicUsize::new(0),
        });
        let tokens = Arc::new(TokenProvider::new(db.clone(), identity.clone()));
        let source = EmailSource::new(mail, tokens, db.clone(), Vec::new());
        (dir, db, identity, source)
    }

    #[tokio::test]
    async fn test_no_token_returns_empty_without_listing() {
        let mail = Arc::new(MockMail::new("expired", vec!["m1"]));
        let (_dir, _db, identity, source) = build_source(mail.clone(), Some("fresh"), None);

        let emails = source.fetch_important("u1").await;
        assert!(emails.is_empty());
        assert_eq!(mail.list_calls.load(Ordering::SeqCst), 0);
        assert_eq!(identity.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_happy_path_fetches_and_filters() {
        let mail = Arc::new(MockMail::new("expired", vec!["m1", "broken", "m3"]));
        let (_dir, _db, _identity, source) = build_source(mail.clone(), Some("fresh"), Some("ok"));

        let emails = source.fetch_important("u1").await;
        // "broken" is skipped, the others pass the urgency filter
        let ids: Vec<&str> = emails.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m3"]);
        assert_eq!(mail.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_token_refreshes_once_and_persists() {
        let mail = Arc::new(MockMail::new("expired", vec!["m1"]));
        let (_dir, db, identity, source) =
            build_source(mail.clone(), Some("fresh"), Some("expired"));

        let emails = source.fetch_important("u1").await;
        assert_eq!(emails.len(), 1);
        assert_eq!(identity.calls.load(Ordering::SeqCst), 1);
        assert_eq!(mail.list_calls.load(Ordering::SeqCst), 2);
        // The refreshed token was persisted to the profile record
        let profile = db.get_user("u1").unwrap().unwrap();
        assert_eq!(profile.access_token.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_exhausted_refresh_degrades_to_empty() {
        // Identity also hands back an expired token: the single retry fails
        // and the source must give up, not loop.
        let mail = Arc::new(MockMail::new("expired", vec!["m1"]));
        let (_dir, _db, identity, source) =
            build_source(mail.clone(), Some("expired"), Some("expired"));

        let emails = source.fetch_important("u1").await;
        assert!(emails.is_empty());
        assert_eq!(identity.calls.load(Ordering::SeqCst), 1);
        assert_eq!(mail.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refresh_unavailable_degrades_to_empty() {
        let mail = Arc::new(MockMail::new("expired", vec!["m1"]));
        let (_dir, _db, _identity, source) = build_source(mail.clone(), None, Some("expired"));

        let emails = source.fetch_important("u1").await;
        assert!(emails.is_empty());
        assert_eq!(mail.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_send_draft_marks_sent_on_success() {
        let mail = Arc::new(MockMail::new("expired", vec![]));
        let (_dir, _db, _identity, source) = build_source(mail.clone(), Some("fresh"), Some("ok"));

        let mut draft = EmailDraft {
            id: "draft-m1".to_string(),
            email_id: "m1".to_string(),
            subject: "Re: Hello".to_string(),
            recipient: "jane@co.com".to_string(),
            draft_content: "On it.".to_string(),
            generated_at: Utc::now(),
            status: DraftStatus::Edited,
        };

        assert!(source.send_draft("u1", &mut draft).await);
        assert_eq!(draft.status, DraftStatus::Sent);
        assert_eq!(mail.send_calls.load(Ordering::SeqCst), 1);
    }

    fn pending_draft() -> EmailDraft {
        EmailDraft {
            id: "draft-m1".to_string(),
            email_id: "m1".to_string(),
            subject: "Re: Hello".to_string(),
            recipient: "jane@co.com".to_string(),
            draft_content: "On it.".to_string(),
            generated_at: Utc::now(),
            status: DraftStatus::Pending,
        }
    }

    #[tokio::test]
    async fn test_high_confidence_draft_auto_sends_exactly_once() {
        use crate::autosend;
        use crate::intelligence::analyze::fallback_analysis;
        use std::time::Duration;

        let mail = Arc::new(MockMail::new("expired", vec![]));
        let (_dir, _db, _identity, source) = build_source(mail.clone(), Some("fresh"), Some("ok"));

        let mut analysis = fallback_analysis();
        analysis.confidence = 95;
        let mut draft = pending_draft();

        let timer = autosend::arm_for_analysis_with_tick(
            &analysis,
            2,
            Duration::from_millis(5),
            move || async move {
                let _ = source.send_draft("u1", &mut draft).await;
            },
        )
        .unwrap();

        assert!(timer.join().await);
        assert_eq!(mail.send_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_edit_before_countdown_prevents_auto_send() {
        use crate::autosend;
        use crate::intelligence::analyze::fallback_analysis;
        use std::time::Duration;

        let mail = Arc::new(MockMail::new("expired", vec![]));
        let (_dir, _db, _identity, source) = build_source(mail.clone(), Some("fresh"), Some("ok"));

        let mut analysis = fallback_analysis();
        analysis.confidence = 95;
        let mut draft = pending_draft();

        let timer = autosend::arm_for_analysis_with_tick(
            &analysis,
            100,
            Duration::from_millis(5),
            move || async move {
                let _ = source.send_draft("u1", &mut draft).await;
            },
        )
        .unwrap();

        timer.note_edit();
        assert!(!timer.join().await);
        assert_eq!(mail.send_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_send_draft_failure_keeps_status() {
        let mail = Arc::new(MockMail::new("expired", vec![]));
        let (_dir, _db, _identity, source) =
            build_source(mail.clone(), Some("expired"), Some("expired"));

        let mut draft = EmailDraft {
            id: "draft-m1".to_string(),
            email_id: "m1".to_string(),
            subject: "Re: Hello".to_string(),
            recipient: "jane@co.com".to_string(),
            draft_content: "On it.".to_string(),
            generated_at: Utc::now(),
            status: DraftStatus::Pending,
        };

        assert!(!source.send_draft("u1", &mut draft).await);
        assert_eq!(draft.status, DraftStatus::Pending);
        // One initial attempt + one post-refresh retry, then give up
        assert_eq!(mail.send_calls.load(Ordering::SeqCst), 2);
    }
}
