//! Gmail API v1 — candidate message list, per-message detail, and send.
//!
//! The list call matches "unread OR important OR received within the last
//! day". Detail is fetched one request per message (no batching). Outbound
//! send posts a base64url-encoded RFC-2822-shaped message blob.

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::GoogleApiError;
use crate::types::{EmailDraft, EmailItem, Priority};

const GMAIL_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

// ============================================================================
// API response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageListResponse {
    #[serde(default)]
    messages: Vec<MessageStub>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageStub {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageDetail {
    #[serde(default)]
    id: String,
    #[serde(default)]
    thread_id: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    label_ids: Vec<String>,
    #[serde(default)]
    payload: Option<MessagePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagePayload {
    #[serde(default)]
    headers: Vec<Header>,
}

#[derive(Debug, Deserialize)]
struct Header {
    #[serde(default)]
    name: String,
    #[serde(default)]
    value: String,
}

// ============================================================================
// Mail client seam
// ============================================================================

#[async_trait::async_trait]
pub trait MailClient: Send + Sync {
    /// List candidate message ids matching `query`, capped at `max_results`.
    async fn list_message_ids(
        &self,
        access_token: &str,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<String>, GoogleApiError>;

    /// Fetch one message's metadata and normalize it.
    async fn get_message(
        &self,
        access_token: &str,
        message_id: &str,
    ) -> Result<EmailItem, GoogleApiError>;

    /// Send a base64url-encoded RFC 2822 message blob.
    async fn send_raw(&self, access_token: &str, raw: &str) -> Result<(), GoogleApiError>;
}

pub struct GmailClient {
    http: reqwest::Client,
}

impl GmailClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl Default for GmailClient {
    fn default() -> Self {
        Self::new()
    }
}

fn check_status(status: reqwest::StatusCode) -> Result<(), GoogleApiError> {
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(GoogleApiError::AuthExpired);
    }
    Ok(())
}

#[async_trait::async_trait]
impl MailClient for GmailClient {
    async fn list_message_ids(
        &self,
        access_token: &str,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<String>, GoogleApiError> {
        let resp = self
            .http
            .get(format!("{}/messages", GMAIL_BASE))
            .bearer_auth(access_token)
            .query(&[("q", query), ("maxResults", &max_results.to_string())])
            .send()
            .await?;

        let status = resp.status();
        check_status(status)?;
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GoogleApiError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let list: MessageListResponse = resp.json().await?;
        Ok(list.messages.into_iter().map(|m| m.id).collect())
    }

    async fn get_message(
        &self,
        access_token: &str,
        message_id: &str,
    ) -> Result<EmailItem, GoogleApiError> {
        let resp = self
            .http
            .get(format!("{}/messages/{}", GMAIL_BASE, message_id))
            .bearer_auth(access_token)
            .query(&[
                ("format", "metadata"),
                ("metadataHeaders", "From"),
                ("metadataHeaders", "Subject"),
                ("metadataHeaders", "Date"),
            ])
            .send()
            .await?;

        let status = resp.status();
        check_status(status)?;
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GoogleApiError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let detail: MessageDetail = resp.json().await?;
        Ok(normalize_message(detail))
    }

    async fn send_raw(&self, access_token: &str, raw: &str) -> Result<(), GoogleApiError> {
        let resp = self
            .http
            .post(format!("{}/messages/send", GMAIL_BASE))
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "raw": raw }))
            .send()
            .await?;

        let status = resp.status();
        check_status(status)?;
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GoogleApiError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(())
    }
}

// ============================================================================
// Normalization
// ============================================================================

fn normalize_message(detail: MessageDetail) -> EmailItem {
    let headers = detail
        .payload
        .as_ref()
        .map(|p| &p.headers[..])
        .unwrap_or(&[]);

    let get_header = |name: &str| -> String {
        headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.clone())
            .unwrap_or_default()
    };

    let subject = {
        let s = get_header("Subject");
        if s.is_empty() {
            "No Subject".to_string()
        } else {
            s
        }
    };
    let from = {
        let f = get_header("From");
        if f.is_empty() {
            "Unknown".to_string()
        } else {
            f
        }
    };
    let date = parse_message_date(&get_header("Date")).unwrap_or_else(Utc::now);

    let is_read = !detail.label_ids.iter().any(|l| l == "UNREAD");
    let priority = if detail.label_ids.iter().any(|l| l == "IMPORTANT") {
        Priority::High
    } else {
        Priority::Medium
    };

    EmailItem {
        id: detail.id,
        thread_id: detail.thread_id,
        from,
        subject,
        snippet: detail.snippet,
        date,
        is_read,
        priority,
    }
}

/// Parse an RFC 2822 Date header, tolerating a trailing "(TZ)" comment.
fn parse_message_date(value: &str) -> Option<DateTime<Utc>> {
    if value.is_empty() {
        return None;
    }
    let cleaned = match value.find('(') {
        Some(idx) => value[..idx].trim(),
        None => value.trim(),
    };
    DateTime::parse_from_rfc2822(cleaned)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ============================================================================
// Outbound message encoding
// ============================================================================

/// Build the RFC 2822 message for a draft and encode it base64url (no pad),
/// the shape the send endpoint expects in its `raw` field.
pub fn encode_draft(draft: &EmailDraft) -> String {
    let message = format!(
        "To: {}\r\nSubject: {}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}",
        draft.recipient, draft.subject, draft.draft_content
    );
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(message.as_bytes())
}
