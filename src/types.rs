//! Core data model for the daily brief pipeline.
//!
//! The persisted shapes (DailyBrief, BriefItem, EmailDraft) serialize to
//! camelCase JSON documents, one brief per user per calendar day. Source
//! shapes (EmailItem, CalendarEvent) are the normalized forms produced by
//! the mail and calendar clients before assembly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of attention a brief item asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Email,
    Calendar,
    Task,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Derived task category. Task items only; first matching keyword class wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Badge {
    Reply,
    Decision,
    Schedule,
    Review,
    Followup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    Pending,
    Edited,
    Sent,
}

/// A normalized email from the mail provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailItem {
    pub id: String,
    pub thread_id: String,
    pub from: String,
    pub subject: String,
    pub snippet: String,
    pub date: DateTime<Utc>,
    pub is_read: bool,
    pub priority: Priority,
}

/// A normalized calendar event from the calendar provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub is_all_day: bool,
}

impl CalendarEvent {
    /// Display string for the event start in local time, e.g. "9:30 AM".
    pub fn display_time(&self) -> String {
        if self.is_all_day {
            return "All day".to_string();
        }
        self.start
            .with_timezone(&chrono::Local)
            .format("%-I:%M %p")
            .to_string()
    }
}

/// An AI-generated candidate reply to a specific email.
///
/// `draft_content` is mutable — the user may edit before send. `status`
/// moves to `Sent` only as a local flag after a successful send call; the
/// canonical sent state lives in the mail provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailDraft {
    pub id: String,
    pub email_id: String,
    pub subject: String,
    pub recipient: String,
    pub draft_content: String,
    pub generated_at: DateTime<Utc>,
    pub status: DraftStatus,
}

/// Free-form per-item metadata carried through to the stored document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Source email id shared by the email item and any derived task item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// One unit of attention surfaced in a brief.
///
/// `id` is namespaced by source type ("email-", "calendar-", "task-") and is
/// unique within a brief. An email item and the task item derived from the
/// same message share `metadata.email_id` but carry distinct top-level ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BriefItem {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub title: String,
    pub subtitle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<Badge>,
    #[serde(default)]
    pub metadata: ItemMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_draft: Option<EmailDraft>,
}

/// The per-user, per-day aggregate root.
///
/// `id` is the calendar date string ("YYYY-MM-DD"). Item order is source
/// fetch order (emails, then calendar events, then derived tasks) and is
/// never re-sorted. `completed_count` is always recomputed from the items,
/// never incremented in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyBrief {
    pub id: String,
    pub date: DateTime<Utc>,
    pub summary: String,
    pub items: Vec<BriefItem>,
    pub completed_count: usize,
    pub total_count: usize,
    pub generated_at: DateTime<Utc>,
}

impl DailyBrief {
    /// Count of completed items, computed from scratch.
    pub fn count_completed(&self) -> usize {
        self.items.iter().filter(|i| i.completed).count()
    }
}
