//! Email importance filter and task-badge derivation.
//!
//! Importance rules (first match wins):
//!   1. Promotional/spam keywords in subject+snippet: exclude
//!   2. Provider-important priority: include
//!   3. Urgency keywords in subject+snippet: include
//!   4. Sender on the important-sender allowlist: include
//!   5. Unread and received within the last 24 hours: include
//!   6. Otherwise: exclude
//!
//! The spam check short-circuits before every inclusion rule, allowlist
//! included. Both functions are pure: identical inputs and the same `now`
//! always produce identical decisions. The retained set is truncated to
//! the first 7 entries in fetch order, not re-ranked.

use std::sync::OnceLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;

use crate::types::{Badge, EmailItem, Priority};

/// Maximum emails retained per brief.
pub const MAX_BRIEF_EMAILS: usize = 7;

/// Promotional/bulk keywords. A match anywhere in subject+snippet excludes
/// the message unconditionally.
pub const SPAM_KEYWORDS: &[&str] = &[
    "unsubscribe",
    "% off",
    "sale",
    "discount",
    "promotion",
    "promo code",
    "coupon",
    "newsletter",
    "free shipping",
    "limited time",
    "flash deal",
    "giveaway",
    "sweepstakes",
    "webinar invitation",
];

/// Urgency keywords. A match in subject+snippet includes the message.
pub const URGENT_KEYWORDS: &[&str] = &[
    "urgent",
    "asap",
    "deadline",
    "end of day",
    "eod",
    "action required",
    "time-sensitive",
    "reminder",
    "review",
    "approve",
    "confirm",
    "respond",
    "waiting on",
    "follow up",
    "check",
    "important",
];

/// Task badge classes in precedence order. The first class with a keyword
/// match in subject+snippet wins; an email matching none yields no task.
const BADGE_RULES: &[(Badge, &[&str])] = &[
    (
        Badge::Reply,
        &["reply", "respond", "get back to", "let me know", "answer"],
    ),
    (
        Badge::Decision,
        &["decide", "decision", "approve", "approval", "sign off", "sign-off"],
    ),
    (
        Badge::Schedule,
        &["schedule", "reschedule", "meeting", "availability", "calendar", "book a"],
    ),
    (
        Badge::Review,
        &["review", "feedback", "look over", "take a look", "check", "thoughts on"],
    ),
    (
        Badge::Followup,
        &["follow up", "follow-up", "following up", "circling back", "checking in"],
    ),
];

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

fn email_text(email: &EmailItem) -> String {
    format!("{} {}", email.subject, email.snippet).to_lowercase()
}

/// Extract the bare address from a From header like `"Jane" <jane@co.com>`.
fn sender_address(from: &str) -> String {
    static ADDR_RE: OnceLock<Regex> = OnceLock::new();
    let re = ADDR_RE.get_or_init(|| Regex::new(r"<([^>]+)>").expect("static regex"));
    match re.captures(from) {
        Some(caps) => caps[1].trim().to_lowercase(),
        None => from.trim().to_lowercase(),
    }
}

fn sender_allowlisted(from: &str, allowlist: &[String]) -> bool {
    if allowlist.is_empty() {
        return false;
    }
    let address = sender_address(from);
    allowlist
        .iter()
        .any(|s| address.contains(&s.to_lowercase()))
}

/// Decide whether one email belongs in the brief.
pub fn is_important(email: &EmailItem, allowlist: &[String], now: DateTime<Utc>) -> bool {
    let text = email_text(email);

    if contains_any(&text, SPAM_KEYWORDS) {
        return false;
    }
    if email.priority == Priority::High {
        return true;
    }
    if contains_any(&text, URGENT_KEYWORDS) {
        return true;
    }
    if sender_allowlisted(&email.from, allowlist) {
        return true;
    }
    if !email.is_read && now.signed_duration_since(email.date) < Duration::hours(24) {
        return true;
    }
    false
}

/// Apply the importance filter over the candidate set and truncate to the
/// first `MAX_BRIEF_EMAILS` entries in fetch order.
pub fn filter_important(
    emails: Vec<EmailItem>,
    allowlist: &[String],
    now: DateTime<Utc>,
) -> Vec<EmailItem> {
    emails
        .into_iter()
        .filter(|e| is_important(e, allowlist, now))
        .take(MAX_BRIEF_EMAILS)
        .collect()
}

/// Derive the task badge for an email, if any keyword class matches.
pub fn derive_badge(subject: &str, snippet: &str) -> Option<Badge> {
    let text = format!("{} {}", subject, snippet).to_lowercase();
    BADGE_RULES
        .iter()
        .find(|(_, keywords)| contains_any(&text, keywords))
        .map(|(badge, _)| *badge)
}
