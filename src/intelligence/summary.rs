//! Daily brief narrative generation.
//!
//! One completion call over the raw email/event lists; the fallback is a
//! pure, total template parameterized by counts and the hour-of-day bucket.

use chrono::{DateTime, Local, Timelike, Utc};

use crate::types::{CalendarEvent, EmailItem};

use super::prompts;
use super::CompletionClient;

/// Generate the brief narrative. Never fails; provider errors degrade to
/// the deterministic template.
pub async fn generate_summary(
    llm: &dyn CompletionClient,
    emails: &[EmailItem],
    events: &[CalendarEvent],
    now: DateTime<Utc>,
) -> String {
    let prompt = prompts::build_summary_prompt(emails, events);

    match llm.complete(&prompt, 200, 0.7).await {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => fallback_summary(emails.len(), events.len(), local_hour(now)),
        Err(e) => {
            log::warn!("Summary generation failed: {}", e);
            fallback_summary(emails.len(), events.len(), local_hour(now))
        }
    }
}

fn local_hour(now: DateTime<Utc>) -> u32 {
    now.with_timezone(&Local).hour()
}

/// Deterministic templated summary. Pure and total.
pub fn fallback_summary(email_count: usize, event_count: usize, hour: u32) -> String {
    let greeting = if hour < 12 {
        "Good morning"
    } else if hour < 17 {
        "Good afternoon"
    } else {
        "Good evening"
    };

    let email_s = if email_count == 1 { "" } else { "s" };
    let event_s = if event_count == 1 { "" } else { "s" };

    match (email_count, event_count) {
        (0, 0) => format!(
            "{}. You have a clear schedule today. Perfect time to focus on your priorities.",
            greeting
        ),
        (e, v) if e > 0 && v > 0 => format!(
            "{}. Today, you have {} email{} and {} calendar event{} requiring your attention. \
             Prioritizing these will help you stay on track for the day.",
            greeting, e, email_s, v, event_s
        ),
        (e, _) if e > 0 => format!(
            "{}. You have {} email{} that need{} your attention today. \
             Addressing these will keep your inbox organized.",
            greeting,
            e,
            email_s,
            if e == 1 { "s" } else { "" }
        ),
        (_, v) => format!(
            "{}. You have {} calendar event{} scheduled today. \
             Stay focused and make the most of your time.",
            greeting, v, event_s
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intelligence::CompletionError;

    #[test]
    fn test_fallback_greeting_buckets() {
        assert!(fallback_summary(0, 0, 7).starts_with("Good morning"));
        assert!(fallback_summary(0, 0, 12).starts_with("Good afternoon"));
        assert!(fallback_summary(0, 0, 16).starts_with("Good afternoon"));
        assert!(fallback_summary(0, 0, 17).starts_with("Good evening"));
        assert!(fallback_summary(0, 0, 23).starts_with("Good evening"));
    }

    #[test]
    fn test_fallback_pluralization() {
        let one_each = fallback_summary(1, 1, 9);
        assert!(one_each.contains("1 email and 1 calendar event requiring"));

        let many = fallback_summary(3, 2, 9);
        assert!(many.contains("3 emails and 2 calendar events"));

        let single_email = fallback_summary(1, 0, 9);
        assert!(single_email.contains("1 email that needs your attention"));

        let emails_only = fallback_summary(4, 0, 9);
        assert!(emails_only.contains("4 emails that need your attention"));

        let events_only = fallback_summary(0, 2, 9);
        assert!(events_only.contains("2 calendar events scheduled"));
    }

    #[test]
    fn test_fallback_is_deterministic() {
        assert_eq!(fallback_summary(2, 3, 10), fallback_summary(2, 3, 10));
    }

    struct FailingLlm;

    #[async_trait::async_trait]
    impl CompletionClient for FailingLlm {
        async fn complete(&self, _p: &str, _m: u32, _t: f32) -> Result<String, CompletionError> {
            Err(CompletionError::MissingApiKey)
        }
    }

    struct FixedLlm;

    #[async_trait::async_trait]
    impl CompletionClient for FixedLlm {
        async fn complete(&self, _p: &str, _m: u32, _t: f32) -> Result<String, CompletionError> {
            Ok("  A calm start: two threads need replies before standup.  ".to_string())
        }
    }

    #[tokio::test]
    async fn test_summary_trims_completion() {
        let summary = generate_summary(&FixedLlm, &[], &[], Utc::now()).await;
        assert_eq!(
            summary,
            "A calm start: two threads need replies before standup."
        );
    }

    #[tokio::test]
    async fn test_summary_falls_back_on_error() {
        let summary = generate_summary(&FailingLlm, &[], &[], Utc::now()).await;
        assert!(summary.contains("clear schedule"));
    }
}
