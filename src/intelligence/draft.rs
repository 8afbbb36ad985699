//! Reply draft generation.
//!
//! Drafts must never be absent, only generic: every provider error path
//! lands on a static fallback. The base draft is attached during brief
//! assembly; tone/length variants back the enhanced modal flow and may be
//! regenerated independently.

use chrono::Utc;

use crate::types::{DraftStatus, EmailDraft, EmailItem};

use super::analyze::{EmailAnalysis, Intent, Tone};
use super::prompts;
use super::CompletionClient;

/// Fallback body used when base draft generation fails.
pub const FALLBACK_DRAFT: &str =
    "Thank you for your email. I will review this and respond shortly.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftLength {
    Short,
    Medium,
    Detailed,
}

/// One tone/length rendering of a reply.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftVariation {
    pub length: DraftLength,
    pub content: String,
    pub tone: Tone,
}

fn new_draft(email: &EmailItem, content: String) -> EmailDraft {
    EmailDraft {
        id: format!("draft-{}", email.id),
        email_id: email.id.clone(),
        subject: format!("Re: {}", email.subject),
        recipient: email.from.clone(),
        draft_content: content,
        generated_at: Utc::now(),
        status: DraftStatus::Pending,
    }
}

/// Generate the base reply draft for a retained email.
///
/// Short completion, nonzero sampling temperature; any provider error
/// yields the static fallback body with status still `Pending`.
pub async fn generate_draft(llm: &dyn CompletionClient, email: &EmailItem) -> EmailDraft {
    let prompt = prompts::build_draft_prompt(email);

    let content = match llm.complete(&prompt, 200, 0.7).await {
        Ok(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                FALLBACK_DRAFT.to_string()
            } else {
                trimmed.to_string()
            }
        }
        Err(e) => {
            log::warn!("Draft generation failed for {}: {}", email.id, e);
            FALLBACK_DRAFT.to_string()
        }
    };

    new_draft(email, content)
}

/// Intent-specific fallback bodies for the variant flow.
pub fn fallback_for_intent(intent: Intent) -> &'static str {
    match intent {
        Intent::Question => {
            "Thank you for reaching out. I'll look into this and get back to you shortly.\n\nBest regards"
        }
        Intent::Request => {
            "I've received your request and will address it as soon as possible. I'll keep you updated on the progress.\n\nBest regards"
        }
        Intent::Meeting => {
            "Thank you for the meeting invitation. I'll review my calendar and confirm my availability soon.\n\nBest regards"
        }
        Intent::Urgent => {
            "I understand this is urgent. I'm prioritizing this and will respond with more details shortly.\n\nBest regards"
        }
        Intent::FollowUp => {
            "Thank you for following up. I appreciate your patience and will provide an update soon.\n\nBest regards"
        }
        Intent::Fyi => {
            "Thank you for keeping me informed. I've noted this information.\n\nBest regards"
        }
    }
}

/// Strip wrapping quotes some models add around the whole body.
fn clean_variant(text: &str) -> String {
    text.trim()
        .trim_start_matches(['"', '\''])
        .trim_end_matches(['"', '\''])
        .trim()
        .to_string()
}

/// Regenerate the reply at a specific tone and length.
pub async fn generate_variant(
    llm: &dyn CompletionClient,
    email: &EmailItem,
    analysis: &EmailAnalysis,
    tone: Tone,
    length: DraftLength,
) -> String {
    let prompt = prompts::build_variant_prompt(email, analysis, tone, length);

    match llm.complete(&prompt, 500, 0.7).await {
        Ok(text) => {
            let cleaned = clean_variant(&text);
            if cleaned.is_empty() {
                fallback_for_intent(analysis.intent).to_string()
            } else {
                cleaned
            }
        }
        Err(e) => {
            log::warn!("Variant generation failed for {}: {}", email.id, e);
            fallback_for_intent(analysis.intent).to_string()
        }
    }
}

/// Generate all three length variations at one tone, concurrently.
pub async fn generate_variations(
    llm: &dyn CompletionClient,
    email: &EmailItem,
    analysis: &EmailAnalysis,
    tone: Tone,
) -> Vec<DraftVariation> {
    let (short, medium, detailed) = tokio::join!(
        generate_variant(llm, email, analysis, tone, DraftLength::Short),
        generate_variant(llm, email, analysis, tone, DraftLength::Medium),
        generate_variant(llm, email, analysis, tone, DraftLength::Detailed),
    );

    vec![
        DraftVariation {
            length: DraftLength::Short,
            content: short,
            tone,
        },
        DraftVariation {
            length: DraftLength::Medium,
            content: medium,
            tone,
        },
        DraftVariation {
            length: DraftLength::Detailed,
            content: detailed,
            tone,
        },
    ]
}
