//! Structured email analysis.
//!
//! Asks the completion endpoint for a JSON assessment of an incoming email
//! (intent, sentiment, urgency, key points, suggested action, tone,
//! confidence). The response is parsed with a strict schema-validating
//! deserialize: any malformed response is treated identically to a network
//! failure and yields the fallback analysis, so prompt-format drift never
//! produces a partially populated object.

use serde::{Deserialize, Serialize};

use super::prompts;
use super::CompletionClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Question,
    Request,
    Meeting,
    Fyi,
    Urgent,
    #[serde(rename = "follow-up")]
    FollowUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
    High,
    Medium,
    Low,
}

/// Reply tone, user-selectable in the draft flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Formal,
    Professional,
    Casual,
    Friendly,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Formal => "formal",
            Tone::Professional => "professional",
            Tone::Casual => "casual",
            Tone::Friendly => "friendly",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailAnalysis {
    pub intent: Intent,
    pub sentiment: Sentiment,
    pub urgency: UrgencyLevel,
    pub key_points: Vec<String>,
    pub suggested_action: String,
    pub tone: Tone,
    /// 0-100.
    pub confidence: u8,
}

/// Confidence at or above this arms the auto-send countdown.
pub const AUTO_SEND_CONFIDENCE: u8 = 90;

impl EmailAnalysis {
    pub fn qualifies_for_auto_send(&self) -> bool {
        self.confidence >= AUTO_SEND_CONFIDENCE
    }
}

/// Neutral analysis used whenever the provider fails or returns something
/// that does not validate.
pub fn fallback_analysis() -> EmailAnalysis {
    EmailAnalysis {
        intent: Intent::Fyi,
        sentiment: Sentiment::Neutral,
        urgency: UrgencyLevel::Medium,
        key_points: vec![
            "Review the email content".to_string(),
            "Respond appropriately".to_string(),
        ],
        suggested_action: "Read and respond to this email".to_string(),
        tone: Tone::Professional,
        confidence: 50,
    }
}

/// Analyze an incoming email. Total: never fails, only degrades.
pub async fn analyze_email(
    llm: &dyn CompletionClient,
    subject: &str,
    body: &str,
    from: &str,
) -> EmailAnalysis {
    let prompt = prompts::build_analysis_prompt(subject, body, from);

    let response = match llm.complete(&prompt, 400, 0.2).await {
        Ok(text) => text,
        Err(e) => {
            log::warn!("Email analysis failed: {}", e);
            return fallback_analysis();
        }
    };

    match parse_analysis(&response) {
        Some(analysis) => analysis,
        None => {
            log::warn!("Email analysis response did not validate; using fallback");
            fallback_analysis()
        }
    }
}

/// Strict parse: the extracted JSON must deserialize into the full schema.
fn parse_analysis(response: &str) -> Option<EmailAnalysis> {
    let json = prompts::extract_json(response)?;
    let mut analysis: EmailAnalysis = serde_json::from_str(json).ok()?;
    analysis.confidence = analysis.confidence.min(100);
    Some(analysis)
}
