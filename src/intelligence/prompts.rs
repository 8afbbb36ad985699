//! Prompt construction and completion-response JSON extraction.

use crate::types::{CalendarEvent, EmailItem};

use super::analyze::{EmailAnalysis, Tone};
use super::draft::DraftLength;

/// Maximum snippet characters embedded in the base draft prompt.
const DRAFT_SNIPPET_BUDGET: usize = 500;
/// Maximum body characters embedded in the variant and analysis prompts.
const VARIANT_BODY_BUDGET: usize = 800;
const ANALYSIS_BODY_BUDGET: usize = 1000;
/// Representative emails included in the summary prompt.
const SUMMARY_EMAIL_SAMPLE: usize = 5;

/// Truncate to at most `max` characters on a char boundary.
fn bounded_prefix(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Prompt for the base reply draft attached during assembly.
pub fn build_draft_prompt(email: &EmailItem) -> String {
    format!(
        "You are a professional email assistant. Generate a concise, polite reply to this email.\n\n\
         From: {}\n\
         Subject: {}\n\
         Body snippet: {}\n\n\
         Generate a brief, professional reply (2-3 sentences max). Be helpful and courteous. \
         Only provide the email body text, no subject line or signatures.",
        email.from,
        email.subject,
        bounded_prefix(&email.snippet, DRAFT_SNIPPET_BUDGET),
    )
}

fn length_guide(length: DraftLength) -> &'static str {
    match length {
        DraftLength::Short => "2-3 sentences, very concise",
        DraftLength::Medium => "1 short paragraph, 4-5 sentences",
        DraftLength::Detailed => "2 paragraphs, comprehensive response",
    }
}

/// Prompt for a tone/length draft variant, grounded in the prior analysis.
pub fn build_variant_prompt(
    email: &EmailItem,
    analysis: &EmailAnalysis,
    tone: Tone,
    length: DraftLength,
) -> String {
    format!(
        "You are an expert email writer. Generate a {tone} reply to this email.\n\n\
         Original Email:\n\
         From: {from}\n\
         Subject: {subject}\n\
         Body: {body}\n\n\
         Context:\n\
         - Intent: {intent:?}\n\
         - Urgency: {urgency:?}\n\
         - Key points to address: {key_points}\n\
         - Suggested action: {action}\n\n\
         Requirements:\n\
         1. Tone: {tone}\n\
         2. Length: {length}\n\
         3. Address all key points naturally\n\
         4. Be warm but professional\n\
         5. Include a clear call-to-action if needed\n\
         6. Sign off appropriately\n\
         7. NO subject line, just the email body\n\
         8. Start directly with the content\n\n\
         Generate ONLY the email body text, nothing else.",
        tone = tone.as_str(),
        from = email.from,
        subject = email.subject,
        body = bounded_prefix(&email.snippet, VARIANT_BODY_BUDGET),
        intent = analysis.intent,
        urgency = analysis.urgency,
        key_points = analysis.key_points.join(", "),
        action = analysis.suggested_action,
        length = length_guide(length),
    )
}

/// Prompt for the structured email analysis. The response contract is the
/// exact JSON schema `analyze::parse_analysis` validates against.
pub fn build_analysis_prompt(subject: &str, body: &str, from: &str) -> String {
    format!(
        "Analyze this email and provide structured insights:\n\n\
         From: {}\n\
         Subject: {}\n\
         Body: {}\n\n\
         Analyze and respond in this EXACT JSON format:\n\
         {{\n\
           \"intent\": \"question|request|meeting|fyi|urgent|follow-up\",\n\
           \"sentiment\": \"positive|neutral|negative\",\n\
           \"urgency\": \"high|medium|low\",\n\
           \"keyPoints\": [\"point1\", \"point2\", \"point3\"],\n\
           \"suggestedAction\": \"brief description of what to do\",\n\
           \"tone\": \"formal|professional|casual|friendly\",\n\
           \"confidence\": 85\n\
         }}\n\n\
         Be precise and analytical.",
        from,
        subject,
        bounded_prefix(body, ANALYSIS_BODY_BUDGET),
    )
}

/// Prompt for the daily brief narrative.
pub fn build_summary_prompt(emails: &[EmailItem], events: &[CalendarEvent]) -> String {
    let email_lines = emails
        .iter()
        .take(SUMMARY_EMAIL_SAMPLE)
        .map(|e| format!("- {} from {}", e.subject, e.from))
        .collect::<Vec<_>>()
        .join("\n");

    let event_lines = events
        .iter()
        .map(|e| format!("- {} at {}", e.title, e.display_time()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a calm, professional assistant creating a daily brief. Generate a brief, \
         encouraging summary (2-3 sentences max) for someone's morning.\n\n\
         Today they have:\n\
         - {} emails requiring attention\n\
         - {} calendar events\n\n\
         Key emails:\n{}\n\n\
         Calendar events:\n{}\n\n\
         Create a brief, calm summary that:\n\
         1. Acknowledges what needs attention\n\
         2. Highlights 1-2 most important items\n\
         3. Ends with an encouraging note\n\
         4. Uses a warm, professional tone\n\
         5. Keep it under 50 words\n\n\
         Do not use phrases like \"Good morning\" or greetings. Start directly with the summary.",
        emails.len(),
        events.len(),
        if email_lines.is_empty() { "None" } else { email_lines.as_str() },
        if event_lines.is_empty() { "None" } else { event_lines.as_str() },
    )
}

/// Extract a JSON object from completion response text.
///
/// Handles ```json fences, generic fences, raw objects, and objects embedded
/// in surrounding prose (balanced-brace scan that respects strings).
pub fn extract_json(response: &str) -> Option<&str> {
    if let Some(start) = response.find("```json") {
        let json_start = start + 7;
        if let Some(end) = response[json_start..].find("```") {
            return Some(response[json_start..json_start + end].trim());
        }
    }

    if let Some(start) = response.find("```") {
        let after_fence = start + 3;
        if let Some(nl) = response[after_fence..].find('\n') {
            let json_start = after_fence + nl + 1;
            if let Some(end) = response[json_start..].find("```") {
                let candidate = response[json_start..json_start + end].trim();
                if candidate.starts_with('{') {
                    return Some(candidate);
                }
            }
        }
    }

    let trimmed = response.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Some(trimmed);
    }

    let start = response.find('{')?;
    let candidate = &response[start..];
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;
    for (i, ch) in candidate.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&candidate[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
