//! AI generation layer: drafts, email analysis, and the daily summary.
//!
//! All generation goes through the `CompletionClient` seam so the pipeline
//! components can be exercised against mocks. Every public operation in
//! this module is total: provider failures of any kind degrade to a
//! deterministic fallback, never an error surfaced to the caller.

pub mod analyze;
pub mod draft;
pub mod prompts;
pub mod summary;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("API key not configured")]
    MissingApiKey,
    #[error("Empty or malformed completion response")]
    Malformed,
}

/// Text-completion seam: prompt in, free text out.
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        max_output_tokens: u32,
        temperature: f32,
    ) -> Result<String, CompletionError>;
}

// ============================================================================
// Gemini generateContent wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

// ============================================================================
// Gemini client
// ============================================================================

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model: "gemini-1.5-flash".to_string(),
        }
    }

    fn endpoint(&self, api_key: &str) -> String {
        format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, api_key
        )
    }
}

#[async_trait::async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(
        &self,
        prompt: &str,
        max_output_tokens: u32,
        temperature: f32,
    ) -> Result<String, CompletionError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(CompletionError::MissingApiKey)?;

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature,
                max_output_tokens,
            },
        };

        let resp = self
            .http
            .post(self.endpoint(api_key))
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: GenerateResponse = resp
            .json()
            .await
            .map_err(|_| CompletionError::Malformed)?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(CompletionError::Malformed);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_shape() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: "hello" }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.7,
                max_output_tokens: 200,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 200);
    }

    #[test]
    fn test_generate_response_extraction() {
        let json = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "A short reply."}], "role": "model"},
                 "finishReason": "STOP"}
            ]
        }"#;
        let resp: GenerateResponse = serde_json::from_str(json).unwrap();
        let text = resp
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text);
        assert_eq!(text.as_deref(), Some("A short reply."));
    }

    #[test]
    fn test_generate_response_empty_candidates() {
        let resp: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.candidates.is_empty());
    }

    #[tokio::test]
    async fn test_missing_api_key_is_typed_error() {
        let client = GeminiClient::new(None);
        let result = client.complete("hi", 10, 0.7).await;
        assert!(matches!(result, Err(CompletionError::MissingApiKey)));
    }
}
