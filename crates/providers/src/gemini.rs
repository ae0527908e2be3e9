//! Gemini planner backend.
//!
//! Uses the `generateContent` REST endpoint. The prompt is sent as a single
//! user turn; the first candidate's text is returned raw — decoding into a
//! `Proposal` happens in the protocol codec, not here.

use async_trait::async_trait;
use overwatch_core::error::PlannerError;
use overwatch_core::planner::Planner;
use serde::Deserialize;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini `generateContent` API planner.
pub struct GeminiPlanner {
    base_url: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl GeminiPlanner {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout_secs: 120,
            client: reqwest::Client::new(),
        }
    }

    /// Create with a custom base URL (for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Bound the request; a hung backend becomes `PlannerError::Timeout`.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl Planner for GeminiPlanner {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn propose(&self, prompt: &str) -> Result<String, PlannerError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }]
        });

        debug!(model = %self.model, prompt_len = prompt.len(), "Requesting proposal");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PlannerError::Timeout(format!("no reply within {}s", self.timeout_secs))
                } else {
                    PlannerError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Planner request failed");
            return Err(match status.as_u16() {
                401 | 403 => PlannerError::AuthenticationFailed(message),
                code => PlannerError::ApiError { status_code: code, message },
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| PlannerError::Network(format!("invalid response body: {e}")))?;

        let text: String = parsed
            .candidates
            .first()
            .map(|c| c.content.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(PlannerError::ApiError {
                status_code: status.as_u16(),
                message: "response contained no candidate text".into(),
            });
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_deserialization() {
        let json = r#"{
            "candidates": [
                { "content": { "parts": [ { "text": "{\"action\":\"CONCLUDE\",\"summary\":\"done\"}" } ] } }
            ]
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.candidates.len(), 1);
        assert!(parsed.candidates[0].content.parts[0].text.contains("CONCLUDE"));
    }

    #[test]
    fn empty_candidates_tolerated_by_decoder() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.candidates.is_empty());
    }

    #[tokio::test]
    async fn unreachable_backend_is_network_error() {
        let planner = GeminiPlanner::new("key", "gemini-2.5-pro")
            .with_base_url("http://127.0.0.1:9")
            .with_timeout_secs(2);
        let err = planner.propose("hello").await.unwrap_err();
        assert!(matches!(err, PlannerError::Network(_) | PlannerError::Timeout(_)));
    }
}
