//! Outbound client for the tier-5 LLM-backed decision (spec.md §4.5). The
//! corpus has no dedicated LLM SDK; `reqwest` is the crate every pack
//! repo reaches for when it needs raw outbound HTTP.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("llm response was not valid json: {0}")]
    MalformedJson(#[source] serde_json::Error),
    #[error("llm call exceeded its timeout")]
    Timeout,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// The structured decision an LLM is asked to return.
#[derive(Debug, Deserialize)]
pub struct LlmDecision {
    pub command: String,
}

pub struct LlmClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_endpoint(api_key: String, endpoint: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            endpoint,
        }
    }

    /// Asks the model to choose a command given `prompt`, bounded by
    /// `timeout`. Any timeout, transport error, or non-conforming JSON
    /// response surfaces as an `Err` so the caller falls back to tier 4.
    pub async fn decide(&self, prompt: String, timeout: Duration) -> Result<LlmDecision, LlmError> {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let call = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send();

        let response = tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| LlmError::Timeout)??
            .error_for_status()?;

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();

        serde_json::from_str(&content).map_err(LlmError::MalformedJson)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_content_is_reported_as_an_error() {
        let err = serde_json::from_str::<LlmDecision>("not json").unwrap_err();
        assert!(matches!(LlmError::MalformedJson(err), LlmError::MalformedJson(_)));
    }
}
