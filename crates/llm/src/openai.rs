//! OpenAI Provider
//!
//! Chat-completion backend for OpenAI and OpenAI-compatible endpoints.
//! Single attempt per call; any non-2xx status is an error.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::provider::{parse_http_error, ModelBackend};
use super::types::{LlmError, LlmResult};
use crate::http_client::build_http_client;

/// Default OpenAI API endpoint
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// System prompt sent with every request
pub const SYSTEM_PROMPT: &str = "You are an expert coder and bug-hunter assistant.";

const MAX_TOKENS: u32 = 1000;

/// OpenAI provider
pub struct OpenAIProvider {
    api_key: String,
    model: String,
    endpoint: String,
    client: reqwest::Client,
}

impl OpenAIProvider {
    /// Create a provider for `endpoint`, falling back to the public OpenAI
    /// endpoint when none is given.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        endpoint: Option<&str>,
    ) -> LlmResult<Self> {
        let endpoint = match endpoint.filter(|e| !e.trim().is_empty()) {
            Some(e) => {
                url::Url::parse(e).map_err(|err| LlmError::InvalidRequest {
                    message: format!("invalid endpoint '{}': {}", e, err),
                })?;
                e.to_string()
            }
            None => OPENAI_API_URL.to_string(),
        };

        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            endpoint,
            client: build_http_client()?,
        })
    }

    /// Get the API endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build the request body for the API
    fn build_request_body(&self, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ],
            "max_tokens": MAX_TOKENS,
            "temperature": 0.0,
        })
    }
}

#[async_trait]
impl ModelBackend for OpenAIProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    /// The prefix is glued in front of the reply: chat models answer from
    /// scratch, so the caller's expected opening is restored here.
    async fn send(&self, prompt: &str, response_prefix: &str) -> LlmResult<String> {
        debug!("Sending request to {} ({})", self.endpoint, self.model);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.build_request_body(prompt))
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body_text = response.text().await.map_err(|e| LlmError::NetworkError {
            message: e.to_string(),
        })?;

        if !(200..300).contains(&status) {
            return Err(parse_http_error(status, &body_text, "openai"));
        }

        let parsed: OpenAIResponse =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse response: {}", e),
            })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| LlmError::ParseError {
                message: "response has no message content".to_string(),
            })?;

        Ok(format!("{}{}", response_prefix, content))
    }
}

/// OpenAI API response format
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}
