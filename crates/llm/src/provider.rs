//! Model Backend Trait
//!
//! Defines the common interface for all model backends.

use async_trait::async_trait;

use super::types::{LlmError, LlmResult};

/// Trait that all model backends must implement.
///
/// `response_prefix` is the literal text the caller expects the answer to
/// begin with. How it is used depends on the backend's conventions: raw
/// completion backends append it to the prompt, chat backends prepend it to
/// the reply. Either way the returned text contains the prefix followed by
/// the model's continuation.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Returns the backend name for identification.
    fn name(&self) -> &'static str;

    /// Returns the model or service being used.
    fn model(&self) -> &str;

    /// Send a prompt and get the raw reply text.
    async fn send(&self, prompt: &str, response_prefix: &str) -> LlmResult<String>;

    /// List available models (if supported by the backend).
    ///
    /// Returns None if the backend doesn't support model listing.
    async fn list_models(&self) -> LlmResult<Option<Vec<String>>> {
        Ok(None)
    }
}

/// Helper function to parse HTTP error status codes
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: Invalid API key", provider),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: Access denied", provider),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
        },
        400 => LlmError::InvalidRequest {
            message: body.to_string(),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("{}: HTTP {}: {}", provider, status, body),
        },
    }
}
