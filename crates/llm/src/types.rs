//! LLM Types
//!
//! Configuration and error types shared by the model backends.

use serde::{Deserialize, Serialize};

use autokaker_core::CoreError;

/// Default service string; selects the Neuroengine backend.
pub const DEFAULT_SERVICE: &str = "Neuroengine.ai";

/// Default model for OpenAI-style backends
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Supported backend kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Neuroengine's own request/reply protocol
    Neuroengine,
    /// OpenAI chat completions at the public endpoint
    OpenAI,
    /// OpenAI-compatible chat completions at a user-supplied endpoint
    Custom,
}

impl BackendKind {
    /// Classify a free-form service string as shown in the host's settings.
    ///
    /// Anything mentioning `Neuroengine.ai` is the primary backend, anything
    /// mentioning `Custom` is a custom endpoint, everything else is OpenAI.
    pub fn from_service(service: &str) -> Self {
        if service.contains("Neuroengine.ai") {
            BackendKind::Neuroengine
        } else if service.contains("Custom") {
            BackendKind::Custom
        } else {
            BackendKind::OpenAI
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Neuroengine => write!(f, "neuroengine"),
            BackendKind::OpenAI => write!(f, "openai"),
            BackendKind::Custom => write!(f, "custom"),
        }
    }
}

/// Configuration for building a [`crate::ModelClient`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Service string selecting the first backend
    pub service: String,
    /// Bearer token for OpenAI-style backends
    #[serde(default)]
    pub api_key: String,
    /// Model name for OpenAI-style backends
    #[serde(default = "default_model")]
    pub model: String,
    /// Endpoint used when the service selects a custom backend
    #[serde(default)]
    pub custom_endpoint: String,
    /// Attempt bound for the Neuroengine backend
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Raise instead of returning text when Neuroengine cannot answer
    #[serde(default)]
    pub strict_retries: bool,
    /// Service string of a backend tried after the first one fails
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fallback_service: Option<String>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_retries() -> u32 {
    5
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            service: DEFAULT_SERVICE.to_string(),
            api_key: String::new(),
            model: default_model(),
            custom_endpoint: String::new(),
            max_retries: default_max_retries(),
            strict_retries: false,
            fallback_service: None,
        }
    }
}

/// Error types for model backend operations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LlmError {
    /// Authentication failed (invalid API key)
    AuthenticationFailed { message: String },
    /// Rate limit exceeded
    RateLimited { message: String },
    /// Invalid request (bad parameters)
    InvalidRequest { message: String },
    /// Server error from the provider
    ServerError {
        message: String,
        status: Option<u16>,
    },
    /// Network/connection error
    NetworkError { message: String },
    /// Response parsing error
    ParseError { message: String },
    /// Backend answered but never successfully (strict retry mode)
    ServiceUnavailable { message: String },
    /// Other error
    Other { message: String },
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmError::AuthenticationFailed { message } => {
                write!(f, "Authentication failed: {}", message)
            }
            LlmError::RateLimited { message } => {
                write!(f, "Rate limited: {}", message)
            }
            LlmError::InvalidRequest { message } => {
                write!(f, "Invalid request: {}", message)
            }
            LlmError::ServerError { message, status } => {
                if let Some(s) = status {
                    write!(f, "Server error ({}): {}", s, message)
                } else {
                    write!(f, "Server error: {}", message)
                }
            }
            LlmError::NetworkError { message } => {
                write!(f, "Network error: {}", message)
            }
            LlmError::ParseError { message } => {
                write!(f, "Parse error: {}", message)
            }
            LlmError::ServiceUnavailable { message } => {
                write!(f, "Service unavailable: {}", message)
            }
            LlmError::Other { message } => {
                write!(f, "Error: {}", message)
            }
        }
    }
}

impl std::error::Error for LlmError {}

/// Every backend failure is a service failure from the analysis engine's
/// point of view.
impl From<LlmError> for CoreError {
    fn from(err: LlmError) -> Self {
        CoreError::ServiceUnavailable(err.to_string())
    }
}

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;
