//! Core Error Types
//!
//! Defines the error taxonomy shared by every Autokaker crate. Only
//! thiserror + std are needed here so the core crate stays lightweight.
//!
//! The LLM crate keeps its own provider-level error type and converts it
//! into [`CoreError::ServiceUnavailable`]; the application crate wraps both.

use thiserror::Error;

/// Core error type for the Autokaker workspace.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The model backend could not produce an answer (transport, HTTP status,
    /// or exhausted retries in strict mode)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// No valid findings object could be extracted from a model reply
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The cursor sits outside every detected block
    #[error("No active selection: cursor is outside any detected block")]
    NoActiveSelection,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a service unavailable error
    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    /// Create a malformed response error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the user should be told about this error.
    ///
    /// A cursor outside every block is an expected, frequent outcome and
    /// aborts a run silently.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, CoreError::NoActiveSelection)
    }
}

/// Convert CoreError to a string
impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}
