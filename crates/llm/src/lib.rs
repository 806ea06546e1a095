//! Autokaker LLM
//!
//! Model backends for the analysis engine:
//! - Neuroengine (primary): custom request/reply protocol with retries
//! - OpenAI and OpenAI-compatible custom endpoints (alternate): chat
//!   completions, single attempt
//!
//! `ModelClient` chains the configured backends and hides their differing
//! response-prefix conventions.

pub mod client;
pub mod http_client;
pub mod neuroengine;
pub mod openai;
pub mod provider;
pub mod types;

// Re-export main types
pub use client::{build_backend, BackendAttempt, ModelClient};
pub use http_client::build_http_client;
pub use neuroengine::{
    HttpTransport, NeuroengineCommand, NeuroengineConfig, NeuroengineProvider,
    NeuroengineReply, NeuroengineTransport, RequestOptions,
};
pub use openai::OpenAIProvider;
pub use provider::ModelBackend;
pub use types::*;
