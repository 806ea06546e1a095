//! HTTP Client Factory
//!
//! Builds the reqwest client shared by the HTTP backends. Timeouts are left
//! to the transport defaults.

use super::types::{LlmError, LlmResult};

const USER_AGENT: &str = concat!("autokaker/", env!("CARGO_PKG_VERSION"));

/// Build a `reqwest::Client` for backend traffic.
///
/// Proxy settings from the environment are honoured, as for any reqwest
/// client.
pub fn build_http_client() -> LlmResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| LlmError::Other {
            message: format!("failed to build HTTP client: {}", e),
        })
}
