//! Neuroengine Backend
//!
//! Client for the Neuroengine request/reply protocol. Every call is one JSON
//! POST to `/<service name>`; the server answers `{errorcode, reply}` and a
//! non-zero errorcode means "try again".
//!
//! The backend is deliberately soft: transport failures come back as an
//! explanatory text instead of an error, and exhausted retries return the last
//! reply seen. Strict mode turns both into [`LlmError::ServiceUnavailable`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::provider::{parse_http_error, ModelBackend};
use super::types::{LlmError, LlmResult};
use crate::http_client::build_http_client;

/// Default Neuroengine host
pub const DEFAULT_SERVER_ADDRESS: &str = "api.neuroengine.ai";

/// Default Neuroengine port
pub const DEFAULT_SERVER_PORT: u16 = 443;

/// Service used for vulnerability analysis
pub const VULN_SERVICE_NAME: &str = "Neuroengine-Vuln";

/// Connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuroengineConfig {
    pub server_address: String,
    pub server_port: u16,
    pub service_name: String,
    /// Account key (not sent with completion requests)
    pub key: String,
    /// `true` talks HTTPS, `false` plain HTTP
    pub verify_ssl: bool,
}

impl NeuroengineConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            server_address: DEFAULT_SERVER_ADDRESS.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            service_name: service_name.into(),
            key: String::new(),
            verify_ssl: true,
        }
    }

    /// Full URL of the service path.
    pub fn endpoint_url(&self) -> String {
        let scheme = if self.verify_ssl { "https" } else { "http" };
        format!(
            "{}://{}:{}/{}",
            scheme, self.server_address, self.server_port, self.service_name
        )
    }
}

impl Default for NeuroengineConfig {
    fn default() -> Self {
        Self::new(VULN_SERVICE_NAME)
    }
}

/// Sampling and retry options for one request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub min_p: f32,
    pub repetition_penalty: f32,
    pub max_new_len: u32,
    pub seed: u64,
    /// Skip the server-side chat template
    pub raw: bool,
    /// Attempt bound while the server answers with a non-zero errorcode
    pub tries: u32,
    pub gettokens: u32,
    pub streamkey: String,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.9,
            top_k: 40,
            min_p: 0.0,
            repetition_penalty: 1.2,
            max_new_len: 128,
            seed: 0,
            raw: false,
            tries: 5,
            gettokens: 20,
            streamkey: String::new(),
        }
    }
}

impl RequestOptions {
    /// Deterministic raw completion with room for a findings list.
    pub fn for_analysis(tries: u32) -> Self {
        Self {
            temperature: 0.0,
            max_new_len: 1000,
            raw: true,
            tries,
            ..Default::default()
        }
    }
}

/// Body of a completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuroengineCommand {
    pub message: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub min_p: f32,
    pub repetition_penalty: f32,
    pub max_new_len: u32,
    pub seed: u64,
    /// The server expects the strings `"true"` / `"false"`
    pub raw: String,
    pub key: String,
    pub gettokens: u32,
}

impl NeuroengineCommand {
    pub fn new(prompt: &str, options: &RequestOptions) -> Self {
        Self {
            message: prompt.to_string(),
            temperature: options.temperature,
            top_p: options.top_p,
            top_k: options.top_k,
            min_p: options.min_p,
            repetition_penalty: options.repetition_penalty,
            max_new_len: options.max_new_len,
            seed: options.seed,
            raw: options.raw.to_string(),
            key: options.streamkey.clone(),
            gettokens: options.gettokens,
        }
    }
}

/// Server reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuroengineReply {
    pub errorcode: i64,
    #[serde(default)]
    pub reply: String,
}

/// One request/response exchange with the server.
///
/// Split out from the provider so the retry policy can be exercised without
/// a network.
#[async_trait]
pub trait NeuroengineTransport: Send + Sync {
    async fn post(&self, body: &serde_json::Value) -> LlmResult<serde_json::Value>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(config: &NeuroengineConfig) -> LlmResult<Self> {
        Ok(Self {
            client: build_http_client()?,
            url: config.endpoint_url(),
        })
    }
}

#[async_trait]
impl NeuroengineTransport for HttpTransport {
    async fn post(&self, body: &serde_json::Value) -> LlmResult<serde_json::Value> {
        let response = self
            .client
            .post(&self.url)
            .json(body)
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
            return Err(parse_http_error(status, &body_text, "neuroengine"));
        }

        serde_json::from_str(&body_text).map_err(|_| LlmError::ParseError {
            message: "Failed to parse response".to_string(),
        })
    }
}

/// Neuroengine backend
pub struct NeuroengineProvider {
    config: NeuroengineConfig,
    options: RequestOptions,
    strict: bool,
    transport: Arc<dyn NeuroengineTransport>,
}

impl NeuroengineProvider {
    /// Create a provider talking HTTP(S) to the configured server
    pub fn new(config: NeuroengineConfig, options: RequestOptions) -> LlmResult<Self> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        Ok(Self::with_transport(config, options, transport))
    }

    /// Create a provider over an arbitrary transport
    pub fn with_transport(
        config: NeuroengineConfig,
        options: RequestOptions,
        transport: Arc<dyn NeuroengineTransport>,
    ) -> Self {
        Self {
            config,
            options,
            strict: false,
            transport,
        }
    }

    /// Raise instead of degrading to text on failure
    pub fn with_strict_retries(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn config(&self) -> &NeuroengineConfig {
        &self.config
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    /// Send a completion request, retrying while the server reports an error.
    pub async fn request(&self, prompt: &str) -> LlmResult<String> {
        if prompt.is_empty() {
            return Ok(String::new());
        }

        let command = serde_json::to_value(NeuroengineCommand::new(prompt, &self.options))
            .map_err(|e| LlmError::Other {
                message: e.to_string(),
            })?;

        let tries = self.options.tries.max(1);
        let mut last_reply: Option<NeuroengineReply> = None;

        for attempt in 1..=tries {
            debug!(
                "Neuroengine request to {} (attempt {}/{})",
                self.config.service_name, attempt, tries
            );

            let reply = match self.exchange(&command).await {
                Ok(reply) => reply,
                Err(e) => return self.connection_failure(e),
            };

            if reply.errorcode == 0 {
                if attempt > 1 {
                    info!("Neuroengine answered after {} attempts", attempt);
                }
                return Ok(reply.reply);
            }

            warn!(
                "Neuroengine attempt {}/{} returned errorcode {}",
                attempt, tries, reply.errorcode
            );
            last_reply = Some(reply);
        }

        if self.strict {
            return Err(LlmError::ServiceUnavailable {
                message: format!("no successful reply after {} attempts", tries),
            });
        }

        warn!("Neuroengine retries exhausted, returning last reply");
        Ok(last_reply.map(|r| r.reply).unwrap_or_default())
    }

    /// Ask the server for its model list (`{"command": "getmodels"}`).
    pub async fn get_models(&self) -> LlmResult<serde_json::Value> {
        self.transport
            .post(&serde_json::json!({ "command": "getmodels" }))
            .await
    }

    async fn exchange(&self, command: &serde_json::Value) -> LlmResult<NeuroengineReply> {
        let value = self.transport.post(command).await?;
        serde_json::from_value(value).map_err(|_| LlmError::ParseError {
            message: "Failed to parse response".to_string(),
        })
    }

    fn connection_failure(&self, err: LlmError) -> LlmResult<String> {
        warn!("Neuroengine connection failed: {}", err);
        if self.strict {
            Err(LlmError::ServiceUnavailable {
                message: err.to_string(),
            })
        } else {
            Ok(format!("Connection error. Try in a few seconds ({})", err))
        }
    }
}

/// Pull model names out of a `getmodels` answer.
fn model_names(value: &serde_json::Value) -> Option<Vec<String>> {
    let entries = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(map) => map.get("models")?.as_array()?,
        _ => return None,
    };

    Some(
        entries
            .iter()
            .filter_map(|entry| match entry {
                serde_json::Value::String(name) => Some(name.clone()),
                other => other
                    .get("name")
                    .or_else(|| other.get("id"))
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string()),
            })
            .collect(),
    )
}

#[async_trait]
impl ModelBackend for NeuroengineProvider {
    fn name(&self) -> &'static str {
        "neuroengine"
    }

    fn model(&self) -> &str {
        &self.config.service_name
    }

    /// The prefix is appended to the prompt: the raw completion continues
    /// from it.
    async fn send(&self, prompt: &str, response_prefix: &str) -> LlmResult<String> {
        self.request(&format!("{}{}", prompt, response_prefix)).await
    }

    async fn list_models(&self) -> LlmResult<Option<Vec<String>>> {
        let value = self.get_models().await?;
        Ok(model_names(&value))
    }
}
