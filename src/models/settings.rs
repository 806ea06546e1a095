//! Settings Models
//!
//! Analyzer configuration and its mapping onto the model backends.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use autokaker_llm::{BackendKind, ProviderConfig, DEFAULT_MODEL, DEFAULT_SERVICE};

use crate::host::EditorHost;

/// Analyzer configuration stored in config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyzerSettings {
    /// Backend selection: "Neuroengine.ai", "OpenAI" or "Custom"
    pub service: String,
    /// Bearer token for OpenAI-style backends
    pub api_key: String,
    /// Model used by OpenAI-style backends
    pub model_name: String,
    /// Endpoint used when `service` is "Custom"
    pub custom_endpoint: String,
    /// Ask for a free-form list first, then have it reformatted into JSON
    pub multishot: bool,
    /// Run the verification pass on every finding
    pub verify: bool,
    /// Write `<document>.report.md`
    pub report: bool,
    /// Attempt bound for the Neuroengine backend
    pub max_retries: u32,
    /// Raise instead of returning the last reply when retries run out
    pub strict_retries: bool,
    /// Backend tried when the selected one fails
    pub fallback_service: Option<String>,
    /// Duration hint for progress notifications
    pub progress_duration_ms: u64,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            service: DEFAULT_SERVICE.to_string(),
            api_key: String::new(),
            model_name: DEFAULT_MODEL.to_string(),
            custom_endpoint: String::new(),
            multishot: false,
            verify: false,
            report: false,
            max_retries: 5,
            strict_retries: false,
            fallback_service: None,
            progress_duration_ms: 5000,
        }
    }
}

impl AnalyzerSettings {
    /// Read every setting through the host, keeping defaults for missing or
    /// mistyped values
    pub fn from_host(host: &dyn EditorHost) -> Self {
        let defaults = Self::default();
        Self {
            service: read_key(host, "service", defaults.service),
            api_key: read_key(host, "apiKey", defaults.api_key),
            model_name: read_key(host, "modelName", defaults.model_name),
            custom_endpoint: read_key(host, "customEndpoint", defaults.custom_endpoint),
            multishot: read_key(host, "multishot", defaults.multishot),
            verify: read_key(host, "verify", defaults.verify),
            report: read_key(host, "report", defaults.report),
            max_retries: read_key(host, "maxRetries", defaults.max_retries),
            strict_retries: read_key(host, "strictRetries", defaults.strict_retries),
            fallback_service: read_key(host, "fallbackService", defaults.fallback_service),
            progress_duration_ms: read_key(
                host,
                "progressDurationMs",
                defaults.progress_duration_ms,
            ),
        }
    }

    /// Look up one setting by its config key
    pub fn get(&self, key: &str) -> Option<Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map.get(key).cloned(),
            _ => None,
        }
    }

    /// Whether the verification pass runs; the report needs its text too
    pub fn verification_enabled(&self) -> bool {
        self.verify || self.report
    }

    /// Backend configuration for the model client
    pub fn to_provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            service: self.service.clone(),
            api_key: self.api_key.clone(),
            model: self.model_name.clone(),
            custom_endpoint: self.custom_endpoint.clone(),
            max_retries: self.max_retries,
            strict_retries: self.strict_retries,
            fallback_service: self.fallback_service.clone(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_retries == 0 {
            return Err("maxRetries must be at least 1".to_string());
        }

        let services = std::iter::once(self.service.as_str())
            .chain(self.fallback_service.as_deref());
        for service in services {
            if BackendKind::from_service(service) == BackendKind::Custom
                && self.custom_endpoint.trim().is_empty()
            {
                return Err(format!(
                    "service '{}' needs customEndpoint to be set",
                    service
                ));
            }
        }

        Ok(())
    }
}

fn read_key<T>(host: &dyn EditorHost, key: &str, default: T) -> T
where
    T: Serialize + DeserializeOwned,
{
    let fallback = match serde_json::to_value(&default) {
        Ok(value) => value,
        Err(_) => return default,
    };
    match serde_json::from_value(host.read_config(key, fallback)) {
        Ok(value) => value,
        Err(e) => {
            warn!("Ignoring setting '{}': {}", key, e);
            default
        }
    }
}
