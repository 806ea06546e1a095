//! Model Client
//!
//! Front door used by the analysis engine: a chain of backends tried in
//! order. The first backend is the one selected in the settings; an optional
//! fallback backend is tried only when it raises an error. A backend that
//! returns text, even an apologetic one, ends the chain.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::neuroengine::{NeuroengineConfig, NeuroengineProvider, RequestOptions};
use super::openai::OpenAIProvider;
use super::provider::ModelBackend;
use super::types::{BackendKind, LlmError, LlmResult, ProviderConfig};

/// Record of a single backend attempt
#[derive(Debug, Clone)]
pub struct BackendAttempt {
    pub backend: &'static str,
    pub success: bool,
    pub error_message: Option<String>,
    pub duration_ms: u64,
}

/// Build one backend of the given kind
pub fn build_backend(
    kind: BackendKind,
    config: &ProviderConfig,
) -> LlmResult<Arc<dyn ModelBackend>> {
    let backend: Arc<dyn ModelBackend> = match kind {
        BackendKind::Neuroengine => Arc::new(
            NeuroengineProvider::new(
                NeuroengineConfig::default(),
                RequestOptions::for_analysis(config.max_retries),
            )?
            .with_strict_retries(config.strict_retries),
        ),
        BackendKind::OpenAI => Arc::new(OpenAIProvider::new(
            config.api_key.clone(),
            config.model.clone(),
            None,
        )?),
        BackendKind::Custom => Arc::new(OpenAIProvider::new(
            config.api_key.clone(),
            config.model.clone(),
            Some(&config.custom_endpoint),
        )?),
    };
    Ok(backend)
}

/// Ordered chain of model backends
#[derive(Clone)]
pub struct ModelClient {
    backends: Vec<Arc<dyn ModelBackend>>,
}

impl ModelClient {
    /// Create a client over explicit backends, tried in order
    pub fn new(backends: Vec<Arc<dyn ModelBackend>>) -> Self {
        Self { backends }
    }

    /// Create a client with a single backend
    pub fn single(backend: Arc<dyn ModelBackend>) -> Self {
        Self::new(vec![backend])
    }

    /// Build the chain described by the configuration
    pub fn from_config(config: &ProviderConfig) -> LlmResult<Self> {
        let primary = BackendKind::from_service(&config.service);
        let mut backends = vec![build_backend(primary, config)?];

        if let Some(fallback) = config.fallback_service.as_deref() {
            let kind = BackendKind::from_service(fallback);
            if kind != primary {
                backends.push(build_backend(kind, config)?);
            }
        }

        info!(
            "Model client ready: {}",
            backends
                .iter()
                .map(|b| format!("{}({})", b.name(), b.model()))
                .collect::<Vec<_>>()
                .join(" -> ")
        );

        Ok(Self { backends })
    }

    /// Backend names in order
    pub fn backend_names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Models offered by the first backend able to list them
    pub async fn list_models(&self) -> LlmResult<Option<Vec<String>>> {
        for backend in &self.backends {
            if let Some(models) = backend.list_models().await? {
                return Ok(Some(models));
            }
        }
        Ok(None)
    }

    /// Send a prompt through the chain.
    pub async fn send(&self, prompt: &str, response_prefix: &str) -> LlmResult<String> {
        let (result, _) = self.send_with_log(prompt, response_prefix).await;
        result
    }

    /// Send a prompt and also return what each backend attempt did.
    pub async fn send_with_log(
        &self,
        prompt: &str,
        response_prefix: &str,
    ) -> (LlmResult<String>, Vec<BackendAttempt>) {
        let mut attempts = Vec::new();
        let mut last_error = LlmError::ServiceUnavailable {
            message: "no model backend configured".to_string(),
        };

        for backend in &self.backends {
            let started = Instant::now();
            debug!("Calling backend {}", backend.name());

            match backend.send(prompt, response_prefix).await {
                Ok(text) => {
                    attempts.push(BackendAttempt {
                        backend: backend.name(),
                        success: true,
                        error_message: None,
                        duration_ms: started.elapsed().as_millis() as u64,
                    });
                    return (Ok(text), attempts);
                }
                Err(e) => {
                    warn!("Backend {} failed: {}", backend.name(), e);
                    attempts.push(BackendAttempt {
                        backend: backend.name(),
                        success: false,
                        error_message: Some(e.to_string()),
                        duration_ms: started.elapsed().as_millis() as u64,
                    });
                    last_error = e;
                }
            }
        }

        (Err(last_error), attempts)
    }
}
