//! Autokaker
//!
//! Incremental, LLM-assisted vulnerability analysis of source code.
//! It includes:
//! - The analysis orchestrator with its per-document finding cache
//! - Prompts, verification pass and Markdown report
//! - The editor host interface and a headless host for the command line
//! - Settings storage and utilities

pub mod host;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use host::{DocumentKey, EditorHost, RenderHandle, SERVICE_UNAVAILABLE_MESSAGE};
pub use models::settings::AnalyzerSettings;
pub use services::analysis::{
    AnalysisOrchestrator, CacheEntry, FindingCache, OrchestratorState, RunOutcome, RunSummary,
};
pub use services::headless::FileHost;
pub use storage::config::ConfigService;
pub use utils::error::{AppError, AppResult};

// Engine building blocks, re-exported for hosts
pub use autokaker_core::{CoreError, Finding, LineRange, RunMode};
pub use autokaker_llm::{LlmError, ModelBackend, ModelClient};
