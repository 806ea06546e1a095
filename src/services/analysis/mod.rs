//! Analysis Engine
//!
//! Incremental vulnerability analysis of the blocks of an open document.

pub mod cache;
pub mod orchestrator;
pub mod prompts;
pub mod report;
pub mod verifier;

pub use cache::{CacheEntry, DocumentCaches, FindingCache};
pub use orchestrator::{
    progress_message, AnalysisOrchestrator, OrchestratorState, RangesReadyHandler, RunOutcome,
    RunSummary,
};
pub use report::ReportWriter;
pub use verifier::{verify_finding, Verdict, Verification};
