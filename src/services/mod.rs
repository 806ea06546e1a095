//! Services
//!
//! Business logic of the analyzer and the headless host that drives it from
//! the command line.

pub mod analysis;
pub mod headless;

pub use analysis::{AnalysisOrchestrator, RunOutcome, RunSummary};
pub use headless::FileHost;
