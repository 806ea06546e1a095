//! Data Models
//!
//! Configuration data structures shared by the engine and its hosts.

pub mod settings;

pub use settings::AnalyzerSettings;
