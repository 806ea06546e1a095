//! Storage Layer
//!
//! Persistent settings for the headless host.

pub mod config;

pub use config::ConfigService;
