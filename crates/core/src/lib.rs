//! Autokaker Core
//!
//! Dependency-light building blocks of the analysis engine. Nothing here
//! performs I/O or talks to a model backend.
//!
//! ## Module Organization
//!
//! - `error` - Core error taxonomy (`CoreError`, `CoreResult`)
//! - `range` - `LineRange` and the brace-counting block extractor
//! - `selection` - `RunMode` and cursor-first range selection
//! - `finding` - `Finding` and the model response parser

pub mod error;
pub mod finding;
pub mod range;
pub mod selection;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Block Extraction ───────────────────────────────────────────────────
pub use range::{extract_block_ranges, numbered_range_text, LineRange, SIGNATURE_LOOKBACK};

// ── Range Selection ────────────────────────────────────────────────────
pub use selection::{find_range_for_line, select_ranges, RunMode};

// ── Findings ───────────────────────────────────────────────────────────
pub use finding::{
    extract_json_object, parse_findings, Finding, VulnerabilityReport, DOWNGRADE_PREFIX,
};
