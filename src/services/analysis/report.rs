//! Markdown Report
//!
//! Writes `<document>.report.md`: one block per finding with its location
//! and the verification reasoning. The file is recreated at the start of
//! every run that has reporting enabled.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use autokaker_core::Finding;

use crate::utils::error::AppResult;
use crate::utils::paths::report_path;

/// Separator written after every report block
pub const BLOCK_SEPARATOR: &str = "\n\n---\n\n";

/// Append-only report for one document
#[derive(Debug, Clone)]
pub struct ReportWriter {
    path: PathBuf,
    document: String,
}

impl ReportWriter {
    /// Report sitting next to `document`
    pub fn for_document(document: &Path) -> Self {
        Self {
            path: report_path(document),
            document: document.display().to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start the report over; a missing file is fine
    pub fn reset(&self) -> AppResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Removed previous report {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Append one finding block
    pub fn append(&self, finding: &Finding, rationale: &str) -> AppResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(self.format_block(finding, rationale).as_bytes())?;
        Ok(())
    }

    fn format_block(&self, finding: &Finding, rationale: &str) -> String {
        format!(
            "# {}\n## {}:{}\n{}{}",
            finding.short_description, self.document, finding.line, rationale, BLOCK_SEPARATOR
        )
    }
}
