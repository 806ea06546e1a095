//! Headless Host
//!
//! [`EditorHost`] over a file on disk, used by the command line binary.
//! Findings are collected in memory and printed once the run is over;
//! progress and errors go to stderr.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde_json::Value;

use autokaker_core::{Finding, LineRange};

use crate::host::{DocumentKey, EditorHost, RenderHandle};
use crate::models::settings::AnalyzerSettings;
use crate::utils::error::AppResult;

/// A finding currently on display
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFinding {
    pub handle: RenderHandle,
    pub range: LineRange,
    pub finding: Finding,
}

/// Host for a single document read from disk
pub struct FileHost {
    document: DocumentKey,
    text: String,
    cursor_line: usize,
    settings: AnalyzerSettings,
    next_handle: AtomicU64,
    rendered: Mutex<Vec<RenderedFinding>>,
}

impl FileHost {
    /// Load `path` with the cursor on a zero-based line
    pub fn open(path: &Path, cursor_line: usize, settings: AnalyzerSettings) -> AppResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_text(
            DocumentKey::from_path(path),
            text,
            cursor_line,
            settings,
        ))
    }

    pub fn from_text(
        document: DocumentKey,
        text: impl Into<String>,
        cursor_line: usize,
        settings: AnalyzerSettings,
    ) -> Self {
        Self {
            document,
            text: text.into(),
            cursor_line,
            settings,
            next_handle: AtomicU64::new(1),
            rendered: Mutex::new(Vec::new()),
        }
    }

    pub fn document(&self) -> &DocumentKey {
        &self.document
    }

    /// Findings still on display, in render order
    pub fn rendered(&self) -> Vec<RenderedFinding> {
        self.rendered
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// One line per finding: `path:line [impact] description`
    pub fn format_findings(&self) -> String {
        self.rendered()
            .iter()
            .map(|r| {
                format!(
                    "{}:{} [{}] {}",
                    self.document, r.finding.line, r.finding.impact, r.finding.short_description
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl EditorHost for FileHost {
    fn document_text(&self, doc: &DocumentKey) -> Option<String> {
        (doc == &self.document).then(|| self.text.clone())
    }

    fn cursor_line(&self, doc: &DocumentKey) -> Option<usize> {
        (doc == &self.document).then_some(self.cursor_line)
    }

    fn render_finding(&self, _doc: &DocumentKey, range: LineRange, finding: &Finding) -> RenderHandle {
        let handle = RenderHandle::new(self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.rendered
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(RenderedFinding {
                handle,
                range,
                finding: finding.clone(),
            });
        handle
    }

    fn unrender(&self, handle: RenderHandle) {
        self.rendered
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .retain(|r| r.handle != handle);
    }

    fn notify_progress(&self, message: &str, _approx_duration_ms: u64) {
        eprintln!("{}", message);
    }

    fn notify_error(&self, message: &str) {
        eprintln!("error: {}", message);
    }

    fn read_config(&self, key: &str, default: Value) -> Value {
        self.settings.get(key).unwrap_or(default)
    }
}
