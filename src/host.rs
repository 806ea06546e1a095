//! Editor Host Interface
//!
//! The analysis engine never touches an editor directly. Everything it needs
//! from the surrounding UI (document text, cursor, rendering, notifications,
//! settings) goes through [`EditorHost`], implemented by whatever embeds the
//! engine. The headless CLI host lives in `services::headless`.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use autokaker_core::{Finding, LineRange};

use crate::services::analysis::cache::CacheEntry;

/// Generic user-facing message for any per-range analysis failure
pub const SERVICE_UNAVAILABLE_MESSAGE: &str = "AI service not available.";

/// Identity of an open document, stable while it stays open
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentKey(String);

impl DocumentKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key a document by its file path
    pub fn from_path(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The key read back as a filesystem path
    pub fn to_path(&self) -> PathBuf {
        PathBuf::from(&self.0)
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque token handed out by the host when it displays a finding.
/// Passing it back to [`EditorHost::unrender`] removes that display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderHandle(u64);

impl RenderHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Collaborator implemented by the embedding editor or UI.
///
/// Calls are synchronous and fire-and-forget from the engine's side: a slow
/// host slows the run down, nothing more.
pub trait EditorHost: Send + Sync {
    /// Full text of an open document, `None` when it is not open
    fn document_text(&self, doc: &DocumentKey) -> Option<String>;

    /// Zero-based cursor line, `None` when there is no cursor
    fn cursor_line(&self, doc: &DocumentKey) -> Option<usize>;

    /// Display a finding over `range` and return a handle for its removal
    fn render_finding(&self, doc: &DocumentKey, range: LineRange, finding: &Finding)
        -> RenderHandle;

    /// Remove a previously rendered finding
    fn unrender(&self, handle: RenderHandle);

    /// Show a transient progress message for roughly `approx_duration_ms`
    fn notify_progress(&self, message: &str, approx_duration_ms: u64);

    /// Show an error message to the user
    fn notify_error(&self, message: &str);

    /// Read one setting, falling back to `default`
    fn read_config(&self, key: &str, default: Value) -> Value;

    /// Show a cached finding again after the document regains focus.
    /// Hosts whose displays survive focus changes can ignore this.
    fn redisplay(&self, _doc: &DocumentKey, _entry: &CacheEntry) {}
}
