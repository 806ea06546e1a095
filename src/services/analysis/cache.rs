//! Finding Cache
//!
//! Per-document record of rendered findings. Entries keep insertion order so
//! a restore re-renders them exactly as they first appeared.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use autokaker_core::{Finding, LineRange};

use crate::host::{DocumentKey, EditorHost, RenderHandle};

/// One rendered finding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntry {
    /// Zero-based line span the finding is displayed on
    pub range: LineRange,
    pub finding: Finding,
    #[serde(skip)]
    pub handle: RenderHandle,
}

impl CacheEntry {
    pub fn new(range: LineRange, finding: Finding, handle: RenderHandle) -> Self {
        Self {
            range,
            finding,
            handle,
        }
    }
}

/// Ordered findings of one document
#[derive(Debug, Clone, Default)]
pub struct FindingCache {
    entries: Vec<CacheEntry>,
}

impl FindingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry whose finding line falls inside `range`, unrendering
    /// it first. Returns how many entries were removed.
    pub fn invalidate(&mut self, range: &LineRange, host: &dyn EditorHost) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| {
            if range.contains_finding_line(entry.finding.line) {
                host.unrender(entry.handle);
                false
            } else {
                true
            }
        });

        let removed = before - self.entries.len();
        if removed > 0 {
            debug!("Invalidated {} finding(s) in {}", removed, range);
        }
        removed
    }

    /// Append an entry; several findings may share a line
    pub fn store(&mut self, entry: CacheEntry) {
        self.entries.push(entry);
    }

    /// Current entries in insertion order
    pub fn restore(&self) -> &[CacheEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Caches of every document the engine has analyzed
#[derive(Debug, Default)]
pub struct DocumentCaches {
    documents: HashMap<DocumentKey, FindingCache>,
}

impl DocumentCaches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache for `doc`, created empty on first use
    pub fn entry(&mut self, doc: &DocumentKey) -> &mut FindingCache {
        self.documents.entry(doc.clone()).or_default()
    }

    pub fn get(&self, doc: &DocumentKey) -> Option<&FindingCache> {
        self.documents.get(doc)
    }

    /// Forget a closed document, unrendering its findings
    pub fn remove(&mut self, doc: &DocumentKey, host: &dyn EditorHost) -> usize {
        match self.documents.remove(doc) {
            Some(cache) => {
                for entry in cache.restore() {
                    host.unrender(entry.handle);
                }
                cache.len()
            }
            None => 0,
        }
    }
}
