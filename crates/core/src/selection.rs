//! Range Selection
//!
//! Picks which blocks an analysis run covers, cursor block first.

use serde::{Deserialize, Serialize};

use crate::range::LineRange;

/// Scope of an analysis run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// No run in progress; the selector is never consulted
    #[default]
    Idle,
    /// Only the block under the cursor
    AnalyzeCurrentBlock,
    /// The block under the cursor, then every other block in document order
    AnalyzeAllBlocks,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Idle => write!(f, "idle"),
            RunMode::AnalyzeCurrentBlock => write!(f, "analyze_current_block"),
            RunMode::AnalyzeAllBlocks => write!(f, "analyze_all_blocks"),
        }
    }
}

/// Find the first range containing a zero-based line.
pub fn find_range_for_line(ranges: &[LineRange], line: usize) -> Option<&LineRange> {
    ranges.iter().find(|range| range.contains(line))
}

/// Order the ranges to analyze for a cursor position.
///
/// Returns an empty list when the cursor is outside every range (there is no
/// default block) or when `mode` is [`RunMode::Idle`].
pub fn select_ranges(ranges: &[LineRange], cursor_line: usize, mode: RunMode) -> Vec<LineRange> {
    let Some(current) = find_range_for_line(ranges, cursor_line).copied() else {
        return Vec::new();
    };

    match mode {
        RunMode::Idle => Vec::new(),
        RunMode::AnalyzeCurrentBlock => vec![current],
        RunMode::AnalyzeAllBlocks => {
            let mut selected = Vec::with_capacity(ranges.len());
            selected.push(current);
            selected.extend(ranges.iter().copied().filter(|range| *range != current));
            selected
        }
    }
}
