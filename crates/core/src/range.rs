//! Block Extraction
//!
//! Partitions raw source text into top-level brace-delimited blocks.
//!
//! This is a brace-counting heuristic over raw lines, not a tokenizer: braces
//! inside string literals or comments are counted like any other. Every line
//! contributes at most one push (if it contains `{`) followed by at most one
//! pop (if it contains `}`).

use serde::{Deserialize, Serialize};

/// Lines captured above an opening brace so a block includes its signature.
pub const SIGNATURE_LOOKBACK: usize = 5;

/// A zero-based, inclusive span of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    /// Create a range; `start` and `end` are swapped if given out of order.
    pub fn new(start: usize, end: usize) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Whether a zero-based line lies inside this range.
    pub fn contains(&self, line: usize) -> bool {
        self.start <= line && line <= self.end
    }

    /// Whether a 1-based finding line lies inside this range.
    pub fn contains_finding_line(&self, line: u32) -> bool {
        line >= 1 && self.contains((line - 1) as usize)
    }

    /// Number of lines covered.
    pub fn line_count(&self) -> usize {
        self.end - self.start + 1
    }
}

impl std::fmt::Display for LineRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Extract the top-level blocks of `text`, in order of appearance.
///
/// Opening a brace pushes `max(line - SIGNATURE_LOOKBACK, 0)`; closing one
/// pops, and a pop that empties the stack emits `{start: popped, end: line}`.
/// Closing braces with an empty stack are ignored and unclosed blocks are
/// dropped.
///
/// The look-back never reaches into the previous top-level block, so the
/// result is ordered and pairwise disjoint.
pub fn extract_block_ranges(text: &str) -> Vec<LineRange> {
    let mut ranges: Vec<LineRange> = Vec::new();
    let mut stack: Vec<usize> = Vec::new();

    for (index, line) in text.split('\n').enumerate() {
        if line.contains('{') {
            stack.push(index.saturating_sub(SIGNATURE_LOOKBACK));
        }

        if line.contains('}') {
            if let Some(start) = stack.pop() {
                if stack.is_empty() {
                    let start = match ranges.last() {
                        Some(prev) => start.max(prev.end + 1),
                        None => start,
                    };
                    ranges.push(LineRange { start, end: index });
                }
            }
        }
    }

    if !stack.is_empty() {
        tracing::debug!("Discarding {} unclosed block(s)", stack.len());
    }

    ranges
}

/// Render the lines of `range` prefixed with their 1-based line numbers.
///
/// Lines past the end of the document are skipped.
pub fn numbered_range_text(text: &str, range: &LineRange) -> String {
    text.split('\n')
        .enumerate()
        .skip(range.start)
        .take(range.line_count())
        .map(|(index, line)| format!("{} {}", index + 1, line))
        .collect::<Vec<_>>()
        .join("\n")
}
