//! Findings and Response Parsing
//!
//! Extracts the `{"vulnerabilities": [...]}` object from free-form model text.
//! The model is coaxed into JSON but routinely surrounds it with prose, so the
//! first balanced `{...}` object is located by depth counting and then parsed
//! strictly. Any decoding failure rejects the whole response.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};

/// Prefix marking a finding that the verification pass judged unlikely.
pub const DOWNGRADE_PREFIX: &str = "(UNLIKELY) ";

/// One reported vulnerability candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// 1-based line in the analyzed document
    pub line: u32,
    /// Short human-readable description
    #[serde(
        rename = "shortdescription",
        alias = "shortDescription",
        alias = "short_description"
    )]
    pub short_description: String,
    /// Severity, nominally 1 (low) to 10 (high)
    pub impact: f64,
}

impl Finding {
    pub fn new(line: u32, short_description: impl Into<String>, impact: f64) -> Self {
        Self {
            line,
            short_description: short_description.into(),
            impact,
        }
    }

    /// Mark the finding as low-confidence; applying it twice is a no-op.
    pub fn downgrade(&mut self) {
        if !self.is_downgraded() {
            self.short_description = format!("{}{}", DOWNGRADE_PREFIX, self.short_description);
        }
    }

    pub fn is_downgraded(&self) -> bool {
        self.short_description.starts_with(DOWNGRADE_PREFIX)
    }

    /// Background opacity for an inline annotation: impact 1 maps to 0.0,
    /// impact 10 to 0.5.
    pub fn highlight_alpha(&self) -> f64 {
        ((self.impact.clamp(1.0, 10.0) - 1.0) * (0.5 / 9.0)).max(0.0)
    }
}

/// Wire shape of a model answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VulnerabilityReport {
    pub vulnerabilities: Vec<Finding>,
}

/// Locate the leftmost balanced `{...}` object in `text`.
///
/// Braces inside JSON string literals do not count towards the depth.
pub fn extract_json_object(text: &str) -> Option<&str> {
    text.match_indices('{')
        .find_map(|(start, _)| balanced_end(&text[start..]).map(|len| &text[start..start + len]))
}

/// Length of the object starting at the first byte of `text` (a `{`), if it
/// closes.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, byte) in text.bytes().enumerate() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match byte {
            b'\\' if in_string => escape_next = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse a model reply into findings.
///
/// Fails with [`CoreError::MalformedResponse`] when no balanced object exists,
/// when it is not valid JSON, or when `vulnerabilities` or any entry's
/// required fields are missing or mistyped.
pub fn parse_findings(raw: &str) -> CoreResult<Vec<Finding>> {
    let json = extract_json_object(raw).ok_or_else(|| {
        warn!("No JSON object found in model response ({} bytes)", raw.len());
        CoreError::malformed("no balanced JSON object in response")
    })?;

    debug!("Extracted JSON object: {}", json);

    let report: VulnerabilityReport = serde_json::from_str(json).map_err(|e| {
        warn!("Extracted object is not a valid findings list: {}", e);
        CoreError::malformed(e.to_string())
    })?;

    Ok(report.vulnerabilities)
}
