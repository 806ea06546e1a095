//! Finding Verification
//!
//! Second opinion on a single finding. The model reasons about the finding
//! and ends on a verdict token; an unlikely verdict downgrades the finding
//! instead of dropping it.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use autokaker_core::{CoreResult, Finding};
use autokaker_llm::ModelClient;

use super::prompts::{strip_echo, verification_prompt, LIKELY_TOKEN, UNLIKELY_TOKEN};

/// Conclusion drawn from a verification reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Likely,
    Unlikely,
    Undetermined,
}

impl Verdict {
    /// `UNLIKELY` anywhere in the reply wins, since it also contains `LIKELY`.
    pub fn from_reply(reply: &str) -> Self {
        if reply.contains(UNLIKELY_TOKEN) {
            Verdict::Unlikely
        } else if reply.contains(LIKELY_TOKEN) {
            Verdict::Likely
        } else {
            Verdict::Undetermined
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Likely => write!(f, "likely"),
            Verdict::Unlikely => write!(f, "unlikely"),
            Verdict::Undetermined => write!(f, "undetermined"),
        }
    }
}

/// Result of verifying one finding
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub verdict: Verdict,
    /// Model reasoning with the prompt echo removed; goes into the report
    pub rationale: String,
}

/// Verify `finding` against the code it was reported in, downgrading it on
/// an unlikely verdict.
pub async fn verify_finding(
    client: &ModelClient,
    code: &str,
    finding: &mut Finding,
) -> CoreResult<Verification> {
    debug!("Verifying line {}: {}", finding.line, finding.short_description);

    let prompt = verification_prompt(code, finding);
    let reply = client.send(&prompt, "").await?;
    let rationale = strip_echo(&reply, &prompt);
    let verdict = Verdict::from_reply(&rationale);

    if verdict == Verdict::Unlikely {
        finding.downgrade();
    }
    info!("Line {} verdict: {}", finding.line, verdict);

    Ok(Verification { verdict, rationale })
}
