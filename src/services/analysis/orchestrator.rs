//! Analysis Orchestrator
//!
//! Drives one analysis run end to end: extract blocks, pick the ones to
//! analyze, then for each block in turn invalidate, ask the model, parse,
//! verify, render, cache and report.
//!
//! Blocks are processed strictly one after another. Only one run may be in
//! flight; a second invocation while one is running is dropped without
//! notice. A failure in one block is reported to the user once and the run
//! moves on to the next block.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use autokaker_core::{
    extract_block_ranges, numbered_range_text, parse_findings, select_ranges, CoreError,
    CoreResult, LineRange, RunMode,
};
use autokaker_llm::ModelClient;

use super::cache::{CacheEntry, DocumentCaches};
use super::prompts::{
    multi_shot_prompt, reformat_prompt, single_shot_prompt, strip_echo, JSON_BEGIN,
};
use super::report::ReportWriter;
use super::verifier::{verify_finding, Verdict};
use crate::host::{DocumentKey, EditorHost, SERVICE_UNAVAILABLE_MESSAGE};
use crate::models::settings::AnalyzerSettings;
use crate::utils::error::{AppError, AppResult};

/// Callback receiving the blocks selected for a run, in analysis order
pub type RangesReadyHandler = Box<dyn Fn(&DocumentKey, &[LineRange]) + Send + Sync>;

/// Orchestrator state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OrchestratorState {
    Idle,
    Running { document: DocumentKey, mode: RunMode },
}

/// Counters for one completed run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Blocks selected for the run
    pub ranges: usize,
    /// Blocks sent to the model
    pub analyzed: usize,
    /// Blocks whose cached findings were cleared instead of re-analyzed
    pub skipped: usize,
    /// Blocks that failed
    pub failed: usize,
    /// Findings rendered and cached
    pub findings: usize,
}

/// What an invocation ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(RunSummary),
    /// Another run was in flight
    Busy,
    /// Idle mode, no open document, or cursor outside every block
    NothingSelected,
}

enum RangeOutcome {
    Skipped { cleared: usize },
    Analyzed { findings: usize },
}

/// Progress text shown before a block is sent to the model
pub fn progress_message(mode: RunMode, position: usize, total: usize) -> String {
    match mode {
        RunMode::AnalyzeAllBlocks => {
            format!("AUTOK: Analyzing function {} of {}...", position, total)
        }
        _ => "AUTOK: Analyzing current function...".to_string(),
    }
}

/// Resets the state to idle when a run ends, however it ends
struct RunGuard<'a> {
    state: &'a Mutex<OrchestratorState>,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        *state = OrchestratorState::Idle;
    }
}

/// Where a run gets its model client from
enum ClientSource {
    Fixed(ModelClient),
    /// Rebuilt from the host settings at the start of every run
    Settings,
}

/// Incremental analysis engine bound to one editor host
pub struct AnalysisOrchestrator {
    host: Arc<dyn EditorHost>,
    client: ClientSource,
    state: Mutex<OrchestratorState>,
    caches: RwLock<DocumentCaches>,
    ranges_ready: Vec<RangesReadyHandler>,
}

impl AnalysisOrchestrator {
    pub fn new(host: Arc<dyn EditorHost>, client: ModelClient) -> Self {
        Self::with_source(host, ClientSource::Fixed(client))
    }

    /// Follow the host's backend settings, re-read at every run.
    ///
    /// The settings are validated once here so a broken configuration
    /// surfaces before the first run.
    pub fn from_host(host: Arc<dyn EditorHost>) -> AppResult<Self> {
        let settings = AnalyzerSettings::from_host(host.as_ref());
        settings.validate().map_err(AppError::config)?;
        ModelClient::from_config(&settings.to_provider_config())?;
        Ok(Self::with_source(host, ClientSource::Settings))
    }

    fn with_source(host: Arc<dyn EditorHost>, client: ClientSource) -> Self {
        Self {
            host,
            client,
            state: Mutex::new(OrchestratorState::Idle),
            caches: RwLock::new(DocumentCaches::new()),
            ranges_ready: Vec::new(),
        }
    }

    /// Register a callback fired once the blocks of a run are selected
    pub fn on_ranges_ready<F>(&mut self, handler: F)
    where
        F: Fn(&DocumentKey, &[LineRange]) + Send + Sync + 'static,
    {
        self.ranges_ready.push(Box::new(handler));
    }

    pub fn state(&self) -> OrchestratorState {
        self.state.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state(), OrchestratorState::Running { .. })
    }

    fn try_begin(&self, doc: &DocumentKey, mode: RunMode) -> Option<RunGuard<'_>> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if *state != OrchestratorState::Idle {
            return None;
        }
        *state = OrchestratorState::Running {
            document: doc.clone(),
            mode,
        };
        Some(RunGuard { state: &self.state })
    }

    /// Analyze `doc` around its cursor.
    ///
    /// Never fails for a single block; errors that escape are about the run
    /// as a whole.
    pub async fn run(&self, doc: &DocumentKey, mode: RunMode) -> AppResult<RunOutcome> {
        if mode == RunMode::Idle {
            return Ok(RunOutcome::NothingSelected);
        }

        let _guard = match self.try_begin(doc, mode) {
            Some(guard) => guard,
            None => {
                info!("Analysis already running, dropping {} request for {}", mode, doc);
                return Ok(RunOutcome::Busy);
            }
        };

        match self.run_selected(doc, mode).await {
            Err(AppError::Core(CoreError::NoActiveSelection)) => {
                debug!("No block under the cursor in {}", doc);
                Ok(RunOutcome::NothingSelected)
            }
            other => other.map(RunOutcome::Completed),
        }
    }

    async fn run_selected(&self, doc: &DocumentKey, mode: RunMode) -> AppResult<RunSummary> {
        let text = self
            .host
            .document_text(doc)
            .ok_or(CoreError::NoActiveSelection)?;
        let cursor = self
            .host
            .cursor_line(doc)
            .ok_or(CoreError::NoActiveSelection)?;

        let blocks = extract_block_ranges(&text);
        let selected = select_ranges(&blocks, cursor, mode);
        if selected.is_empty() {
            return Err(CoreError::NoActiveSelection.into());
        }
        for handler in &self.ranges_ready {
            handler(doc, &selected);
        }

        let settings = AnalyzerSettings::from_host(self.host.as_ref());
        let client = self.client_for(&settings)?;
        let report = if settings.report {
            let writer = ReportWriter::for_document(&doc.to_path());
            match writer.reset() {
                Ok(()) => Some(writer),
                Err(e) => {
                    warn!("Report disabled for this run: {}", e);
                    None
                }
            }
        } else {
            None
        };

        info!(
            "Analyzing {} of {} block(s) in {} ({})",
            selected.len(),
            blocks.len(),
            doc,
            mode
        );

        let mut summary = RunSummary {
            ranges: selected.len(),
            ..Default::default()
        };
        for (index, range) in selected.iter().enumerate() {
            let position = index + 1;
            let outcome = self
                .analyze_range(
                    &client,
                    doc,
                    &text,
                    range,
                    (position, selected.len()),
                    mode,
                    &settings,
                    report.as_ref(),
                )
                .await;
            match outcome {
                Ok(RangeOutcome::Skipped { cleared }) => {
                    info!(
                        "Block {} already analyzed, cleared {} finding(s) without a new request",
                        range, cleared
                    );
                    summary.skipped += 1;
                }
                Ok(RangeOutcome::Analyzed { findings }) => {
                    summary.analyzed += 1;
                    summary.findings += findings;
                }
                Err(e) => {
                    error!("Analysis of block {} failed: {}", range, e);
                    summary.failed += 1;
                    self.host.notify_error(SERVICE_UNAVAILABLE_MESSAGE);
                }
            }
        }

        info!(
            "Run finished: {} analyzed, {} skipped, {} failed, {} finding(s)",
            summary.analyzed, summary.skipped, summary.failed, summary.findings
        );
        Ok(summary)
    }

    #[allow(clippy::too_many_arguments)]
    async fn analyze_range(
        &self,
        client: &ModelClient,
        doc: &DocumentKey,
        text: &str,
        range: &LineRange,
        (position, total): (usize, usize),
        mode: RunMode,
        settings: &AnalyzerSettings,
        report: Option<&ReportWriter>,
    ) -> AppResult<RangeOutcome> {
        let cleared = self
            .caches
            .write()
            .await
            .entry(doc)
            .invalidate(range, self.host.as_ref());
        if cleared > 0 {
            return Ok(RangeOutcome::Skipped { cleared });
        }

        self.host.notify_progress(
            &progress_message(mode, position, total),
            settings.progress_duration_ms,
        );

        let code = numbered_range_text(text, range);
        let answer = request_findings(client, &code, settings.multishot).await?;
        let findings = parse_findings(&answer)?;
        debug!("Block {} produced {} finding(s)", range, findings.len());

        let mut stored = 0;
        for mut finding in findings {
            // Anything outside the block could never be invalidated again
            if !range.contains_finding_line(finding.line) {
                warn!(
                    "Dropping finding on line {} outside block {}: {}",
                    finding.line, range, finding.short_description
                );
                continue;
            }

            let rationale = if settings.verification_enabled() {
                match verify_finding(client, &code, &mut finding).await {
                    Ok(verification) => Some(verification.rationale),
                    Err(e) => {
                        warn!(
                            "Verification of line {} failed, verdict {}: {}",
                            finding.line,
                            Verdict::Undetermined,
                            e
                        );
                        Some(format!("Verification failed: {}", e))
                    }
                }
            } else {
                None
            };

            let line = (finding.line - 1) as usize;
            let target = LineRange::new(line, line);
            let handle = self.host.render_finding(doc, target, &finding);
            self.caches
                .write()
                .await
                .entry(doc)
                .store(CacheEntry::new(target, finding.clone(), handle));
            stored += 1;

            if let (Some(writer), Some(rationale)) = (report, rationale.as_deref()) {
                writer.append(&finding, rationale)?;
            }
        }

        Ok(RangeOutcome::Analyzed { findings: stored })
    }

    fn client_for(&self, settings: &AnalyzerSettings) -> AppResult<ModelClient> {
        match &self.client {
            ClientSource::Fixed(client) => Ok(client.clone()),
            ClientSource::Settings => {
                settings.validate().map_err(AppError::config)?;
                Ok(ModelClient::from_config(&settings.to_provider_config())?)
            }
        }
    }

    /// Snapshot of the cached findings of `doc`, in insertion order
    pub async fn restore(&self, doc: &DocumentKey) -> Vec<CacheEntry> {
        self.caches
            .read()
            .await
            .get(doc)
            .map(|cache| cache.restore().to_vec())
            .unwrap_or_default()
    }

    /// Hand every cached finding of `doc` back to the host for display
    pub async fn document_focus_changed(&self, doc: &DocumentKey) -> usize {
        let entries = self.restore(doc).await;
        for entry in &entries {
            self.host.redisplay(doc, entry);
        }
        debug!("Restored {} finding(s) for {}", entries.len(), doc);
        entries.len()
    }

    /// Forget a closed document
    pub async fn document_closed(&self, doc: &DocumentKey) -> usize {
        self.caches.write().await.remove(doc, self.host.as_ref())
    }
}

/// Ask the model for the JSON answer, in one or two calls
async fn request_findings(client: &ModelClient, code: &str, multishot: bool) -> CoreResult<String> {
    let prompt = if multishot {
        let listing_prompt = multi_shot_prompt(code);
        let listing = client.send(&listing_prompt, "").await?;
        reformat_prompt(&strip_echo(&listing, &listing_prompt))
    } else {
        single_shot_prompt(code)
    };

    let reply = client.send(&prompt, JSON_BEGIN).await?;
    Ok(strip_echo(&reply, &prompt))
}
