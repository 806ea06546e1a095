//! Analysis Orchestrator Integration Tests
//!
//! Full runs over a recording host with scripted model answers.

use std::sync::{Arc, Mutex};

use serde_json::json;
use tokio::sync::Notify;

use autokaker::services::analysis::prompts::JSON_BEGIN;
use autokaker::{
    AnalysisOrchestrator, EditorHost, LineRange, ModelBackend, ModelClient, OrchestratorState,
    RunMode, RunOutcome, RunSummary, SERVICE_UNAVAILABLE_MESSAGE,
};
use autokaker_llm::LlmError;

use crate::support::{one_finding, text, RecordingHost, Reply, ScriptedBackend};

const ONE_FUNCTION: &str = "void f() {\n  x=1;\n}\n";

/// Two functions: blocks {0,2} and {3,6}
const TWO_FUNCTIONS: &str = "int a() {\n  return 1;\n}\n\nint b() {\n  return 2;\n}\n";

fn orchestrator(host: &Arc<RecordingHost>, backend: &Arc<ScriptedBackend>) -> AnalysisOrchestrator {
    let editor: Arc<dyn EditorHost> = host.clone();
    let model: Arc<dyn ModelBackend> = backend.clone();
    AnalysisOrchestrator::new(editor, ModelClient::single(model))
}

// ============================================================================
// Single block
// ============================================================================

#[tokio::test]
async fn test_current_block_is_analyzed_and_rendered() {
    let host = RecordingHost::new("f.c", ONE_FUNCTION, 1);
    let backend = ScriptedBackend::new(vec![text(
        "noise {\"vulnerabilities\":[{\"line\":2,\"shortdescription\":\"leak\",\"impact\":5}]} trailing",
    )]);
    let orchestrator = orchestrator(&host, &backend);

    let outcome = orchestrator
        .run(&host.document, RunMode::AnalyzeCurrentBlock)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Completed(RunSummary {
            ranges: 1,
            analyzed: 1,
            skipped: 0,
            failed: 0,
            findings: 1,
        })
    );

    let rendered = host.rendered.lock().unwrap().clone();
    assert_eq!(rendered.len(), 1);
    assert_eq!(rendered[0].1, LineRange::new(1, 1));
    assert_eq!(rendered[0].2.line, 2);
    assert_eq!(rendered[0].2.short_description, "leak");
    assert_eq!(rendered[0].2.impact, 5.0);

    assert_eq!(
        host.progress.lock().unwrap().clone(),
        vec![("AUTOK: Analyzing current function...".to_string(), 5000)]
    );

    let prompts = backend.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("1 void f() {\n2   x=1;\n3 }"));
    assert_eq!(backend.prefixes(), vec![JSON_BEGIN.to_string()]);

    assert_eq!(orchestrator.restore(&host.document).await.len(), 1);
    assert_eq!(orchestrator.state(), OrchestratorState::Idle);
}

#[tokio::test]
async fn test_reselecting_analyzed_block_clears_without_model_call() {
    let host = RecordingHost::new("f.c", ONE_FUNCTION, 1);
    let backend = ScriptedBackend::new(vec![text(&one_finding(2, "leak", 5))]);
    let orchestrator = orchestrator(&host, &backend);

    orchestrator
        .run(&host.document, RunMode::AnalyzeCurrentBlock)
        .await
        .unwrap();
    assert_eq!(backend.call_count(), 1);

    let outcome = orchestrator
        .run(&host.document, RunMode::AnalyzeCurrentBlock)
        .await
        .unwrap();

    match outcome {
        RunOutcome::Completed(summary) => {
            assert_eq!(summary.skipped, 1);
            assert_eq!(summary.analyzed, 0);
            assert_eq!(summary.findings, 0);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(backend.call_count(), 1);
    assert!(host.visible().is_empty());
    assert_eq!(host.unrendered.lock().unwrap().len(), 1);
    assert!(orchestrator.restore(&host.document).await.is_empty());
    assert!(host.errors().is_empty());
    assert_eq!(host.progress_messages().len(), 1);
}

#[tokio::test]
async fn test_cursor_outside_blocks_does_nothing() {
    let host = RecordingHost::new("f.c", "void f() {\n}\n\n\n\n\nint x;\n", 6);
    let backend = ScriptedBackend::new(vec![]);
    let orchestrator = orchestrator(&host, &backend);

    let outcome = orchestrator
        .run(&host.document, RunMode::AnalyzeAllBlocks)
        .await
        .unwrap();

    assert_eq!(outcome, RunOutcome::NothingSelected);
    assert_eq!(backend.call_count(), 0);
    assert!(host.errors().is_empty());
    assert!(!orchestrator.is_running());
}

#[tokio::test]
async fn test_idle_mode_and_unknown_document_do_nothing() {
    let host = RecordingHost::new("f.c", ONE_FUNCTION, 1);
    let backend = ScriptedBackend::new(vec![]);
    let orchestrator = orchestrator(&host, &backend);

    assert_eq!(
        orchestrator.run(&host.document, RunMode::Idle).await.unwrap(),
        RunOutcome::NothingSelected
    );
    assert_eq!(
        orchestrator
            .run(&autokaker::DocumentKey::new("other.c"), RunMode::AnalyzeCurrentBlock)
            .await
            .unwrap(),
        RunOutcome::NothingSelected
    );

    *host.cursor.lock().unwrap() = None;
    assert_eq!(
        orchestrator
            .run(&host.document, RunMode::AnalyzeCurrentBlock)
            .await
            .unwrap(),
        RunOutcome::NothingSelected
    );
    assert_eq!(backend.call_count(), 0);
}

// ============================================================================
// Verification
// ============================================================================

#[tokio::test]
async fn test_unlikely_verdict_downgrades_but_still_renders() {
    let host = RecordingHost::new("f.c", ONE_FUNCTION, 1);
    host.set_config("verify", json!(true));
    let backend = ScriptedBackend::new(vec![
        text(&one_finding(2, "leak", 5)),
        text("x is an int, nothing is allocated. UNLIKELY"),
    ]);
    let orchestrator = orchestrator(&host, &backend);

    orchestrator
        .run(&host.document, RunMode::AnalyzeCurrentBlock)
        .await
        .unwrap();

    let visible = host.visible();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].short_description, "(UNLIKELY) leak");
    assert!(visible[0].is_downgraded());

    let cached = orchestrator.restore(&host.document).await;
    assert_eq!(cached[0].finding.short_description, "(UNLIKELY) leak");

    let prompts = backend.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains("The vulnerability is this: \n'leak"));
    assert!(prompts[1].contains("Line number: 2"));
    assert_eq!(backend.prefixes()[1], "");
}

#[tokio::test]
async fn test_likely_verdict_keeps_description() {
    let host = RecordingHost::new("f.c", ONE_FUNCTION, 1);
    host.set_config("verify", json!(true));
    let backend = ScriptedBackend::new(vec![
        text(&one_finding(2, "leak", 5)),
        text("Confirmed. LIKELY"),
    ]);
    let orchestrator = orchestrator(&host, &backend);

    orchestrator
        .run(&host.document, RunMode::AnalyzeCurrentBlock)
        .await
        .unwrap();

    assert_eq!(host.visible()[0].short_description, "leak");
}

#[tokio::test]
async fn test_failed_verification_keeps_every_finding() {
    let host = RecordingHost::new("f.c", ONE_FUNCTION, 1);
    host.set_config("verify", json!(true));
    let backend = ScriptedBackend::new(vec![
        text(
            r#"{"vulnerabilities":[{"line":2,"shortdescription":"a","impact":4},{"line":3,"shortdescription":"b","impact":6}]}"#,
        ),
        text("Confirmed. LIKELY"),
        Reply::Fail(LlmError::ServerError {
            message: "overloaded".to_string(),
            status: Some(503),
        }),
    ]);
    let orchestrator = orchestrator(&host, &backend);

    let outcome = orchestrator
        .run(&host.document, RunMode::AnalyzeCurrentBlock)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Completed(RunSummary {
            ranges: 1,
            analyzed: 1,
            skipped: 0,
            failed: 0,
            findings: 2,
        })
    );
    let descriptions: Vec<String> = host
        .visible()
        .into_iter()
        .map(|f| f.short_description)
        .collect();
    assert_eq!(descriptions, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(orchestrator.restore(&host.document).await.len(), 2);
    assert!(host.errors().is_empty());

    // Both findings belong to the block, so re-selecting it clears them
    orchestrator
        .run(&host.document, RunMode::AnalyzeCurrentBlock)
        .await
        .unwrap();
    assert_eq!(backend.call_count(), 3);
    assert!(host.visible().is_empty());
}

#[tokio::test]
async fn test_verification_disabled_by_default() {
    let host = RecordingHost::new("f.c", ONE_FUNCTION, 1);
    let backend = ScriptedBackend::new(vec![text(&one_finding(2, "leak", 5))]);
    let orchestrator = orchestrator(&host, &backend);

    orchestrator
        .run(&host.document, RunMode::AnalyzeCurrentBlock)
        .await
        .unwrap();

    assert_eq!(backend.call_count(), 1);
}

// ============================================================================
// Output construction
// ============================================================================

#[tokio::test]
async fn test_multishot_chains_two_calls() {
    let host = RecordingHost::new("f.c", ONE_FUNCTION, 1);
    host.set_config("multishot", json!(true));
    let backend = ScriptedBackend::new(vec![
        text("Line 2: x is never declared, impact 3"),
        text(&one_finding(2, "undeclared x", 3)),
    ]);
    let orchestrator = orchestrator(&host, &backend);

    orchestrator
        .run(&host.document, RunMode::AnalyzeCurrentBlock)
        .await
        .unwrap();

    let prompts = backend.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].starts_with("You are an expert bug hunter assistant."));
    assert!(prompts[1].contains("Line 2: x is never declared, impact 3"));
    assert_eq!(
        backend.prefixes(),
        vec![String::new(), JSON_BEGIN.to_string()]
    );
    assert_eq!(host.visible()[0].short_description, "undeclared x");
}

#[tokio::test]
async fn test_echoed_prompt_is_stripped() {
    let host = RecordingHost::new("f.c", ONE_FUNCTION, 1);
    // The echoed prompt carries the non-JSON example first; the parser must
    // only see what follows it.
    let backend = ScriptedBackend::new(vec![Reply::Echo(
        "2,\"shortdescription\":\"leak\",\"impact\":5}]}".to_string(),
    )]);
    let orchestrator = orchestrator(&host, &backend);

    orchestrator
        .run(&host.document, RunMode::AnalyzeCurrentBlock)
        .await
        .unwrap();

    assert!(host.errors().is_empty());
    let visible = host.visible();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].line, 2);
}

// ============================================================================
// Multiple blocks and failures
// ============================================================================

#[tokio::test]
async fn test_all_blocks_in_cursor_first_order() {
    let host = RecordingHost::new("ab.c", TWO_FUNCTIONS, 5);
    let backend = ScriptedBackend::new(vec![
        text(&one_finding(6, "in b", 4)),
        text(&one_finding(2, "in a", 7)),
    ]);
    let seen: Arc<Mutex<Vec<LineRange>>> = Arc::new(Mutex::new(Vec::new()));

    let editor: Arc<dyn EditorHost> = host.clone();
    let model: Arc<dyn ModelBackend> = backend.clone();
    let mut orchestrator = AnalysisOrchestrator::new(editor, ModelClient::single(model));
    let sink = seen.clone();
    orchestrator.on_ranges_ready(move |_doc, ranges| {
        sink.lock().unwrap().extend_from_slice(ranges);
    });

    orchestrator
        .run(&host.document, RunMode::AnalyzeAllBlocks)
        .await
        .unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![LineRange::new(3, 6), LineRange::new(0, 2)]
    );
    assert_eq!(
        host.progress_messages(),
        vec![
            "AUTOK: Analyzing function 1 of 2...".to_string(),
            "AUTOK: Analyzing function 2 of 2...".to_string(),
        ]
    );
    let lines: Vec<u32> = host.visible().iter().map(|f| f.line).collect();
    assert_eq!(lines, vec![6, 2]);
}

#[tokio::test]
async fn test_finding_outside_block_is_dropped() {
    let host = RecordingHost::new("f.c", ONE_FUNCTION, 1);
    let backend = ScriptedBackend::new(vec![
        text(
            r#"{"vulnerabilities":[{"line":40,"shortdescription":"far away","impact":5},{"line":2,"shortdescription":"leak","impact":5}]}"#,
        ),
        text(&one_finding(40, "far away", 5)),
    ]);
    let orchestrator = orchestrator(&host, &backend);

    let outcome = orchestrator
        .run(&host.document, RunMode::AnalyzeCurrentBlock)
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        RunOutcome::Completed(RunSummary { findings: 1, .. })
    ));
    assert_eq!(host.visible()[0].short_description, "leak");

    // Clears "leak" without a model call
    orchestrator
        .run(&host.document, RunMode::AnalyzeCurrentBlock)
        .await
        .unwrap();
    assert_eq!(backend.call_count(), 1);

    // Nothing cached now, so the model is asked again; line 40 never sticks
    orchestrator
        .run(&host.document, RunMode::AnalyzeCurrentBlock)
        .await
        .unwrap();
    assert_eq!(backend.call_count(), 2);
    assert!(host.visible().is_empty());
    assert!(orchestrator.restore(&host.document).await.is_empty());
    assert_eq!(host.rendered.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_malformed_response_does_not_stop_the_run() {
    let host = RecordingHost::new("ab.c", TWO_FUNCTIONS, 0);
    let backend = ScriptedBackend::new(vec![
        text("I could not find anything worth reporting."),
        text(&one_finding(6, "in b", 4)),
    ]);
    let orchestrator = orchestrator(&host, &backend);

    let outcome = orchestrator
        .run(&host.document, RunMode::AnalyzeAllBlocks)
        .await
        .unwrap();

    match outcome {
        RunOutcome::Completed(summary) => {
            assert_eq!(summary.failed, 1);
            assert_eq!(summary.analyzed, 1);
            assert_eq!(summary.findings, 1);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(host.errors(), vec![SERVICE_UNAVAILABLE_MESSAGE.to_string()]);
    assert_eq!(host.visible()[0].short_description, "in b");
}

#[tokio::test]
async fn test_backend_failure_is_reported_once_per_block() {
    let host = RecordingHost::new("ab.c", TWO_FUNCTIONS, 0);
    let down = || {
        Reply::Fail(LlmError::ServerError {
            message: "overloaded".to_string(),
            status: Some(503),
        })
    };
    let backend = ScriptedBackend::new(vec![down(), down()]);
    let orchestrator = orchestrator(&host, &backend);

    let outcome = orchestrator
        .run(&host.document, RunMode::AnalyzeAllBlocks)
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::Completed(RunSummary { failed: 2, .. })));
    assert_eq!(host.errors().len(), 2);
    assert_eq!(orchestrator.state(), OrchestratorState::Idle);

    // Nothing was cached, so the next run asks the model again
    let backend_calls = backend.call_count();
    orchestrator
        .run(&host.document, RunMode::AnalyzeCurrentBlock)
        .await
        .unwrap();
    assert_eq!(backend.call_count(), backend_calls + 1);
}

// ============================================================================
// Concurrency and focus
// ============================================================================

#[tokio::test]
async fn test_concurrent_invocation_is_dropped() {
    let host = RecordingHost::new("f.c", ONE_FUNCTION, 1);
    let gate = Arc::new(Notify::new());
    let backend = ScriptedBackend::gated(vec![text(&one_finding(2, "leak", 5))], gate.clone());
    let orchestrator = orchestrator(&host, &backend);

    let first = orchestrator.run(&host.document, RunMode::AnalyzeCurrentBlock);
    let second = async {
        while backend.call_count() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(orchestrator.is_running());
        let outcome = orchestrator
            .run(&host.document, RunMode::AnalyzeAllBlocks)
            .await;
        gate.notify_one();
        outcome
    };

    let (first, second) = tokio::join!(first, second);

    assert_eq!(second.unwrap(), RunOutcome::Busy);
    assert!(matches!(
        first.unwrap(),
        RunOutcome::Completed(RunSummary { findings: 1, .. })
    ));
    assert_eq!(backend.call_count(), 1);
    assert!(!orchestrator.is_running());
}

#[tokio::test]
async fn test_focus_change_redisplays_cached_findings() {
    let host = RecordingHost::new("ab.c", TWO_FUNCTIONS, 0);
    let backend = ScriptedBackend::new(vec![
        text(
            r#"{"vulnerabilities":[{"line":2,"shortdescription":"first","impact":2},{"line":2,"shortdescription":"second","impact":9}]}"#,
        ),
    ]);
    let orchestrator = orchestrator(&host, &backend);

    orchestrator
        .run(&host.document, RunMode::AnalyzeCurrentBlock)
        .await
        .unwrap();

    assert_eq!(orchestrator.document_focus_changed(&host.document).await, 2);
    let redisplayed = host.redisplayed.lock().unwrap().clone();
    let descriptions: Vec<&str> = redisplayed
        .iter()
        .map(|e| e.finding.short_description.as_str())
        .collect();
    assert_eq!(descriptions, vec!["first", "second"]);

    assert_eq!(orchestrator.document_closed(&host.document).await, 2);
    assert!(host.visible().is_empty());
    assert_eq!(orchestrator.document_focus_changed(&host.document).await, 0);
}
