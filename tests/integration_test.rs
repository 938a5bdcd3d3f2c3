//! End-to-end tests driving the engine with a scripted mock client

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use docsum::checkpoint::CheckpointStore;
use docsum::config::RunConfig;
use docsum::context::{ContextConfig, ContextManager};
use docsum::llm::mock::{MockLlmClient, MockTurn};
use docsum::llm::{CompletionResponse, LlmError, TokenUsage, ToolCallRequest};
use docsum::prompts;
use docsum::tools::ToolRegistry;
use docsum::{RunOutcome, SummarizeEngine};

fn text_response(text: &str) -> CompletionResponse {
    CompletionResponse {
        content: Some(text.to_string()),
        tool_calls: vec![],
        usage: TokenUsage::default(),
    }
}

fn tool_call(id: &str, name: &str, args: serde_json::Value) -> ToolCallRequest {
    ToolCallRequest {
        id: id.to_string(),
        name: name.to_string(),
        arguments: args,
    }
}

fn tool_response(calls: Vec<ToolCallRequest>) -> CompletionResponse {
    CompletionResponse {
        content: None,
        tool_calls: calls,
        usage: TokenUsage::default(),
    }
}

struct Harness {
    dir: TempDir,
    doc: PathBuf,
    output: PathBuf,
}

impl Harness {
    async fn with_doc(lines: usize) -> Self {
        let dir = TempDir::new().unwrap();
        let doc = dir.path().join("report.txt");
        let body: String = (1..=lines)
            .map(|i| format!("Finding {i}: measurement value {}\n", i * 10))
            .collect();
        tokio::fs::write(&doc, body).await.unwrap();
        let output = dir.path().join("summary.md");
        Self { dir, doc, output }
    }

    fn engine(&self, llm: Arc<MockLlmClient>, run_config: RunConfig) -> SummarizeEngine {
        SummarizeEngine::new(
            llm,
            ToolRegistry::standard().unwrap(),
            ContextManager::new(ContextConfig::default()),
            CheckpointStore::new(self.dir.path().join("checkpoints")).unwrap(),
            run_config,
            prompts::SUMMARY_TEMPLATE.to_string(),
            4096,
        )
    }

    fn store(&self) -> CheckpointStore {
        CheckpointStore::new(self.dir.path().join("checkpoints")).unwrap()
    }

    fn run_config(max_iterations: u32) -> RunConfig {
        RunConfig {
            max_iterations,
            chunk_size: 3,
            checkpoint_interval: 2,
            stall_threshold: 3,
        }
    }
}

#[tokio::test]
async fn full_run_reads_fills_and_completes() {
    let harness = Harness::with_doc(6).await;

    let llm = Arc::new(MockLlmClient::respond_with(vec![
        tool_response(vec![tool_call("c1", "get_document_info", serde_json::json!({}))]),
        tool_response(vec![tool_call(
            "c2",
            "read_lines",
            serde_json::json!({"start_line": 1, "end_line": 3}),
        )]),
        tool_response(vec![
            tool_call(
                "c3",
                "read_lines",
                serde_json::json!({"start_line": 4, "end_line": 6}),
            ),
            tool_call(
                "c4",
                "fill_section",
                serde_json::json!({
                    "section": "EXECUTIVE_SUMMARY",
                    "content": "Six findings with rising measurement values."
                }),
            ),
        ]),
        text_response("The document has been fully read and summarized."),
    ]));

    let mut engine = harness.engine(llm.clone(), Harness::run_config(20));
    let report = engine.run(&harness.doc, &harness.output).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Complete);
    assert_eq!(report.units_done, 6);
    assert_eq!(report.total_units, 6);
    assert_eq!(llm.call_count(), 4);

    // The filled section is in the file; the others still hold placeholders
    let summary = tokio::fs::read_to_string(&harness.output).await.unwrap();
    assert!(summary.contains("Six findings with rising measurement values."));
    assert!(!summary.contains("{{EXECUTIVE_SUMMARY}}"));
    assert!(summary.contains("{{KEY_FINDINGS}}"));
    assert_eq!(report.unresolved_placeholders.len(), 24);

    // Metadata was stamped at template write time
    assert!(summary.contains("**Total Lines:** 6"));
    assert!(!summary.contains("{{TOTAL_LINES}}"));

    // Verified success removes the checkpoint
    assert!(
        harness
            .store()
            .load(&harness.doc.canonicalize().unwrap())
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn tool_results_echo_call_ids_in_order() {
    let harness = Harness::with_doc(2).await;

    let llm = Arc::new(MockLlmClient::respond_with(vec![
        tool_response(vec![
            tool_call("first", "get_document_info", serde_json::json!({})),
            tool_call("second", "read_lines", serde_json::json!({"start_line": 1, "end_line": 2})),
        ]),
        text_response("done"),
    ]));

    let mut engine = harness.engine(llm.clone(), Harness::run_config(10));
    engine.run(&harness.doc, &harness.output).await.unwrap();

    let second_request = &llm.recorded_requests()[1];
    let answered: Vec<&str> = second_request
        .messages
        .iter()
        .filter_map(|m| m.answered_call_id())
        .collect();
    assert_eq!(answered, vec!["first", "second"]);
}

#[tokio::test]
async fn exhausted_run_resumes_from_checkpoint() {
    let harness = Harness::with_doc(6).await;

    // First run: reads half the document, then runs out of iterations
    let llm = Arc::new(MockLlmClient::respond_with(vec![
        tool_response(vec![tool_call(
            "c1",
            "read_lines",
            serde_json::json!({"start_line": 1, "end_line": 3}),
        )]),
        tool_response(vec![tool_call("c2", "get_progress", serde_json::json!({}))]),
    ]));
    let mut engine = harness.engine(llm, Harness::run_config(2));
    let report = engine.run(&harness.doc, &harness.output).await.unwrap();
    assert_eq!(report.outcome, RunOutcome::IterationsExhausted);
    assert_eq!(report.units_done, 3);

    let canonical = harness.doc.canonicalize().unwrap();
    let checkpoint = harness.store().load(&canonical).unwrap().unwrap();
    assert_eq!(checkpoint.progress.done_units(), 3);

    // Second run: resumes and finishes the document
    let llm = Arc::new(MockLlmClient::respond_with(vec![
        tool_response(vec![tool_call(
            "r1",
            "read_lines",
            serde_json::json!({"start_line": 4, "end_line": 6}),
        )]),
        text_response("done"),
    ]));
    let mut engine = harness.engine(llm.clone(), Harness::run_config(20));
    let report = engine.resume(&harness.doc).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Complete);
    assert_eq!(report.units_done, 6);

    // The resumed conversation was seeded with a recovery message, not the
    // old conversation
    let first_request = &llm.recorded_requests()[0];
    assert_eq!(first_request.messages.len(), 3);
    let recovery = first_request.messages.iter().any(|m| {
        matches!(m, docsum::llm::ChatMessage::User { content }
            if content.contains("Resuming an interrupted run")
                && content.contains("Next unread chunk: lines 4-6"))
    });
    assert!(recovery);

    // Completion clears the checkpoint
    assert!(harness.store().load(&canonical).unwrap().is_none());
}

#[tokio::test]
async fn resume_restores_missing_summary_from_snapshot() {
    let harness = Harness::with_doc(4).await;

    let llm = Arc::new(MockLlmClient::respond_with(vec![
        tool_response(vec![tool_call(
            "c1",
            "read_lines",
            serde_json::json!({"start_line": 1, "end_line": 4}),
        )]),
        tool_response(vec![tool_call("c2", "get_progress", serde_json::json!({}))]),
    ]));
    let mut engine = harness.engine(llm, Harness::run_config(2));
    engine.run(&harness.doc, &harness.output).await.unwrap();

    // Summary file lost between runs
    tokio::fs::remove_file(&harness.output).await.unwrap();

    let llm = Arc::new(MockLlmClient::respond_with(vec![text_response("done")]));
    let mut engine = harness.engine(llm, Harness::run_config(20));
    let report = engine.resume(&harness.doc).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Complete);
    let summary = tokio::fs::read_to_string(&harness.output).await.unwrap();
    assert!(summary.contains("**Total Lines:** 4"));
}

#[tokio::test]
async fn context_overflow_shrinks_budget_and_retries() {
    let harness = Harness::with_doc(2).await;

    let llm = Arc::new(MockLlmClient::new(vec![
        MockTurn::Respond(tool_response(vec![tool_call(
            "c1",
            "read_lines",
            serde_json::json!({"start_line": 1, "end_line": 2}),
        )])),
        // Service rejects the next request as too large
        MockTurn::Fail(LlmError::ApiError {
            status: 400,
            message: "This model's maximum context length is exceeded".to_string(),
        }),
        // Retry after the budget shrink succeeds
        MockTurn::Respond(text_response("done")),
    ]));

    let mut engine = harness.engine(llm.clone(), Harness::run_config(10));
    let report = engine.run(&harness.doc, &harness.output).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Complete);
    assert_eq!(llm.call_count(), 3);
}

#[tokio::test]
async fn non_overflow_error_checkpoints_and_fails() {
    let harness = Harness::with_doc(4).await;

    let llm = Arc::new(MockLlmClient::new(vec![
        MockTurn::Respond(tool_response(vec![tool_call(
            "c1",
            "read_lines",
            serde_json::json!({"start_line": 1, "end_line": 2}),
        )])),
        MockTurn::Fail(LlmError::ApiError {
            status: 401,
            message: "invalid api key".to_string(),
        }),
    ]));

    let mut engine = harness.engine(llm, Harness::run_config(10));
    let err = engine.run(&harness.doc, &harness.output).await.unwrap_err();
    assert!(err.to_string().contains("checkpointed"));

    // The partial progress survived the failure
    let checkpoint = harness
        .store()
        .load(&harness.doc.canonicalize().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(checkpoint.progress.done_units(), 2);
}

#[tokio::test]
async fn stalled_run_gets_a_reading_directive() {
    let harness = Harness::with_doc(9).await;

    // One real read, then idle get_progress turns until the nudge appears
    let mut turns = vec![tool_response(vec![tool_call(
        "c0",
        "read_lines",
        serde_json::json!({"start_line": 1, "end_line": 3}),
    )])];
    for i in 1..=4 {
        turns.push(tool_response(vec![tool_call(
            &format!("c{i}"),
            "get_progress",
            serde_json::json!({}),
        )]));
    }
    let llm = Arc::new(MockLlmClient::respond_with(turns));

    let mut engine = harness.engine(llm.clone(), Harness::run_config(5));
    let report = engine.run(&harness.doc, &harness.output).await.unwrap();
    assert_eq!(report.outcome, RunOutcome::IterationsExhausted);

    let last_request = llm.recorded_requests().into_iter().last().unwrap();
    let nudged = last_request.messages.iter().any(|m| {
        matches!(m, docsum::llm::ChatMessage::User { content }
            if content.contains("not made reading progress")
                && content.contains("lines 4-6"))
    });
    assert!(nudged);
}
