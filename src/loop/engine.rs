//! The summarization loop
//!
//! Drives the model through the read/fill cycle until the whole document has
//! been read, the model says it is done, or the iteration cap is hit. The
//! engine owns the conversation, the tracker, and the budget; the model only
//! sees tools and messages.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use eyre::{Result, WrapErr, bail, eyre};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::checkpoint::{Checkpoint, CheckpointStore, RunDescriptor};
use crate::config::RunConfig;
use crate::context::ContextManager;
use crate::llm::{ChatMessage, CompletionRequest, CompletionResponse, LlmClient, ToolDefinition};
use crate::progress::{Phase, ProgressTracker};
use crate::prompts;
use crate::tools::{ToolContext, ToolRegistry};

/// Budget multiplier applied when the service reports a context overflow
const OVERFLOW_SHRINK: f64 = 0.6;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Whole document read and the model signalled completion
    Complete,
    /// Iteration cap hit; a checkpoint was saved for resumption
    IterationsExhausted,
}

/// Final report of a run
#[derive(Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub iterations: u32,
    pub units_done: u64,
    pub total_units: u64,
    /// Where the summary was written
    pub output_path: std::path::PathBuf,
    /// Placeholders still present in the summary file
    pub unresolved_placeholders: Vec<String>,
}

/// Orchestrates one summarization run
pub struct SummarizeEngine {
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    context: ContextManager,
    checkpoints: CheckpointStore,
    run_config: RunConfig,
    template: String,
    /// Response token cap passed to the completion service
    max_tokens: u32,
}

impl SummarizeEngine {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: ToolRegistry,
        context: ContextManager,
        checkpoints: CheckpointStore,
        run_config: RunConfig,
        template: String,
        max_tokens: u32,
    ) -> Self {
        Self {
            llm,
            tools,
            context,
            checkpoints,
            run_config,
            template,
            max_tokens,
        }
    }

    /// Start a fresh run: write the template, seed the conversation, loop
    pub async fn run(&mut self, source_path: &Path, output_path: &Path) -> Result<RunReport> {
        let source_path = source_path
            .canonicalize()
            .wrap_err_with(|| format!("Cannot resolve source path {}", source_path.display()))?;
        let text = tokio::fs::read_to_string(&source_path)
            .await
            .wrap_err_with(|| format!("Cannot read source document {}", source_path.display()))?;
        let total_lines = text.lines().count() as u64;
        info!(source = %source_path.display(), total_lines, "run: starting fresh run");

        let descriptor = RunDescriptor {
            source_path: source_path.clone(),
            output_path: output_path.to_path_buf(),
            chunk_size: self.run_config.chunk_size,
        };

        // The engine writes the template itself: the model only ever fills
        // sections, it cannot produce a malformed scaffold
        let sections = prompts::section_names(&self.template);
        let rendered = prompts::render_template(
            &self.template,
            &source_path.display().to_string(),
            total_lines,
            Utc::now(),
        );
        tokio::fs::write(output_path, rendered)
            .await
            .wrap_err_with(|| format!("Cannot write summary file {}", output_path.display()))?;

        let mut tracker = ProgressTracker::new(total_lines);
        for section in &sections {
            tracker.register_section(section.clone());
        }
        tracker.set_phase(Phase::Template);

        let messages = vec![
            ChatMessage::system(prompts::SYSTEM_PROMPT),
            ChatMessage::user(prompts::task_prompt(
                &source_path.display().to_string(),
                &output_path.display().to_string(),
                self.run_config.chunk_size,
                &sections,
            )),
        ];

        self.run_loop(descriptor, tracker, 0, messages).await
    }

    /// Resume an interrupted run from its checkpoint
    ///
    /// The conversation is not persisted; the model re-orients itself from a
    /// recovery message plus the `get_progress` tool.
    pub async fn resume(&mut self, source_path: &Path) -> Result<RunReport> {
        let source_path = source_path
            .canonicalize()
            .wrap_err_with(|| format!("Cannot resolve source path {}", source_path.display()))?;
        let Some(checkpoint) = self.checkpoints.load(&source_path)? else {
            bail!("No checkpoint found for {}", source_path.display());
        };
        let descriptor = checkpoint.descriptor.clone();
        info!(
            source = %source_path.display(),
            iteration = checkpoint.iteration,
            percent = checkpoint.progress.percent_complete(),
            "resume: restoring from checkpoint"
        );

        if !descriptor.output_path.exists() {
            match &checkpoint.output {
                Some(snapshot) => {
                    info!(path = %descriptor.output_path.display(), "resume: restoring summary file from snapshot");
                    tokio::fs::write(&descriptor.output_path, snapshot)
                        .await
                        .wrap_err("Cannot restore summary file from checkpoint")?;
                }
                None => bail!(
                    "Summary file {} is missing and the checkpoint has no snapshot",
                    descriptor.output_path.display()
                ),
            }
        }

        let sections = prompts::section_names(&self.template);
        let messages = vec![
            ChatMessage::system(prompts::SYSTEM_PROMPT),
            ChatMessage::user(prompts::task_prompt(
                &descriptor.source_path.display().to_string(),
                &descriptor.output_path.display().to_string(),
                descriptor.chunk_size,
                &sections,
            )),
            ChatMessage::user(format!(
                "[Resuming an interrupted run.]\n\n{}\n\nCall get_progress to confirm the \
                 current state, then continue from the next unread chunk.",
                checkpoint.progress.recovery_summary(descriptor.chunk_size)
            )),
        ];

        self.run_loop(descriptor, checkpoint.progress, checkpoint.iteration, messages)
            .await
    }

    async fn run_loop(
        &mut self,
        descriptor: RunDescriptor,
        tracker: ProgressTracker,
        start_iteration: u32,
        mut messages: Vec<ChatMessage>,
    ) -> Result<RunReport> {
        let tracker = Arc::new(Mutex::new(tracker));
        let ctx = ToolContext::new(
            descriptor.source_path.clone(),
            descriptor.output_path.clone(),
            tracker.clone(),
            descriptor.chunk_size,
        );
        let definitions = self.tools.definitions();

        let mut iteration = start_iteration;
        let mut last_percent = -1.0f64;
        let mut stalled = 0u32;

        while iteration < self.run_config.max_iterations {
            iteration += 1;
            debug!(iteration, max = self.run_config.max_iterations, "run_loop: iteration start");

            // Stall detection: reading stuck at the same percentage for too
            // many turns gets an explicit nudge toward the next gap
            {
                let t = tracker.lock().await;
                let percent = t.percent_complete();
                if !t.is_complete() && percent > 0.0 && percent == last_percent {
                    stalled += 1;
                } else {
                    stalled = 0;
                }
                if stalled >= self.run_config.stall_threshold {
                    if let Some((start, end)) = t.next_chunk(descriptor.chunk_size) {
                        warn!(percent, start, end, "run_loop: no reading progress, injecting directive");
                        messages.push(ChatMessage::user(format!(
                            "You have not made reading progress for several turns. Read lines \
                             {start}-{end} next using read_lines."
                        )));
                    }
                    stalled = 0;
                }
                last_percent = percent;
            }

            if self.run_config.checkpoint_interval > 0
                && iteration % self.run_config.checkpoint_interval == 0
            {
                self.save_checkpoint(&descriptor, &tracker, iteration).await;
            }

            {
                let t = tracker.lock().await;
                self.context.truncate_if_needed(&mut messages, &t, descriptor.chunk_size);
            }

            let response = match self
                .complete_handling_overflow(&mut messages, &tracker, &descriptor, &definitions, iteration)
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    // Nothing is lost on failure: the checkpoint carries the
                    // progress up to this iteration
                    self.save_checkpoint(&descriptor, &tracker, iteration).await;
                    return Err(e.wrap_err("Completion request failed; run checkpointed"));
                }
            };

            debug!(
                prompt_tokens = response.usage.prompt_tokens,
                completion_tokens = response.usage.completion_tokens,
                tool_calls = response.tool_calls.len(),
                "run_loop: completion received"
            );
            let calls = response.tool_calls.clone();
            messages.push(response.into_message());

            if calls.is_empty() {
                // Completion gate: the model claiming it is done does not
                // make it so
                let (complete, percent, next) = {
                    let t = tracker.lock().await;
                    (t.is_complete(), t.percent_complete(), t.next_chunk(descriptor.chunk_size))
                };

                if complete {
                    return self.finish(&descriptor, &tracker, iteration).await;
                }

                let (start, end) = next.unwrap_or((1, descriptor.chunk_size));
                info!(percent, "run_loop: premature completion claim rejected");
                messages.push(ChatMessage::user(format!(
                    "The summary is not complete: only {percent:.1}% of the document has been \
                     read. Lines {start}-{end} are still unread. Continue reading with \
                     read_lines; do not stop until every line has been read."
                )));
                continue;
            }

            let results = self.tools.dispatch_all(&calls, &ctx).await;
            for (call_id, result) in results {
                debug!(%call_id, is_error = result.is_error, "run_loop: tool result");
                messages.push(ChatMessage::tool_result(call_id, result.content));
            }
        }

        warn!(iteration, "run_loop: maximum iterations reached, run checkpointed");
        self.save_checkpoint(&descriptor, &tracker, iteration).await;

        let unresolved = self
            .scan_placeholders(&descriptor.output_path)
            .await
            .unwrap_or_default();
        let t = tracker.lock().await;
        Ok(RunReport {
            outcome: RunOutcome::IterationsExhausted,
            iterations: iteration,
            units_done: t.done_units(),
            total_units: t.total_units(),
            output_path: descriptor.output_path.clone(),
            unresolved_placeholders: unresolved,
        })
    }

    /// One completion call, with a single budget-shrink retry on overflow
    ///
    /// The estimate can undershoot the service's real tokenizer; when the
    /// service rejects the request as too large, the budget is cut and the
    /// conversation re-truncated once before giving up.
    async fn complete_handling_overflow(
        &mut self,
        messages: &mut Vec<ChatMessage>,
        tracker: &Arc<Mutex<ProgressTracker>>,
        descriptor: &RunDescriptor,
        definitions: &[ToolDefinition],
        iteration: u32,
    ) -> Result<CompletionResponse> {
        let request = CompletionRequest {
            messages: messages.clone(),
            tools: definitions.to_vec(),
            max_tokens: self.max_tokens,
        };

        match self.llm.complete(request).await {
            Ok(response) => Ok(response),
            Err(e) if e.is_context_overflow() => {
                let shrunk = ((self.context.budget() as f64) * OVERFLOW_SHRINK) as usize;
                warn!(
                    old_budget = self.context.budget(),
                    new_budget = shrunk,
                    "complete_handling_overflow: service rejected context, shrinking budget"
                );
                self.context.set_budget(shrunk.max(1));
                {
                    let t = tracker.lock().await;
                    self.context.truncate_if_needed(messages, &t, descriptor.chunk_size);
                }
                self.save_checkpoint(descriptor, tracker, iteration).await;

                let retry = CompletionRequest {
                    messages: messages.clone(),
                    tools: definitions.to_vec(),
                    max_tokens: self.max_tokens,
                };
                self.llm
                    .complete(retry)
                    .await
                    .map_err(|e| eyre!(e).wrap_err("Completion still failing after budget shrink"))
            }
            Err(e) => Err(eyre!(e)),
        }
    }

    /// Successful completion: verify the output, clear the checkpoint
    async fn finish(
        &self,
        descriptor: &RunDescriptor,
        tracker: &Arc<Mutex<ProgressTracker>>,
        iteration: u32,
    ) -> Result<RunReport> {
        tracker.lock().await.set_phase(Phase::Done);

        let unresolved = self
            .scan_placeholders(&descriptor.output_path)
            .await
            .wrap_err("Run finished but the summary file cannot be read")?;
        if !unresolved.is_empty() {
            warn!(?unresolved, "finish: summary still contains unfilled placeholders");
        }

        if let Err(e) = self.checkpoints.delete(&descriptor.source_path) {
            warn!(error = %e, "finish: could not remove checkpoint");
        }

        let t = tracker.lock().await;
        info!(
            iterations = iteration,
            lines = t.total_units(),
            "finish: run complete"
        );
        Ok(RunReport {
            outcome: RunOutcome::Complete,
            iterations: iteration,
            units_done: t.done_units(),
            total_units: t.total_units(),
            output_path: descriptor.output_path.clone(),
            unresolved_placeholders: unresolved,
        })
    }

    /// Best-effort checkpoint; a failed save is logged, never fatal
    async fn save_checkpoint(
        &self,
        descriptor: &RunDescriptor,
        tracker: &Arc<Mutex<ProgressTracker>>,
        iteration: u32,
    ) {
        let progress = tracker.lock().await.clone();
        let output = tokio::fs::read_to_string(&descriptor.output_path).await.ok();
        let checkpoint = Checkpoint {
            descriptor: descriptor.clone(),
            progress,
            iteration,
            timestamp: Utc::now(),
            output,
        };
        if let Err(e) = self.checkpoints.save(&checkpoint) {
            warn!(error = %e, "save_checkpoint: checkpoint save failed, continuing");
        }
    }

    async fn scan_placeholders(&self, output_path: &Path) -> Result<Vec<String>> {
        let content = tokio::fs::read_to_string(output_path)
            .await
            .wrap_err_with(|| format!("Cannot read summary file {}", output_path.display()))?;
        Ok(prompts::find_placeholders(&content))
    }
}
