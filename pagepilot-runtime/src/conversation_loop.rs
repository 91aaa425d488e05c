//! Conversation loop - alternates model calls and tool dispatch.

use crate::interfaces::{ModelBackend, RuntimeError, ToolExecutor};
use crate::metrics::MetricTimer;
use crate::model_client::ModelClient;
use crate::tool_output::process_tool_output;
use crate::types::{ContentBlock, Role, Transcript, Turn};
use pagepilot_tools::ToolResult;
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Called with every turn the loop appends.
pub type RenderFn = dyn Fn(&Turn) -> Result<(), String> + Send + Sync;

/// How a run ended. `iterations` counts model calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The model answered without requesting tools.
    Done { iterations: usize },
    /// The iteration cap was reached with tools still pending.
    Exhausted { iterations: usize },
    Cancelled { iterations: usize },
}

impl LoopOutcome {
    pub fn iterations(&self) -> usize {
        match *self {
            LoopOutcome::Done { iterations }
            | LoopOutcome::Exhausted { iterations }
            | LoopOutcome::Cancelled { iterations } => iterations,
        }
    }
}

pub struct ConversationLoop<B: ModelBackend, E: ToolExecutor> {
    model: ModelClient<B>,
    executor: Arc<E>,
    max_iterations: Option<usize>,
}

impl<B: ModelBackend, E: ToolExecutor> ConversationLoop<B, E> {
    /// `max_iterations` of `None` leaves the loop uncapped.
    pub fn new(model: ModelClient<B>, executor: Arc<E>, max_iterations: Option<usize>) -> Self {
        Self {
            model,
            executor,
            max_iterations,
        }
    }

    /// Drive the conversation until the model stops requesting tools.
    ///
    /// Every turn produced along the way is appended to `transcript`, so a
    /// failed run leaves behind everything up to the failing model call.
    ///
    /// # Errors
    /// `InvalidTranscript` if the transcript does not end with a user turn or
    /// has unpaired tool uses; model errors are returned as they come.
    pub async fn run(
        &self,
        transcript: &mut Transcript,
        keep_images: Option<usize>,
        render: Option<&RenderFn>,
        cancel: &CancellationToken,
    ) -> Result<LoopOutcome, RuntimeError> {
        match transcript.last() {
            Some(turn) if turn.role == Role::User => {}
            _ => {
                return Err(RuntimeError::InvalidTranscript(
                    "conversation must end with a user turn".to_string(),
                ))
            }
        }
        transcript
            .check_pairing()
            .map_err(RuntimeError::InvalidTranscript)?;

        let tools = self.executor.describe();
        let mut iterations = 0;

        loop {
            if cancel.is_cancelled() {
                info!("Conversation cancelled after {} iterations", iterations);
                return Ok(LoopOutcome::Cancelled { iterations });
            }
            if let Some(max) = self.max_iterations {
                if iterations >= max {
                    warn!("Iteration cap ({}) reached with tools pending", max);
                    return Ok(LoopOutcome::Exhausted { iterations });
                }
            }
            iterations += 1;
            debug!("Conversation iteration {}", iterations);

            let reply = self
                .model
                .send(transcript, &tools, keep_images)
                .await
                .map_err(|e| {
                    error!("Model call failed: {}", e);
                    e
                })?;

            // A repeated tool use id would be answered twice and break pairing.
            let mut seen = HashSet::new();
            let blocks: Vec<ContentBlock> = reply
                .content
                .into_iter()
                .filter(|block| match block {
                    ContentBlock::ToolResult { .. } => false,
                    ContentBlock::ToolUse { id, .. } if !seen.insert(id.clone()) => {
                        warn!("Dropping repeated tool use id {}", id);
                        false
                    }
                    _ => true,
                })
                .collect();
            let assistant = Turn::new(Role::Assistant, blocks);

            let mut results = Vec::new();
            for (id, name, input) in assistant.tool_uses() {
                info!("Model requested tool: {} ({})", name, id);
                let result = self.dispatch_one(name, input.clone()).await;
                results.push(process_tool_output(&result, id));
            }

            append(transcript, assistant, render);

            if results.is_empty() {
                info!("Conversation finished after {} iterations", iterations);
                return Ok(LoopOutcome::Done { iterations });
            }

            append(transcript, Turn::new(Role::Tool, results), render);
        }
    }

    async fn dispatch_one(&self, name: &str, input: serde_json::Value) -> ToolResult {
        let _timer = MetricTimer::new("tool_execution_latency");

        match self.executor.dispatch(name, input).await {
            Ok(result) => {
                if let Some(error) = &result.error {
                    warn!("Tool {} returned error: {}", name, error);
                    crate::metrics::increment_tool_errors();
                }
                result
            }
            Err(e) => {
                warn!("Tool {} dispatch failed: {}", name, e);
                crate::metrics::increment_tool_errors();
                ToolResult::failure(format!("Tool execution failed: {e}"))
            }
        }
    }
}

fn append(transcript: &mut Transcript, turn: Turn, render: Option<&RenderFn>) {
    transcript.push(turn);
    let (Some(render), Some(turn)) = (render, transcript.last()) else {
        return;
    };

    match catch_unwind(AssertUnwindSafe(|| render(turn))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Render callback failed: {}", e),
        Err(_) => error!("Render callback panicked"),
    }
}
