use crate::error::ToolError;
use crate::registry::ToolRegistryImpl;
use crate::tools::{Tool, ToolResult, ToolSpec};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

const MAX_INPUT_BYTES: usize = 1_000_000;

/// Resolves tool names and turns every failure into an error `ToolResult`.
pub struct ToolDispatcherImpl {
    registry: Arc<ToolRegistryImpl>,
}

impl ToolDispatcherImpl {
    pub fn new(registry: Arc<ToolRegistryImpl>) -> Self {
        Self { registry }
    }

    pub fn describe(&self) -> Vec<ToolSpec> {
        self.registry.describe()
    }

    /// Dispatch a tool, folding every failure into an error `ToolResult`.
    pub async fn dispatch(&self, tool_name: &str, input: serde_json::Value) -> ToolResult {
        self.try_dispatch(tool_name, input)
            .await
            .unwrap_or_else(|e| failure_result(tool_name, e))
    }

    /// Like `dispatch`, but a tool that panicked or was torn down comes back
    /// as `Err(ToolError::Internal)` instead of a generic failure result.
    pub async fn try_dispatch(
        &self,
        tool_name: &str,
        input: serde_json::Value,
    ) -> Result<ToolResult, ToolError> {
        info!("Dispatching tool: {}", tool_name);

        let Some(tool) = self.registry.get(tool_name) else {
            warn!("Unknown tool requested: {}", tool_name);
            return Ok(ToolResult::failure(format!("Tool {tool_name} is invalid")));
        };

        if let Err(e) = validate_input(&input) {
            return Ok(failure_result(tool_name, e));
        }

        let started = Instant::now();
        let outcome = execute_isolated(tool, input).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(result) => {
                info!(tool = tool_name, elapsed_ms, is_error = result.is_error(), "Tool finished");
                Ok(result)
            }
            Err(ToolError::Internal) => {
                warn!(tool = tool_name, elapsed_ms, "Tool failed unexpectedly");
                Err(ToolError::Internal)
            }
            Err(e) => {
                warn!(tool = tool_name, elapsed_ms, "Tool failed: {}", e);
                Ok(failure_result(tool_name, e))
            }
        }
    }
}

fn validate_input(input: &serde_json::Value) -> Result<(), ToolError> {
    if !input.is_object() {
        return Err(ToolError::validation("tool input must be a JSON object"));
    }

    if let Ok(serialized) = serde_json::to_string(input) {
        if serialized.len() > MAX_INPUT_BYTES {
            return Err(ToolError::validation("tool input is too large"));
        }
    }

    Ok(())
}

/// Runs the tool on its own task so a panic cannot unwind into the caller.
async fn execute_isolated(
    tool: Arc<dyn Tool>,
    input: serde_json::Value,
) -> Result<ToolResult, ToolError> {
    let handle = tokio::spawn(async move { tool.execute(input).await });

    match handle.await {
        Ok(result) => result,
        Err(join_err) => {
            if join_err.is_panic() {
                error!("Tool execution panicked");
            } else {
                error!("Tool execution cancelled");
            }
            Err(ToolError::Internal)
        }
    }
}

fn failure_result(tool_name: &str, err: ToolError) -> ToolResult {
    match err {
        ToolError::ValidationError(message) => ToolResult::failure(message),
        ToolError::ResourceUnavailable(message) => {
            ToolResult::failure(format!("Resource unavailable: {message}"))
        }
        ToolError::ExecutionFailed(message) => {
            ToolResult::failure(format!("Tool {tool_name} failed: {message}"))
        }
        ToolError::Internal => ToolResult::failure(format!("Tool {tool_name} failed unexpectedly")),
    }
}
