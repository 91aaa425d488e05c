//! Abstract interfaces for runtime dependencies.

use crate::types::{ContentBlock, Transcript};
use async_trait::async_trait;
use pagepilot_tools::{ToolResult, ToolSpec};
use thiserror::Error;

/// Runtime errors.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Rate limits, overload, network trouble.
    #[error("Transient model error: {0}")]
    Transient(String),

    /// Malformed request, authentication or permission failure. Never retried.
    #[error("Fatal model request error: {0}")]
    FatalRequest(String),

    #[error("Model request failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<RuntimeError>,
    },

    /// The executor itself failed, as opposed to the tool reporting an error.
    #[error("Tool dispatch error: {0}")]
    ToolDispatch(String),

    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("Invalid transcript: {0}")]
    InvalidTranscript(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}

impl RuntimeError {
    /// Everything outside the fatal set is retried up to the ceiling.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            RuntimeError::FatalRequest(_)
                | RuntimeError::RetriesExhausted { .. }
                | RuntimeError::InvalidTranscript(_)
                | RuntimeError::ConfigError(_)
        )
    }
}

/// Everything a backend needs for one model call.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system_prompt: String,
    pub transcript: Transcript,
    pub tools: Vec<ToolSpec>,
}

/// The assistant's reply: text and tool-use blocks in emitted order.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelTurn {
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
}

/// One attempt at a model call. Retry policy lives in `ModelClient`.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn send(&self, request: &ModelRequest) -> Result<ModelTurn, RuntimeError>;
}

/// Tool execution interface.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    fn describe(&self) -> Vec<ToolSpec>;

    /// Run a tool. Failures the executor can describe come back as error results.
    async fn dispatch(
        &self,
        tool_name: &str,
        input: serde_json::Value,
    ) -> Result<ToolResult, RuntimeError>;
}

/// Owner of long-lived resources released on shutdown.
#[async_trait]
pub trait ResourceHandle: Send + Sync {
    async fn shutdown(&self);
}
