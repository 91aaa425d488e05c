use pagepilot_browser::BrowserError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("Internal error")]
    Internal,
}

impl ToolError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }
}

impl From<BrowserError> for ToolError {
    fn from(err: BrowserError) -> Self {
        match err {
            BrowserError::ResourceUnavailable(msg) => ToolError::ResourceUnavailable(msg),
            other => ToolError::ExecutionFailed(other.to_string()),
        }
    }
}
