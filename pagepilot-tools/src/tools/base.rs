use crate::error::ToolError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Outcome of one tool invocation, before it is shaped into a transcript block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolResult {
    pub output: Option<String>,
    pub error: Option<String>,
    /// PNG bytes.
    pub image: Option<Vec<u8>>,
}

impl ToolResult {
    pub fn output(output: impl Into<String>) -> Self {
        Self {
            output: Some(output.into()),
            ..Self::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn with_image(mut self, image: Vec<u8>) -> Self {
        self.image = Some(image);
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Static description of a tool as advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn schema(&self) -> serde_json::Value;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.schema(),
        }
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult, ToolError>;
}

/// Pull a required string field out of a tool input object.
pub(crate) fn required_str<'a>(
    input: &'a serde_json::Value,
    field: &str,
) -> Result<&'a str, ToolError> {
    input
        .get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::validation(format!("{field} is required")))
}
