use crate::error::ToolError;
use crate::tools::base::{required_str, Tool, ToolResult};
use async_trait::async_trait;
use pagepilot_browser::{BrowserDriver, PageActions, ResourceManager};
use serde_json::json;
use std::sync::Arc;

/// Evaluates a script in the page and returns the JSON result.
pub struct JavascriptTool<D: BrowserDriver> {
    resources: Arc<ResourceManager<D>>,
}

impl<D: BrowserDriver> JavascriptTool<D> {
    pub fn new(resources: Arc<ResourceManager<D>>) -> Self {
        Self { resources }
    }
}

#[async_trait]
impl<D: BrowserDriver> Tool for JavascriptTool<D> {
    fn name(&self) -> &'static str {
        "javascript"
    }

    fn description(&self) -> &'static str {
        "Evaluate a JavaScript expression in the current page and return its JSON value."
    }

    fn schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "script": {"type": "string"}
            },
            "required": ["script"]
        })
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult, ToolError> {
        let script = required_str(&input, "script")?;
        if script.trim().is_empty() {
            return Err(ToolError::validation("script cannot be empty"));
        }

        let value = self.resources.acquire().await?.evaluate(script).await?;
        let rendered = serde_json::to_string_pretty(&value)
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;

        Ok(ToolResult::output(rendered))
    }
}
