use crate::error::ToolError;
use crate::tools::base::{required_str, Tool, ToolResult};
use async_trait::async_trait;
use pagepilot_browser::{BrowserDriver, PageActions, ResourceManager};
use serde_json::json;
use std::sync::Arc;

pub struct NavigateTool<D: BrowserDriver> {
    resources: Arc<ResourceManager<D>>,
}

impl<D: BrowserDriver> NavigateTool<D> {
    pub fn new(resources: Arc<ResourceManager<D>>) -> Self {
        Self { resources }
    }
}

fn validate_url(url: &str) -> Result<(), ToolError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ToolError::validation("url cannot be empty"));
    }
    let allowed = ["http://", "https://", "file://", "about:"];
    if !allowed.iter().any(|prefix| url.starts_with(prefix)) {
        return Err(ToolError::validation(format!(
            "unsupported url scheme: {url}"
        )));
    }
    Ok(())
}

#[async_trait]
impl<D: BrowserDriver> Tool for NavigateTool<D> {
    fn name(&self) -> &'static str {
        "navigate"
    }

    fn description(&self) -> &'static str {
        "Load a URL in the browser page and return a screenshot of the result."
    }

    fn schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "url": {"type": "string"}
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult, ToolError> {
        let url = required_str(&input, "url")?;
        validate_url(url)?;

        let page = self.resources.acquire().await?;
        let landed = page.navigate(url.trim()).await?;
        let screenshot = page.screenshot().await?;

        Ok(ToolResult::output(format!("Navigated to {landed}")).with_image(screenshot))
    }
}
