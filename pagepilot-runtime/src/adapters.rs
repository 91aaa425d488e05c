//! Bridges from the tool and browser crates to the runtime interfaces.

use crate::interfaces::{ResourceHandle, RuntimeError, ToolExecutor};
use async_trait::async_trait;
use pagepilot_browser::{BrowserDriver, ResourceManager};
use pagepilot_tools::{ToolDispatcherImpl, ToolResult, ToolSpec};

#[async_trait]
impl ToolExecutor for ToolDispatcherImpl {
    fn describe(&self) -> Vec<ToolSpec> {
        ToolDispatcherImpl::describe(self)
    }

    async fn dispatch(
        &self,
        tool_name: &str,
        input: serde_json::Value,
    ) -> Result<ToolResult, RuntimeError> {
        ToolDispatcherImpl::try_dispatch(self, tool_name, input)
            .await
            .map_err(|_| RuntimeError::ToolDispatch(format!("Tool {tool_name} failed unexpectedly")))
    }
}

#[async_trait]
impl<D: BrowserDriver> ResourceHandle for ResourceManager<D> {
    async fn shutdown(&self) {
        self.cleanup().await;
    }
}
