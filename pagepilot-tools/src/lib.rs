pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod tools;

pub use dispatcher::ToolDispatcherImpl;
pub use error::ToolError;
pub use registry::ToolRegistryImpl;
pub use tools::{ComputerTool, JavascriptTool, NavigateTool, Tool, ToolResult, ToolSpec};

use pagepilot_browser::{BrowserDriver, ResourceManager};
use std::sync::Arc;

/// Registry holding the browser tools, all sharing one resource manager.
pub fn browser_registry<D: BrowserDriver>(resources: Arc<ResourceManager<D>>) -> ToolRegistryImpl {
    let mut registry = ToolRegistryImpl::new();
    registry
        .register(Arc::new(ComputerTool::new(Arc::clone(&resources))))
        .register(Arc::new(NavigateTool::new(Arc::clone(&resources))))
        .register(Arc::new(JavascriptTool::new(resources)));
    registry
}
