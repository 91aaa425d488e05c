pub mod base;
pub mod computer;
pub mod javascript;
pub mod navigate;

pub use base::{Tool, ToolResult, ToolSpec};
pub use computer::{ComputerAction, ComputerTool};
pub use javascript::JavascriptTool;
pub use navigate::NavigateTool;
