use crate::types::{ContentBlock, ResultContent};
use pagepilot_tools::ToolResult;

/// Shape a tool result into the block answering `tool_use_id`.
///
/// Error text wins over output text; an image is appended either way.
pub fn process_tool_output(result: &ToolResult, tool_use_id: &str) -> ContentBlock {
    let mut content = Vec::new();

    if let Some(error) = &result.error {
        content.push(ResultContent::Text {
            text: error.clone(),
        });
    } else if let Some(output) = &result.output {
        content.push(ResultContent::Text {
            text: output.clone(),
        });
    }

    if let Some(image) = &result.image {
        content.push(ResultContent::png(image));
    }

    ContentBlock::ToolResult {
        tool_use_id: tool_use_id.to_string(),
        content,
        is_error: result.is_error(),
    }
}
