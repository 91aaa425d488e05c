//! Terminal rendering of transcript turns.

use pagepilot_runtime::{ContentBlock, ResultContent, Role, Turn};
use std::io::Write;

const MAX_INPUT_CHARS: usize = 200;

/// One line per block; screenshots are summarised, never dumped.
pub fn format_turn(turn: &Turn) -> Vec<String> {
    let mut lines = Vec::new();
    for block in &turn.blocks {
        match block {
            ContentBlock::Text { text } => {
                let speaker = match turn.role {
                    Role::User => "you",
                    Role::Assistant => "assistant",
                    Role::Tool => "tool",
                };
                lines.push(format!("{speaker}> {}", text.trim()));
            }
            ContentBlock::ToolUse { name, input, .. } => {
                lines.push(format!("  -> {name} {}", truncate(&input.to_string())));
            }
            ContentBlock::ToolResult {
                content, is_error, ..
            } => {
                let marker = if *is_error { "  <- error:" } else { "  <-" };
                let text = content.iter().find_map(|item| match item {
                    ResultContent::Text { text } => Some(text.as_str()),
                    ResultContent::Image { .. } => None,
                });
                let images = content.iter().filter(|item| item.is_image()).count();

                let mut line = marker.to_string();
                if let Some(text) = text {
                    line.push(' ');
                    line.push_str(&truncate(text));
                }
                if images > 0 {
                    line.push_str(&format!(" [{images} screenshot]"));
                }
                lines.push(line);
            }
        }
    }
    lines
}

/// Render callback handed to the conversation.
pub fn print_turn(turn: &Turn) -> Result<(), String> {
    let mut stdout = std::io::stdout().lock();
    for line in format_turn(turn) {
        writeln!(stdout, "{line}").map_err(|e| e.to_string())?;
    }
    stdout.flush().map_err(|e| e.to_string())
}

fn truncate(text: &str) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() <= MAX_INPUT_CHARS {
        return single_line;
    }
    let cut: String = single_line.chars().take(MAX_INPUT_CHARS).collect();
    format!("{cut}...")
}
