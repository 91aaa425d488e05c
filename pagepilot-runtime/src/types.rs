//! Transcript data model.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Author of a turn.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

/// Item inside a tool result block.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResultContent {
    Text { text: String },
    /// Base64-encoded image data.
    Image { media_type: String, data: String },
}

impl ResultContent {
    pub fn png(bytes: &[u8]) -> Self {
        ResultContent::Image {
            media_type: "image/png".to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, ResultContent::Image { .. })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: Vec<ResultContent>,
        is_error: bool,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn tool_use(
        id: impl Into<String>,
        name: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        ContentBlock::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    fn image_count(&self) -> usize {
        match self {
            ContentBlock::ToolResult { content, .. } => {
                content.iter().filter(|item| item.is_image()).count()
            }
            _ => 0,
        }
    }
}

/// One message in the conversation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub blocks: Vec<ContentBlock>,
}

impl Turn {
    pub fn new(role: Role, blocks: Vec<ContentBlock>) -> Self {
        Self { role, blocks }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![ContentBlock::text(text)])
    }

    /// `(id, name, input)` of every tool use, in emitted order.
    pub fn tool_uses(&self) -> impl Iterator<Item = (&str, &str, &serde_json::Value)> {
        self.blocks.iter().filter_map(|block| match block {
            ContentBlock::ToolUse { id, name, input } => Some((id.as_str(), name.as_str(), input)),
            _ => None,
        })
    }

    pub fn has_tool_use(&self) -> bool {
        self.tool_uses().next().is_some()
    }

    pub fn image_count(&self) -> usize {
        self.blocks.iter().map(ContentBlock::image_count).sum()
    }
}

/// Ordered, append-only sequence of turns.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_turns(turns: Vec<Turn>) -> Self {
        Self { turns }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn image_count(&self) -> usize {
        self.turns.iter().map(Turn::image_count).sum()
    }

    /// Only the pruner rewrites turns, and only on its private copy.
    pub(crate) fn turns_mut(&mut self) -> &mut [Turn] {
        &mut self.turns
    }

    /// Check that every tool use is answered by exactly one result in the
    /// turn right after it, and that results answer nothing else.
    pub fn check_pairing(&self) -> Result<(), String> {
        for (index, turn) in self.turns.iter().enumerate() {
            let results: Vec<&str> = turn
                .blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::ToolResult { tool_use_id, .. } => Some(tool_use_id.as_str()),
                    _ => None,
                })
                .collect();

            let expected: Vec<&str> = match index.checked_sub(1).map(|prev| &self.turns[prev]) {
                Some(prev) if prev.role == Role::Assistant => {
                    prev.tool_uses().map(|(id, _, _)| id).collect()
                }
                _ => Vec::new(),
            };

            if !results.is_empty() && turn.role != Role::Tool {
                return Err(format!("turn {index} carries tool results but is not a tool turn"));
            }
            for id in &expected {
                let answers = results.iter().filter(|r| *r == id).count();
                if answers != 1 {
                    return Err(format!(
                        "tool use {id} has {answers} results in turn {index}"
                    ));
                }
            }
            if let Some(stray) = results.iter().find(|r| !expected.contains(*r)) {
                return Err(format!("turn {index} answers unknown tool use {stray}"));
            }
        }

        if let Some(last) = self.turns.last() {
            if last.role == Role::Assistant && last.has_tool_use() {
                return Err("last assistant turn has unanswered tool uses".to_string());
            }
        }
        Ok(())
    }
}

impl From<Vec<Turn>> for Transcript {
    fn from(turns: Vec<Turn>) -> Self {
        Self::from_turns(turns)
    }
}
