use crate::error::ToolError;
use crate::tools::base::{Tool, ToolResult};
use async_trait::async_trait;
use pagepilot_browser::{BrowserDriver, MouseButton, PageActions, ResourceManager};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputerAction {
    Key,
    Type,
    MouseMove,
    LeftClick,
    RightClick,
    MiddleClick,
    DoubleClick,
    LeftClickDrag,
    Screenshot,
    CursorPosition,
}

impl ComputerAction {
    fn needs_text(self) -> bool {
        matches!(self, Self::Key | Self::Type)
    }

    fn needs_coordinate(self) -> bool {
        matches!(self, Self::MouseMove | Self::LeftClickDrag)
    }

    fn accepts_coordinate(self) -> bool {
        self.needs_coordinate()
            || matches!(
                self,
                Self::LeftClick | Self::RightClick | Self::MiddleClick | Self::DoubleClick
            )
    }
}

#[derive(Debug, Deserialize)]
struct ComputerInput {
    action: ComputerAction,
    #[serde(default)]
    coordinate: Option<[i64; 2]>,
    #[serde(default)]
    text: Option<String>,
}

impl ComputerInput {
    fn parse(input: serde_json::Value) -> Result<Self, ToolError> {
        let parsed: Self = serde_json::from_value(input)
            .map_err(|e| ToolError::validation(format!("invalid computer input: {e}")))?;

        let action = parsed.action;
        match (&parsed.text, action.needs_text()) {
            (None, true) => return Err(ToolError::validation(format!("text is required for {action:?}"))),
            (Some(_), false) => {
                return Err(ToolError::validation(format!("text is not accepted for {action:?}")))
            }
            _ => {}
        }
        match (parsed.coordinate, action.needs_coordinate(), action.accepts_coordinate()) {
            (None, true, _) => {
                return Err(ToolError::validation(format!(
                    "coordinate is required for {action:?}"
                )))
            }
            (Some(_), _, false) => {
                return Err(ToolError::validation(format!(
                    "coordinate is not accepted for {action:?}"
                )))
            }
            _ => {}
        }
        Ok(parsed)
    }
}

/// Mouse, keyboard and screenshot control of the shared page.
pub struct ComputerTool<D: BrowserDriver> {
    resources: Arc<ResourceManager<D>>,
}

impl<D: BrowserDriver> ComputerTool<D> {
    pub fn new(resources: Arc<ResourceManager<D>>) -> Self {
        Self { resources }
    }
}

#[async_trait]
impl<D: BrowserDriver> Tool for ComputerTool<D> {
    fn name(&self) -> &'static str {
        "computer"
    }

    fn description(&self) -> &'static str {
        "Control the browser page with the mouse and keyboard and take screenshots. \
         Coordinates are CSS pixels within the page viewport."
    }

    fn schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": [
                        "key", "type", "mouse_move", "left_click", "right_click",
                        "middle_click", "double_click", "left_click_drag",
                        "screenshot", "cursor_position"
                    ]
                },
                "coordinate": {
                    "type": "array",
                    "items": {"type": "integer"},
                    "minItems": 2,
                    "maxItems": 2
                },
                "text": {"type": "string"}
            },
            "required": ["action"]
        })
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult, ToolError> {
        let input = ComputerInput::parse(input)?;
        let page = self.resources.acquire().await?;
        debug!(action = ?input.action, wait_ms = page.wait_time().as_millis() as u64, "computer action");

        if let Some([x, y]) = input.coordinate {
            let viewport = page.viewport();
            if !viewport.contains(x, y) {
                return Err(ToolError::validation(format!(
                    "coordinate ({x}, {y}) is outside the {}x{} viewport",
                    viewport.width, viewport.height
                )));
            }
        }

        let text = input.text.as_deref().unwrap_or_default();
        let output = match input.action {
            ComputerAction::Key => {
                page.key_press(text).await?;
                None
            }
            ComputerAction::Type => {
                page.type_text(text).await?;
                None
            }
            ComputerAction::MouseMove => {
                if let Some([x, y]) = input.coordinate {
                    page.mouse_move(x, y).await?;
                }
                None
            }
            ComputerAction::LeftClickDrag => {
                if let Some([x, y]) = input.coordinate {
                    page.drag_to(x, y).await?;
                }
                None
            }
            ComputerAction::LeftClick
            | ComputerAction::RightClick
            | ComputerAction::MiddleClick
            | ComputerAction::DoubleClick => {
                if let Some([x, y]) = input.coordinate {
                    page.mouse_move(x, y).await?;
                }
                let (button, count) = match input.action {
                    ComputerAction::RightClick => (MouseButton::Right, 1),
                    ComputerAction::MiddleClick => (MouseButton::Middle, 1),
                    ComputerAction::DoubleClick => (MouseButton::Left, 2),
                    _ => (MouseButton::Left, 1),
                };
                page.click(button, count).await?;
                None
            }
            ComputerAction::Screenshot => None,
            ComputerAction::CursorPosition => {
                let (x, y) = page.cursor_position().await?;
                Some(format!("X={x},Y={y}"))
            }
        };

        let screenshot = page.screenshot().await?;
        let result = match output {
            Some(text) => ToolResult::output(text),
            None => ToolResult::default(),
        };
        Ok(result.with_image(screenshot))
    }
}
