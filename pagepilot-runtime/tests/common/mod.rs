//! Scripted collaborators for the runtime tests.

#![allow(dead_code)]

use async_trait::async_trait;
use pagepilot_browser::{
    BrowserDriver, BrowserError, MouseButton, PageActions, RecoveryPolicy, ResourceManager,
    Viewport,
};
use pagepilot_runtime::*;
use pagepilot_tools::{ToolResult, ToolSpec};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Model backend replaying canned replies and recording every request.
/// Clones share the same script.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    replies: Arc<Mutex<VecDeque<Result<ModelTurn, RuntimeError>>>>,
    pub requests: Arc<Mutex<Vec<ModelRequest>>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<Result<ModelTurn, RuntimeError>>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn send(&self, request: &ModelRequest) -> Result<ModelTurn, RuntimeError> {
        self.requests.lock().push(request.clone());
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(text_turn("script exhausted")))
    }
}

pub fn text_turn(text: &str) -> ModelTurn {
    ModelTurn {
        content: vec![ContentBlock::text(text)],
        stop_reason: Some("end_turn".into()),
    }
}

pub fn tool_turn(calls: &[(&str, &str)]) -> ModelTurn {
    let mut content = vec![ContentBlock::text("working on it")];
    for (id, name) in calls {
        content.push(ContentBlock::tool_use(*id, *name, json!({})));
    }
    ModelTurn {
        content,
        stop_reason: Some("tool_use".into()),
    }
}

/// Tool executor with canned behaviour per tool name.
///
/// `ok` returns text plus an image, `fail` returns an error result,
/// `broken` returns `Err`, anything else is unknown.
#[derive(Default)]
pub struct ScriptedExecutor {
    pub calls: Mutex<Vec<String>>,
}

#[async_trait]
impl ToolExecutor for ScriptedExecutor {
    fn describe(&self) -> Vec<ToolSpec> {
        ["ok", "fail", "broken"]
            .iter()
            .map(|name| ToolSpec {
                name: name.to_string(),
                description: format!("{name} tool"),
                input_schema: json!({"type": "object"}),
            })
            .collect()
    }

    async fn dispatch(
        &self,
        tool_name: &str,
        _input: serde_json::Value,
    ) -> Result<ToolResult, RuntimeError> {
        self.calls.lock().push(tool_name.to_string());
        match tool_name {
            "ok" => Ok(ToolResult::output("done").with_image(vec![1, 2, 3])),
            "fail" => Ok(ToolResult::failure("element not found")),
            "broken" => Err(RuntimeError::ToolDispatch("executor crashed".into())),
            other => Ok(ToolResult::failure(format!("Tool {other} is invalid"))),
        }
    }
}

pub fn engine(
    backend: ScriptedBackend,
    executor: Arc<ScriptedExecutor>,
    max_iterations: Option<usize>,
) -> ConversationLoop<ScriptedBackend, ScriptedExecutor> {
    let model = ModelClient::new(backend, "test prompt")
        .with_retry(RetryPolicy::new(1, std::time::Duration::from_millis(1)));
    ConversationLoop::new(model, executor, max_iterations)
}

/// Browser driver whose page can be made to fail its next probes.
#[derive(Default)]
pub struct FlakyScript {
    pub probe_failures: AtomicUsize,
    pub pages_opened: AtomicUsize,
    pub cleanups: AtomicUsize,
}

pub struct FlakyDriver(pub Arc<FlakyScript>);

pub struct FlakyPage {
    pub id: usize,
}

#[async_trait]
impl PageActions for FlakyPage {
    fn viewport(&self) -> Viewport {
        Viewport::default()
    }
    async fn mouse_move(&self, _x: i64, _y: i64) -> Result<(), BrowserError> {
        Ok(())
    }
    async fn click(&self, _button: MouseButton, _count: u32) -> Result<(), BrowserError> {
        Ok(())
    }
    async fn drag_to(&self, _x: i64, _y: i64) -> Result<(), BrowserError> {
        Ok(())
    }
    async fn key_press(&self, _key: &str) -> Result<(), BrowserError> {
        Ok(())
    }
    async fn type_text(&self, _text: &str) -> Result<(), BrowserError> {
        Ok(())
    }
    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError> {
        Ok(vec![self.id as u8])
    }
    async fn cursor_position(&self) -> Result<(i64, i64), BrowserError> {
        Ok((0, 0))
    }
    async fn navigate(&self, url: &str) -> Result<String, BrowserError> {
        Ok(url.to_string())
    }
    async fn evaluate(&self, _script: &str) -> Result<serde_json::Value, BrowserError> {
        Ok(json!(self.id))
    }
}

#[async_trait]
impl BrowserDriver for FlakyDriver {
    type Platform = ();
    type Browser = ();
    type Context = ();
    type Page = FlakyPage;

    async fn start_platform(&self) -> Result<(), BrowserError> {
        Ok(())
    }
    async fn launch_browser(&self, _platform: &()) -> Result<(), BrowserError> {
        Ok(())
    }
    async fn new_context(&self, _browser: &()) -> Result<(), BrowserError> {
        Ok(())
    }
    async fn new_page(&self, _context: &()) -> Result<FlakyPage, BrowserError> {
        Ok(FlakyPage {
            id: self.0.pages_opened.fetch_add(1, Ordering::SeqCst),
        })
    }
    async fn probe(&self, _page: &FlakyPage) -> Result<(), BrowserError> {
        let failed = self
            .0
            .probe_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(BrowserError::Probe("target closed".into()));
        }
        Ok(())
    }
    async fn close_page(&self, _page: FlakyPage) -> Result<(), BrowserError> {
        Ok(())
    }
    async fn close_context(&self, _context: ()) -> Result<(), BrowserError> {
        Ok(())
    }
    async fn close_browser(&self, _browser: ()) -> Result<(), BrowserError> {
        Ok(())
    }
    async fn stop_platform(&self, _platform: ()) -> Result<(), BrowserError> {
        self.0.cleanups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub async fn flaky_manager(script: Arc<FlakyScript>) -> Arc<ResourceManager<FlakyDriver>> {
    let manager = ResourceManager::launch(FlakyDriver(script), RecoveryPolicy::default())
        .await
        .unwrap_or_else(|e| panic!("fake browser failed to launch: {e}"));
    Arc::new(manager)
}

/// All tool results in the transcript, as `(tool_use_id, is_error, first text)`.
pub fn results(transcript: &Transcript) -> Vec<(String, bool, Option<String>)> {
    transcript
        .turns()
        .iter()
        .flat_map(|turn| turn.blocks.iter())
        .filter_map(|block| match block {
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => {
                let text = content.iter().find_map(|item| match item {
                    ResultContent::Text { text } => Some(text.clone()),
                    _ => None,
                });
                Some((tool_use_id.clone(), *is_error, text))
            }
            _ => None,
        })
        .collect()
}
