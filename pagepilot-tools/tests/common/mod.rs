//! Recording browser driver shared by the tool tests.

#![allow(dead_code)]

use async_trait::async_trait;
use pagepilot_browser::{
    BrowserDriver, BrowserError, MouseButton, PageActions, RecoveryPolicy, ResourceManager,
    Viewport,
};
use std::sync::Arc;

#[derive(Default)]
pub struct Recorder {
    pub actions: parking_lot::Mutex<Vec<String>>,
    pub cursor: parking_lot::Mutex<(i64, i64)>,
    pub fail_actions: std::sync::atomic::AtomicBool,
}

impl Recorder {
    pub fn actions(&self) -> Vec<String> {
        self.actions.lock().clone()
    }

    fn record(&self, action: String) -> Result<(), BrowserError> {
        if self.fail_actions.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(BrowserError::action("page detached"));
        }
        self.actions.lock().push(action);
        Ok(())
    }
}

pub struct RecordingDriver {
    pub recorder: Arc<Recorder>,
}

pub struct RecordingPage {
    recorder: Arc<Recorder>,
}

#[async_trait]
impl PageActions for RecordingPage {
    fn viewport(&self) -> Viewport {
        Viewport::new(640, 480)
    }

    async fn mouse_move(&self, x: i64, y: i64) -> Result<(), BrowserError> {
        self.recorder.record(format!("move {x},{y}"))?;
        *self.recorder.cursor.lock() = (x, y);
        Ok(())
    }

    async fn click(&self, button: MouseButton, click_count: u32) -> Result<(), BrowserError> {
        self.recorder.record(format!("click {button:?} x{click_count}"))
    }

    async fn drag_to(&self, x: i64, y: i64) -> Result<(), BrowserError> {
        self.recorder.record(format!("drag {x},{y}"))?;
        *self.recorder.cursor.lock() = (x, y);
        Ok(())
    }

    async fn key_press(&self, key: &str) -> Result<(), BrowserError> {
        self.recorder.record(format!("key {key}"))
    }

    async fn type_text(&self, text: &str) -> Result<(), BrowserError> {
        self.recorder.record(format!("type {text}"))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError> {
        self.recorder.record("screenshot".to_string())?;
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn cursor_position(&self) -> Result<(i64, i64), BrowserError> {
        Ok(*self.recorder.cursor.lock())
    }

    async fn navigate(&self, url: &str) -> Result<String, BrowserError> {
        self.recorder.record(format!("goto {url}"))?;
        Ok(format!("{url}/"))
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, BrowserError> {
        self.recorder.record(format!("eval {script}"))?;
        Ok(serde_json::json!({"title": "Example", "links": 3}))
    }
}

#[async_trait]
impl BrowserDriver for RecordingDriver {
    type Platform = ();
    type Browser = ();
    type Context = ();
    type Page = RecordingPage;

    async fn start_platform(&self) -> Result<(), BrowserError> {
        Ok(())
    }
    async fn launch_browser(&self, _platform: &()) -> Result<(), BrowserError> {
        Ok(())
    }
    async fn new_context(&self, _browser: &()) -> Result<(), BrowserError> {
        Ok(())
    }
    async fn new_page(&self, _context: &()) -> Result<RecordingPage, BrowserError> {
        Ok(RecordingPage {
            recorder: Arc::clone(&self.recorder),
        })
    }
    async fn probe(&self, _page: &RecordingPage) -> Result<(), BrowserError> {
        Ok(())
    }
    async fn close_page(&self, _page: RecordingPage) -> Result<(), BrowserError> {
        Ok(())
    }
    async fn close_context(&self, _context: ()) -> Result<(), BrowserError> {
        Ok(())
    }
    async fn close_browser(&self, _browser: ()) -> Result<(), BrowserError> {
        Ok(())
    }
    async fn stop_platform(&self, _platform: ()) -> Result<(), BrowserError> {
        Ok(())
    }
}

pub async fn recording_manager() -> (Arc<ResourceManager<RecordingDriver>>, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let driver = RecordingDriver {
        recorder: Arc::clone(&recorder),
    };
    let manager = ResourceManager::launch(driver, RecoveryPolicy::default())
        .await
        .unwrap_or_else(|e| panic!("fake driver failed to launch: {e}"));
    (Arc::new(manager), recorder)
}
