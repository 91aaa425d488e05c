//! Driver seam between the resource manager and a concrete browser stack.
//!
//! A driver owns four nested layers: the platform (automation runtime), the
//! browser process, a browsing context and a single page. The manager builds
//! them in that order and tears them down in reverse.

use crate::error::BrowserError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Mouse button for click primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Viewport size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether a point lies inside the viewport.
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < i64::from(self.width) && y < i64::from(self.height)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280, 800)
    }
}

/// Primitive actions a tool may perform on the page while holding a lease.
#[async_trait]
pub trait PageActions: Send + Sync + 'static {
    fn viewport(&self) -> Viewport;

    async fn mouse_move(&self, x: i64, y: i64) -> Result<(), BrowserError>;

    /// Press and release `button` at the current cursor position.
    async fn click(&self, button: MouseButton, click_count: u32) -> Result<(), BrowserError>;

    /// Drag with the left button from the current cursor position to `(x, y)`.
    async fn drag_to(&self, x: i64, y: i64) -> Result<(), BrowserError>;

    /// Press a key or chord such as `Enter` or `ctrl+a`.
    async fn key_press(&self, key: &str) -> Result<(), BrowserError>;

    async fn type_text(&self, text: &str) -> Result<(), BrowserError>;

    /// PNG bytes of the visible viewport.
    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError>;

    async fn cursor_position(&self) -> Result<(i64, i64), BrowserError>;

    /// Navigate and return the resulting URL.
    async fn navigate(&self, url: &str) -> Result<String, BrowserError>;

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, BrowserError>;
}

/// Builds, probes and tears down the layers behind the shared page.
#[async_trait]
pub trait BrowserDriver: Send + Sync + 'static {
    type Platform: Send + Sync + 'static;
    type Browser: Send + Sync + 'static;
    type Context: Send + Sync + 'static;
    type Page: PageActions;

    async fn start_platform(&self) -> Result<Self::Platform, BrowserError>;

    async fn launch_browser(&self, platform: &Self::Platform) -> Result<Self::Browser, BrowserError>;

    async fn new_context(&self, browser: &Self::Browser) -> Result<Self::Context, BrowserError>;

    async fn new_page(&self, context: &Self::Context) -> Result<Self::Page, BrowserError>;

    /// Cheap no-op against the page; an error means the page is dead.
    async fn probe(&self, page: &Self::Page) -> Result<(), BrowserError>;

    async fn close_page(&self, page: Self::Page) -> Result<(), BrowserError>;

    async fn close_context(&self, context: Self::Context) -> Result<(), BrowserError>;

    async fn close_browser(&self, browser: Self::Browser) -> Result<(), BrowserError>;

    async fn stop_platform(&self, platform: Self::Platform) -> Result<(), BrowserError>;
}
