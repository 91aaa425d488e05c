//! Chromium driver over the DevTools protocol (chromiumoxide).

use crate::driver::{BrowserDriver, MouseButton, PageActions, Viewport};
use crate::error::BrowserError;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
    DispatchMouseEventType, InsertTextParams, MouseButton as CdpMouseButton,
};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt as _;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Launch settings for the Chromium driver.
#[derive(Debug, Clone)]
pub struct ChromeSettings {
    pub headless: bool,
    pub viewport: Viewport,
    pub executable_path: Option<PathBuf>,
    pub extra_args: Vec<String>,
}

impl Default for ChromeSettings {
    fn default() -> Self {
        Self {
            headless: false,
            viewport: Viewport::default(),
            executable_path: None,
            extra_args: vec!["--start-maximized".to_string()],
        }
    }
}

pub struct ChromeDriver {
    settings: ChromeSettings,
}

impl ChromeDriver {
    pub fn new(settings: ChromeSettings) -> Self {
        Self { settings }
    }

    fn browser_config(&self) -> Result<BrowserConfig, BrowserError> {
        let viewport = self.settings.viewport;
        let mut builder = BrowserConfig::builder().window_size(viewport.width, viewport.height);

        if !self.settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.settings.executable_path {
            if !path.exists() {
                return Err(BrowserError::Config(format!(
                    "chrome executable not found: {}",
                    path.display()
                )));
            }
            builder = builder.chrome_executable(path);
        }
        for arg in &self.settings.extra_args {
            builder = builder.arg(arg.as_str());
        }

        builder.build().map_err(BrowserError::Config)
    }
}

/// CDP connection handler task.
pub struct ChromePlatform {
    handler: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

pub struct ChromeBrowser {
    inner: Arc<tokio::sync::Mutex<Browser>>,
}

pub struct ChromeContext {
    browser: Arc<tokio::sync::Mutex<Browser>>,
    id: BrowserContextId,
}

pub struct ChromePage {
    page: Page,
    viewport: Viewport,
    cursor: parking_lot::Mutex<(i64, i64)>,
}

#[async_trait]
impl BrowserDriver for ChromeDriver {
    type Platform = ChromePlatform;
    type Browser = ChromeBrowser;
    type Context = ChromeContext;
    type Page = ChromePage;

    async fn start_platform(&self) -> Result<ChromePlatform, BrowserError> {
        // Validate settings before any process is spawned.
        self.browser_config()?;
        Ok(ChromePlatform {
            handler: parking_lot::Mutex::new(None),
        })
    }

    async fn launch_browser(&self, platform: &ChromePlatform) -> Result<ChromeBrowser, BrowserError> {
        info!(
            headless = self.settings.headless,
            executable = ?self.settings.executable_path,
            "launching chrome"
        );
        let (browser, mut handler) = Browser::launch(self.browser_config()?)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let task = tokio::spawn(async move { while handler.next().await.is_some() {} });
        *platform.handler.lock() = Some(task);

        Ok(ChromeBrowser {
            inner: Arc::new(tokio::sync::Mutex::new(browser)),
        })
    }

    async fn new_context(&self, browser: &ChromeBrowser) -> Result<ChromeContext, BrowserError> {
        let created = browser
            .inner
            .lock()
            .await
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| BrowserError::Launch(format!("failed to create context: {e}")))?;

        Ok(ChromeContext {
            browser: Arc::clone(&browser.inner),
            id: created.result.browser_context_id.clone(),
        })
    }

    async fn new_page(&self, context: &ChromeContext) -> Result<ChromePage, BrowserError> {
        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context.id.clone())
            .build()
            .map_err(BrowserError::action)?;

        let page = context
            .browser
            .lock()
            .await
            .new_page(params)
            .await
            .map_err(|e| BrowserError::action(format!("failed to create page: {e}")))?;

        let viewport = self.settings.viewport;
        page.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(viewport.width),
            i64::from(viewport.height),
            1.0,
            false,
        ))
        .await
        .map_err(|e| BrowserError::action(format!("failed to set viewport: {e}")))?;

        Ok(ChromePage {
            page,
            viewport,
            cursor: parking_lot::Mutex::new((0, 0)),
        })
    }

    async fn probe(&self, page: &ChromePage) -> Result<(), BrowserError> {
        page.page
            .evaluate("1".to_string())
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Probe(e.to_string()))
    }

    async fn close_page(&self, page: ChromePage) -> Result<(), BrowserError> {
        page.page
            .close()
            .await
            .map_err(|e| BrowserError::action(format!("failed to close page: {e}")))
    }

    async fn close_context(&self, context: ChromeContext) -> Result<(), BrowserError> {
        context
            .browser
            .lock()
            .await
            .execute(DisposeBrowserContextParams::new(context.id))
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::action(format!("failed to dispose context: {e}")))
    }

    async fn close_browser(&self, browser: ChromeBrowser) -> Result<(), BrowserError> {
        let mut inner = browser.inner.lock().await;
        inner
            .close()
            .await
            .map_err(|e| BrowserError::action(format!("failed to close browser: {e}")))?;
        inner
            .wait()
            .await
            .map_err(|e| BrowserError::action(format!("browser did not exit: {e}")))?;
        Ok(())
    }

    async fn stop_platform(&self, platform: ChromePlatform) -> Result<(), BrowserError> {
        if let Some(task) = platform.handler.lock().take() {
            task.abort();
        }
        debug!("cdp handler stopped");
        Ok(())
    }
}

impl ChromePage {
    async fn mouse_event(
        &self,
        kind: DispatchMouseEventType,
        (x, y): (i64, i64),
        button: Option<(CdpMouseButton, i64)>,
        buttons: i64,
    ) -> Result<(), BrowserError> {
        let mut builder = DispatchMouseEventParams::builder()
            .r#type(kind)
            .x(x as f64)
            .y(y as f64)
            .buttons(buttons);
        if let Some((button, click_count)) = button {
            builder = builder.button(button).click_count(click_count);
        }
        let params = builder.build().map_err(BrowserError::action)?;

        self.page
            .execute(params)
            .await
            .map_err(|e| BrowserError::action(format!("mouse event failed: {e}")))?;
        Ok(())
    }

    async fn key_event(
        &self,
        kind: DispatchKeyEventType,
        key: &KeySpec,
    ) -> Result<(), BrowserError> {
        let mut builder = DispatchKeyEventParams::builder()
            .r#type(kind.clone())
            .key(key.key.clone())
            .modifiers(key.modifiers);
        if let Some(code) = key.virtual_key_code {
            builder = builder.windows_virtual_key_code(code);
        }
        if matches!(kind, DispatchKeyEventType::KeyDown) {
            if let Some(text) = &key.text {
                builder = builder.text(text.clone());
            }
        }
        let params = builder.build().map_err(BrowserError::action)?;

        self.page
            .execute(params)
            .await
            .map_err(|e| BrowserError::action(format!("key event failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl PageActions for ChromePage {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    async fn mouse_move(&self, x: i64, y: i64) -> Result<(), BrowserError> {
        self.mouse_event(DispatchMouseEventType::MouseMoved, (x, y), None, 0)
            .await?;
        *self.cursor.lock() = (x, y);
        Ok(())
    }

    async fn click(&self, button: MouseButton, click_count: u32) -> Result<(), BrowserError> {
        let at = *self.cursor.lock();
        let cdp_button = match button {
            MouseButton::Left => CdpMouseButton::Left,
            MouseButton::Right => CdpMouseButton::Right,
            MouseButton::Middle => CdpMouseButton::Middle,
        };
        for count in 1..=i64::from(click_count.max(1)) {
            self.mouse_event(
                DispatchMouseEventType::MousePressed,
                at,
                Some((cdp_button.clone(), count)),
                0,
            )
            .await?;
            self.mouse_event(
                DispatchMouseEventType::MouseReleased,
                at,
                Some((cdp_button.clone(), count)),
                0,
            )
            .await?;
        }
        Ok(())
    }

    async fn drag_to(&self, x: i64, y: i64) -> Result<(), BrowserError> {
        let from = *self.cursor.lock();
        self.mouse_event(
            DispatchMouseEventType::MousePressed,
            from,
            Some((CdpMouseButton::Left, 1)),
            1,
        )
        .await?;
        self.mouse_event(DispatchMouseEventType::MouseMoved, (x, y), None, 1)
            .await?;
        self.mouse_event(
            DispatchMouseEventType::MouseReleased,
            (x, y),
            Some((CdpMouseButton::Left, 1)),
            0,
        )
        .await?;
        *self.cursor.lock() = (x, y);
        Ok(())
    }

    async fn key_press(&self, key: &str) -> Result<(), BrowserError> {
        let spec = KeySpec::parse(key)?;
        self.key_event(DispatchKeyEventType::KeyDown, &spec).await?;
        self.key_event(DispatchKeyEventType::KeyUp, &spec).await
    }

    async fn type_text(&self, text: &str) -> Result<(), BrowserError> {
        self.page
            .execute(InsertTextParams::new(text))
            .await
            .map_err(|e| BrowserError::action(format!("insert text failed: {e}")))?;
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        self.page
            .screenshot(params)
            .await
            .map_err(|e| BrowserError::action(format!("screenshot failed: {e}")))
    }

    async fn cursor_position(&self) -> Result<(i64, i64), BrowserError> {
        Ok(*self.cursor.lock())
    }

    async fn navigate(&self, url: &str) -> Result<String, BrowserError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| BrowserError::action(format!("navigation failed: {e}")))?;
        Ok(self
            .page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.to_string()))
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, BrowserError> {
        let result = self
            .page
            .evaluate(script.to_string())
            .await
            .map_err(|e| BrowserError::action(format!("evaluate failed: {e}")))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }
}

const ALT: i64 = 1;
const CTRL: i64 = 2;
const META: i64 = 4;
const SHIFT: i64 = 8;

/// A key chord resolved to DevTools key event fields.
#[derive(Debug, Clone, PartialEq)]
struct KeySpec {
    key: String,
    modifiers: i64,
    virtual_key_code: Option<i64>,
    text: Option<String>,
}

impl KeySpec {
    /// Parse xdotool-style chords: `Return`, `ctrl+a`, `shift+Tab`.
    fn parse(chord: &str) -> Result<Self, BrowserError> {
        let parts: Vec<&str> = chord.split('+').map(str::trim).collect();
        let Some((name, modifier_names)) = parts.split_last() else {
            return Err(BrowserError::action("empty key"));
        };
        if name.is_empty() {
            return Err(BrowserError::action(format!("invalid key chord: {chord}")));
        }

        let mut modifiers = 0;
        for modifier in modifier_names {
            modifiers |= match modifier.to_ascii_lowercase().as_str() {
                "alt" | "option" => ALT,
                "ctrl" | "control" => CTRL,
                "cmd" | "command" | "meta" | "super" => META,
                "shift" => SHIFT,
                other => {
                    return Err(BrowserError::action(format!("unknown modifier: {other}")))
                }
            };
        }

        let (key, code) = match name.to_ascii_lowercase().as_str() {
            "return" | "enter" | "kp_enter" => ("Enter".to_string(), Some(13)),
            "tab" => ("Tab".to_string(), Some(9)),
            "backspace" => ("Backspace".to_string(), Some(8)),
            "escape" | "esc" => ("Escape".to_string(), Some(27)),
            "space" => (" ".to_string(), Some(32)),
            "delete" => ("Delete".to_string(), Some(46)),
            "home" => ("Home".to_string(), Some(36)),
            "end" => ("End".to_string(), Some(35)),
            "page_up" | "pageup" | "prior" => ("PageUp".to_string(), Some(33)),
            "page_down" | "pagedown" | "next" => ("PageDown".to_string(), Some(34)),
            "left" | "arrowleft" => ("ArrowLeft".to_string(), Some(37)),
            "up" | "arrowup" => ("ArrowUp".to_string(), Some(38)),
            "right" | "arrowright" => ("ArrowRight".to_string(), Some(39)),
            "down" | "arrowdown" => ("ArrowDown".to_string(), Some(40)),
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => {
                        let code = c.is_ascii_alphanumeric().then(|| i64::from(c.to_ascii_uppercase() as u8));
                        (c.to_string(), code)
                    }
                    _ => (name.to_string(), None),
                }
            }
        };

        let printable = key.chars().count() == 1 || key == "Enter";
        let text = (printable && modifiers & (CTRL | ALT | META) == 0).then(|| {
            if key == "Enter" {
                "\r".to_string()
            } else {
                key.clone()
            }
        });

        Ok(Self {
            key,
            modifiers,
            virtual_key_code: code,
            text,
        })
    }
}
