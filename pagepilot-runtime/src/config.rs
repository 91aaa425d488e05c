//! YAML configuration loader.

use crate::anthropic::AnthropicConfig;
use crate::interfaces::RuntimeError;
use crate::model_client::RetryPolicy;
use pagepilot_browser::{ChromeSettings, RecoveryPolicy, Viewport};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const MODEL_ENV: &str = "PAGEPILOT_MODEL";
pub const BASE_URL_ENV: &str = "PAGEPILOT_BASE_URL";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PagePilotConfig {
    pub model: ModelSettings,
    pub browser: BrowserSettings,
    pub conversation: ConversationSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    /// Total attempts per model call.
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub request_timeout_secs: u64,
    pub headers: BTreeMap<String, String>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.anthropic.com/v1".to_string(),
            model: "claude-3-5-sonnet-20241022".to_string(),
            max_tokens: 4096,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            request_timeout_secs: 120,
            headers: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub executable_path: Option<PathBuf>,
    pub recovery_attempts: u32,
    pub recovery_backoff_ms: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        let viewport = Viewport::default();
        Self {
            headless: false,
            viewport_width: viewport.width,
            viewport_height: viewport.height,
            executable_path: None,
            recovery_attempts: 1,
            recovery_backoff_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConversationSettings {
    /// `null` disables image pruning.
    pub keep_images: Option<usize>,
    /// `null` removes the iteration cap.
    pub max_iterations: Option<usize>,
    pub image_chunk_size: usize,
    /// Replaces the built-in prompt when set.
    pub system_prompt: Option<String>,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            keep_images: Some(1),
            max_iterations: Some(50),
            image_chunk_size: crate::pruner::DEFAULT_CHUNK_SIZE,
            system_prompt: None,
        }
    }
}

impl PagePilotConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, RuntimeError> {
        if content.trim().is_empty() {
            return Err(RuntimeError::ConfigError("Config file is empty".to_string()));
        }
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| RuntimeError::ConfigError(format!("Invalid YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RuntimeError> {
        let fail = |msg: &str| -> Result<(), RuntimeError> {
            Err(RuntimeError::ConfigError(msg.to_string()))
        };

        if self.model.model.trim().is_empty() {
            return fail("model.model cannot be empty");
        }
        if self.model.base_url.trim().is_empty() {
            return fail("model.base_url cannot be empty");
        }
        if self.model.max_tokens == 0 {
            return fail("model.max_tokens must be positive");
        }
        if self.model.request_timeout_secs == 0 {
            return fail("model.request_timeout_secs must be positive");
        }
        if self.browser.viewport_width == 0 || self.browser.viewport_height == 0 {
            return fail("browser viewport must be non-empty");
        }
        if self.conversation.image_chunk_size == 0 {
            return fail("conversation.image_chunk_size must be positive");
        }
        if self.conversation.max_iterations == Some(0) {
            return fail("conversation.max_iterations must be positive");
        }
        Ok(())
    }

    /// Apply `PAGEPILOT_MODEL` and `PAGEPILOT_BASE_URL` via `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(model) = lookup(MODEL_ENV).filter(|v| !v.trim().is_empty()) {
            self.model.model = model;
        }
        if let Some(url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.model.base_url = url;
        }
    }
}

impl ModelSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.retry_base_delay_ms),
        )
    }

    /// Read the API key from `api_key_env` using `lookup`.
    pub fn api_key(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<String, RuntimeError> {
        lookup(&self.api_key_env)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                RuntimeError::ConfigError(format!(
                    "API key not found: set {}",
                    self.api_key_env
                ))
            })
    }

    pub fn anthropic_config(&self, api_key: String) -> AnthropicConfig {
        AnthropicConfig {
            base_url: self.base_url.clone(),
            api_key,
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            timeout: Duration::from_secs(self.request_timeout_secs),
            extra_headers: self.headers.clone(),
        }
    }
}

impl BrowserSettings {
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.viewport_width, self.viewport_height)
    }

    pub fn chrome_settings(&self) -> ChromeSettings {
        ChromeSettings {
            headless: self.headless,
            viewport: self.viewport(),
            executable_path: self.executable_path.clone(),
            ..ChromeSettings::default()
        }
    }

    pub fn recovery_policy(&self) -> RecoveryPolicy {
        RecoveryPolicy {
            attempts: self.recovery_attempts.max(1),
            backoff: Duration::from_millis(self.recovery_backoff_ms),
        }
    }
}

/// Load configuration from a YAML file.
///
/// # Errors
/// Returns `ConfigError` if the file is missing, empty, not valid YAML or
/// holds out-of-range values.
pub fn load_config(config_path: &Path) -> Result<PagePilotConfig, RuntimeError> {
    if !config_path.exists() {
        return Err(RuntimeError::ConfigError(format!(
            "Config file not found: {}",
            config_path.display()
        )));
    }

    let content = std::fs::read_to_string(config_path).map_err(|e| {
        RuntimeError::ConfigError(format!(
            "Failed to read {}: {}",
            config_path.display(),
            e
        ))
    })?;
    PagePilotConfig::from_yaml_str(&content)
}
