//! Startup: configuration, browser, tools and model wired into one conversation.

use crate::cli::Cli;
use anyhow::{Context, Result};
use pagepilot_browser::{ChromeDriver, ResourceManager};
use pagepilot_runtime::{
    load_config, system_prompt_for_today, AnthropicBackend, ContextPruner, Conversation,
    ConversationLoop, ModelClient, PagePilotConfig, ResourceHandle,
};
use pagepilot_tools::{browser_registry, ToolDispatcherImpl};
use std::sync::Arc;
use tracing::info;

pub type BrowserConversation = Conversation<AnthropicBackend, ToolDispatcherImpl>;

/// Load the config file (or defaults), then apply environment and flags.
pub fn resolve_config(
    cli: &Cli,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<PagePilotConfig> {
    let mut config = if cli.config.exists() {
        info!("Loading config from {}", cli.config.display());
        load_config(&cli.config)
            .with_context(|| format!("Failed to load {}", cli.config.display()))?
    } else {
        info!("No config at {}, using defaults", cli.config.display());
        PagePilotConfig::default()
    };

    config.apply_env_overrides(lookup);
    cli.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Launch the browser and assemble the conversation.
///
/// The browser is started before returning so a missing executable or bad
/// API key is reported at startup.
pub async fn build_conversation(
    config: &PagePilotConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<BrowserConversation> {
    let api_key = config.model.api_key(lookup)?;
    let backend = AnthropicBackend::new(config.model.anthropic_config(api_key))
        .context("Failed to create model backend")?;
    info!("Using model {}", backend.model());

    let driver = ChromeDriver::new(config.browser.chrome_settings());
    let manager = Arc::new(
        ResourceManager::launch(driver, config.browser.recovery_policy())
            .await
            .context("Failed to launch browser")?,
    );

    let registry = Arc::new(browser_registry(Arc::clone(&manager)));
    info!("Registered {} tools", registry.count());
    let dispatcher = Arc::new(ToolDispatcherImpl::new(registry));

    let prompt = system_prompt_for_today(config.conversation.system_prompt.as_deref());
    let model = ModelClient::new(backend, prompt)
        .with_retry(config.model.retry_policy())
        .with_pruner(ContextPruner::new(config.conversation.image_chunk_size));

    let engine = ConversationLoop::new(model, dispatcher, config.conversation.max_iterations);
    let resources: Arc<dyn ResourceHandle> = manager;
    let conversation = Conversation::new(engine, resources);
    conversation.configure(config.conversation.keep_images);
    Ok(conversation)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let cli = Cli::try_parse_from(["pagepilot", "--config", "/nonexistent/pagepilot.yaml"])
            .unwrap();
        let config = resolve_config(&cli, |_| None).unwrap();
        assert_eq!(config.conversation.keep_images, Some(1));
    }

    #[test]
    fn test_layers_apply_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pagepilot.yaml");
        fs::write(
            &path,
            "model:\n  model: from-file\nconversation:\n  keep_images: 4\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "pagepilot",
            "--config",
            path.to_str().unwrap(),
            "--keep-images",
            "2",
        ])
        .unwrap();
        let config = resolve_config(&cli, |name| {
            (name == "PAGEPILOT_MODEL").then(|| "from-env".to_string())
        })
        .unwrap();

        assert_eq!(config.model.model, "from-env");
        assert_eq!(config.conversation.keep_images, Some(2));
    }

    #[test]
    fn test_zero_iterations_flag_rejected() {
        let cli = Cli::try_parse_from([
            "pagepilot",
            "--config",
            "/nonexistent/pagepilot.yaml",
            "--max-iterations",
            "0",
        ])
        .unwrap();
        assert!(resolve_config(&cli, |_| None).is_err());
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_launch() {
        let config = PagePilotConfig::default();
        let err = build_conversation(&config, |_| None).await.err().unwrap();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }
}
