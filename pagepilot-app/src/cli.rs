//! Command-line arguments and their effect on the loaded configuration.

use clap::Parser;
use pagepilot_runtime::PagePilotConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(author, version, about = "Drive a browser page with a tool-calling model", long_about = None)]
pub struct Cli {
    /// YAML config file; built-in defaults are used when it does not exist.
    #[arg(long, value_name = "FILE", default_value = "pagepilot.yaml")]
    pub config: PathBuf,

    /// Screenshots replayed to the model, or `all`.
    #[arg(long, value_name = "N|all", value_parser = parse_limit)]
    pub keep_images: Option<Limit>,

    /// Model calls per task, or `none` for no cap.
    #[arg(long, value_name = "N|none", value_parser = parse_limit)]
    pub max_iterations: Option<Limit>,

    /// Run Chromium without a window.
    #[arg(long)]
    pub headless: bool,

    /// Run one task and exit instead of starting the REPL.
    #[arg(long, value_name = "TEXT")]
    pub prompt: Option<String>,
}

/// A count where `None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit(pub Option<usize>);

pub fn parse_limit(raw: &str) -> Result<Limit, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "all" | "none" | "unlimited" => Ok(Limit(None)),
        other => other
            .parse::<usize>()
            .map(|n| Limit(Some(n)))
            .map_err(|_| format!("expected a number or `all`, got `{raw}`")),
    }
}

impl Cli {
    /// Flags win over the file.
    pub fn apply(&self, config: &mut PagePilotConfig) {
        if let Some(Limit(keep)) = self.keep_images {
            config.conversation.keep_images = keep;
        }
        if let Some(Limit(max)) = self.max_iterations {
            config.conversation.max_iterations = max;
        }
        if self.headless {
            config.browser.headless = true;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_limit() {
        assert_eq!(parse_limit("3").unwrap(), Limit(Some(3)));
        assert_eq!(parse_limit("0").unwrap(), Limit(Some(0)));
        assert_eq!(parse_limit("ALL").unwrap(), Limit(None));
        assert_eq!(parse_limit("none").unwrap(), Limit(None));
        assert!(parse_limit("-1").is_err());
        assert!(parse_limit("many").is_err());
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["pagepilot"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("pagepilot.yaml"));
        assert!(cli.keep_images.is_none());
        assert!(!cli.headless);
        assert!(cli.prompt.is_none());

        let mut config = PagePilotConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.conversation.keep_images, Some(1));
        assert_eq!(config.conversation.max_iterations, Some(50));
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "pagepilot",
            "--keep-images",
            "all",
            "--max-iterations",
            "5",
            "--headless",
            "--prompt",
            "open example.com",
        ])
        .unwrap();

        let mut config = PagePilotConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.conversation.keep_images, None);
        assert_eq!(config.conversation.max_iterations, Some(5));
        assert!(config.browser.headless);
        assert_eq!(cli.prompt.as_deref(), Some("open example.com"));
    }

    #[test]
    fn test_bad_limit_rejected() {
        assert!(Cli::try_parse_from(["pagepilot", "--keep-images", "lots"]).is_err());
    }
}
