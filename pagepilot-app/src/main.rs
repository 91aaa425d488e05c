use anyhow::Result;
use clap::Parser;
use pagepilot_app::bootstrap::{build_conversation, resolve_config};
use pagepilot_app::cli::Cli;
use pagepilot_app::logging::init_logging;
use pagepilot_app::repl::Repl;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;

    let env = |name: &str| std::env::var(name).ok();
    let config = resolve_config(&cli, env)?;
    let conversation = build_conversation(&config, env).await?;
    let mut repl = Repl::new(conversation);

    match cli.prompt.as_deref() {
        Some(task) => repl.run_task(task).await,
        None => {
            if let Err(e) = repl.run().await {
                repl.conversation().shutdown().await;
                return Err(e);
            }
        }
    }

    info!("Exiting");
    repl.conversation().shutdown().await;
    Ok(())
}
