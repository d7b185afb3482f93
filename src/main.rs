//! Market snapshot CLI application.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use market_config::load_config;
use market_monitor::setup_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::ValidateConfig = cli.command {
        let level = cli.log_level.map(|l| l.as_str()).unwrap_or("info");
        setup_logging(level, cli.json_logs);
        return cli::commands::validate::run(&cli.config).await;
    }

    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    let level = cli
        .log_level
        .map(|l| l.as_str().to_string())
        .unwrap_or_else(|| config.logging.level.clone());
    setup_logging(&level, cli.json_logs || config.logging.is_json());

    match cli.command {
        Commands::Snapshot(args) => cli::commands::snapshot::run(args, &config).await,
        Commands::Health(args) => cli::commands::health::run(args, &config).await,
        Commands::ValidateConfig => Ok(()),
    }
}
