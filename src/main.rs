//! Trading system CLI application.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use trading_config::{load_config, parse_config, AppConfig, LogFormat};
use trading_monitor::setup_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_settings(&cli)?;
    if let Some(level) = cli.log_level {
        config.logging.level = level.as_str().to_string();
    }
    if cli.json_logs {
        config.logging.format = LogFormat::Json;
    }
    let _guard = setup_logging(&config.logging).context("Failed to initialise logging")?;

    match cli.command {
        Commands::Backtest(args) => cli::commands::backtest::run(args, &config).await,
        Commands::Paper(args) => cli::commands::paper::run(args, &config).await,
        Commands::Strategies => cli::commands::strategies::run(),
        Commands::ValidateConfig => cli::commands::validate::run(&cli.config),
    }
}

/// The configuration file when present, otherwise defaults; environment overrides apply to both.
fn load_settings(cli: &Cli) -> Result<AppConfig> {
    if cli.config.exists() {
        load_config(&cli.config).with_context(|| format!("Failed to load {}", cli.config.display()))
    } else {
        parse_config("").context("Failed to read configuration from the environment")
    }
}
