//! Validate configuration command.

use anyhow::{Context, Result};
use std::path::Path;
use trading_config::load_config;
use trading_strategies::StrategyRegistry;

pub fn run(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());

    let config = load_config(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    config.validate()?;

    let registry = StrategyRegistry::new();
    if !registry.exists(&config.strategy.name) {
        anyhow::bail!(
            "Unknown strategy '{}'; available: {}",
            config.strategy.name,
            registry.ids().join(", ")
        );
    }

    println!("Configuration is valid!");
    println!();
    print!("{}", config.to_toml()?);

    Ok(())
}
