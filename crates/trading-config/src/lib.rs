//! Configuration management.
//!
//! Settings are layered: a TOML file first, then `TRADING__SECTION__KEY` environment
//! variables (e.g. `TRADING__BACKTEST__COMMISSION=0.0005`).

mod settings;

pub use settings::{
    AppConfig, BacktestSettings, LiveSettings, LogFormat, LoggingConfig, StrategySettings, TradingSettings,
};

use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use std::path::Path;
use thiserror::Error;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "TRADING";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

fn with_environment(
    builder: ConfigBuilder<config::builder::DefaultState>,
) -> Result<AppConfig, ConfigError> {
    let config = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    Ok(config.try_deserialize()?)
}

/// Load configuration from file and environment.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    with_environment(Config::builder().add_source(File::from(path).required(true)))
}

/// Load configuration from TOML text and environment.
pub fn parse_config(toml: &str) -> Result<AppConfig, ConfigError> {
    with_environment(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
}
