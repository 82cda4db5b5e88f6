//! CLI command implementations.

pub mod backtest;
pub mod paper;
pub mod strategies;
pub mod validate;

use anyhow::{Context, Result};
use serde_json::Value;
use trading_config::AppConfig;
use trading_core::traits::Strategy;
use trading_core::events::TracingSink;
use trading_strategies::StrategyRegistry;

use crate::cli::MarketArgs;

/// Fold command-line overrides into the loaded configuration and validate the result.
pub fn resolve_config(config: &AppConfig, args: &MarketArgs) -> Result<AppConfig> {
    let mut config = config.clone();

    if let Some(strategy) = &args.strategy {
        config.strategy.name = strategy.clone();
    }
    if let Some(params) = &args.params {
        config.strategy.params =
            serde_json::from_str::<Value>(params).context("--params is not valid JSON")?;
    }
    if let Some(data) = &args.data {
        config.backtest.data_file = Some(data.clone());
    }
    if let Some(symbol) = &args.symbol {
        config.trading.symbol = symbol.clone();
    }
    if let Some(timeframe) = &args.timeframe {
        config.trading.interval = timeframe.clone();
    }
    if let Some(capital) = args.capital {
        config.trading.initial_capital = capital;
    }
    if let Some(commission) = args.commission {
        config.backtest.commission = commission;
    }
    if let Some(slippage) = args.slippage {
        config.backtest.slippage = slippage;
    }

    config.validate()?;
    Ok(config)
}

/// Build the configured strategy from the registry.
pub fn create_strategy(config: &AppConfig) -> Result<Box<dyn Strategy>> {
    StrategyRegistry::new()
        .create(
            &config.strategy.name,
            config.strategy.params.clone(),
            TracingSink::shared(),
        )
        .with_context(|| format!("Failed to create strategy '{}'", config.strategy.name))
}
