//! Configuration structures.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use trading_backtest::RunConfig;
use trading_broker::{LiveConfig, PaperConfig};
use trading_core::types::Timeframe;

use crate::ConfigError;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub trading: TradingSettings,
    #[serde(default)]
    pub backtest: BacktestSettings,
    #[serde(default)]
    pub strategy: StrategySettings,
    #[serde(default)]
    pub live: LiveSettings,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    pub level: String,
    pub format: LogFormat,
    /// Also write logs to this file, rolled daily
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

/// Market and account settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingSettings {
    pub symbol: String,
    /// Bar interval in kline notation (`1m`, `1h`, `1d`, ...)
    pub interval: String,
    pub initial_capital: f64,
    /// Fraction of capital committed per entry
    pub max_position_size: f64,
    pub leverage: f64,
}

impl Default for TradingSettings {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            interval: "1h".to_string(),
            initial_capital: 10_000.0,
            max_position_size: 0.5,
            leverage: 1.0,
        }
    }
}

/// Backtest settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    pub commission: f64,
    pub slippage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_file: Option<PathBuf>,
    /// Inclusive, `YYYY-MM-DD`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            commission: 0.001,
            slippage: 0.0005,
            data_file: None,
            start_date: None,
            end_date: None,
        }
    }
}

/// Strategy selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySettings {
    /// Registry identifier
    pub name: String,
    /// Parameters passed to the strategy constructor; missing keys take defaults
    #[serde(skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            name: "ma_crossover".to_string(),
            params: Value::Null,
        }
    }
}

/// Live polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveSettings {
    pub check_interval_secs: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    /// Bars fetched per poll
    pub window: usize,
    pub step_size: f64,
    pub min_quantity: f64,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            check_interval_secs: 60,
            max_retries: 3,
            retry_delay_ms: 1_000,
            window: 200,
            step_size: 0.001,
            min_quantity: 0.001,
        }
    }
}

fn invalid(message: impl Into<String>) -> Result<(), ConfigError> {
    Err(ConfigError::Invalid(message.into()))
}

impl AppConfig {
    /// Check every section; the first problem found is returned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return invalid(format!("logging.level '{}' is not a log level", self.logging.level));
        }

        let trading = &self.trading;
        if trading.symbol.trim().is_empty() {
            return invalid("trading.symbol must not be empty");
        }
        self.timeframe()?;
        if !(trading.initial_capital > 0.0) {
            return invalid("trading.initial_capital must be positive");
        }
        if !(trading.max_position_size > 0.0 && trading.max_position_size <= 1.0) {
            return invalid("trading.max_position_size must be in (0, 1]");
        }
        if !(trading.leverage >= 1.0) {
            return invalid("trading.leverage must be at least 1");
        }

        let backtest = &self.backtest;
        if !(backtest.commission >= 0.0) {
            return invalid("backtest.commission must not be negative");
        }
        if !(backtest.slippage >= 0.0 && backtest.slippage < 1.0) {
            return invalid("backtest.slippage must be in [0, 1)");
        }
        for (key, date) in [("start_date", &backtest.start_date), ("end_date", &backtest.end_date)] {
            if let Some(date) = date {
                if chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
                    return invalid(format!("backtest.{key} '{date}' is not YYYY-MM-DD"));
                }
            }
        }

        if self.strategy.name.trim().is_empty() {
            return invalid("strategy.name must not be empty");
        }
        if !(self.strategy.params.is_null() || self.strategy.params.is_object()) {
            return invalid("strategy.params must be a table");
        }

        let live = &self.live;
        if live.window == 0 {
            return invalid("live.window must be positive");
        }
        if live.check_interval_secs == 0 {
            return invalid("live.check_interval_secs must be positive");
        }
        if live.max_retries == 0 {
            return invalid("live.max_retries must be positive");
        }
        if !(live.step_size >= 0.0 && live.min_quantity >= 0.0) {
            return invalid("live.step_size and live.min_quantity must not be negative");
        }

        Ok(())
    }

    /// Parsed `trading.interval`.
    pub fn timeframe(&self) -> Result<Timeframe, ConfigError> {
        Timeframe::from_str(&self.trading.interval)
            .map_err(|_| ConfigError::Invalid(format!("trading.interval '{}' is not a known interval", self.trading.interval)))
    }

    /// Backtest engine settings.
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            initial_capital: self.trading.initial_capital,
            commission_rate: self.backtest.commission,
            slippage_rate: self.backtest.slippage,
            max_position_size: self.trading.max_position_size,
        }
    }

    /// Live driver settings.
    pub fn live_config(&self) -> Result<LiveConfig, ConfigError> {
        Ok(LiveConfig {
            symbol: self.trading.symbol.clone(),
            timeframe: self.timeframe()?,
            window: self.live.window,
            check_interval: Duration::from_secs(self.live.check_interval_secs),
            max_retries: self.live.max_retries,
            retry_delay: Duration::from_millis(self.live.retry_delay_ms),
        })
    }

    /// Paper account settings.
    pub fn paper_config(&self) -> PaperConfig {
        PaperConfig {
            initial_balance: self.trading.initial_capital,
            commission_rate: self.backtest.commission,
            slippage_rate: self.backtest.slippage,
            step_size: self.live.step_size,
            min_quantity: self.live.min_quantity,
        }
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}
