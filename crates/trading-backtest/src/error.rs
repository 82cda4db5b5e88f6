//! Backtest errors.

use thiserror::Error;
use trading_core::error::{DataError, StrategyError};

#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("Invalid run configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input series: {0}")]
    Data(#[from] DataError),

    #[error("Strategy '{strategy}' failed to compute signals: {source}")]
    Signals {
        strategy: String,
        #[source]
        source: StrategyError,
    },

    #[error("Strategy '{strategy}' failed at bar {index} (timestamp {timestamp}): {source}")]
    Evaluation {
        strategy: String,
        index: usize,
        timestamp: i64,
        #[source]
        source: StrategyError,
    },

    #[error("Report export failed: {0}")]
    Export(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
