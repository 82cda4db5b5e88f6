//! Error types for the framework.

use thiserror::Error;

/// Top-level error.
#[derive(Error, Debug)]
pub enum TradingError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Indicator error: {0}")]
    Indicator(#[from] IndicatorError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Strategy-specific errors.
#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Strategy not found: {0}")]
    NotFound(String),

    #[error("Feature column '{name}' has {actual} values, series has {expected}")]
    MisalignedFeature {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Missing feature column: {0}")]
    MissingFeature(String),

    #[error("Bar index {index} out of range for series of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Indicator(#[from] IndicatorError),

    #[error("Strategy error: {0}")]
    Internal(String),
}

/// Order execution errors.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Order rejected: {0}")]
    OrderRejected(String),

    #[error("Insufficient funds: required {required:.2}, available {available:.2}")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("No market price available for {0}")]
    NoMarketPrice(String),

    #[error("Position not found: {0}")]
    PositionNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Execution client error: {0}")]
    Internal(String),
}

/// Data source errors.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("No data available for the requested range")]
    NoDataAvailable,

    #[error("Invalid timeframe: {0}")]
    InvalidTimeframe(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: String },

    #[error("Data source error: {0}")]
    Internal(String),
}

/// Indicator calculation errors.
#[derive(Error, Debug)]
pub enum IndicatorError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Input length mismatch: {0}")]
    LengthMismatch(String),
}

/// Result type alias for framework operations.
pub type TradingResult<T> = Result<T, TradingError>;
