//! Core traits.

mod data_source;
mod execution;
mod indicator;
mod strategy;

pub use data_source::MarketDataProvider;
pub use execution::ExecutionClient;
pub use indicator::{Indicator, MultiOutputIndicator, OhlcvIndicator};
pub use strategy::{Strategy, StrategyConfig, StrategyState};
