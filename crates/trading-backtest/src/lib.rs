//! Backtesting engine.
//!
//! Replays a bar series through a [`Strategy`](trading_core::traits::Strategy) with
//! slippage and commission, records closed trades and the per-bar equity curve, and
//! derives performance metrics from them.

mod cost;
mod engine;
mod error;
mod report;
mod statistics;

pub use cost::{CostModel, Fill};
pub use engine::{BacktestEngine, RunConfig};
pub use error::BacktestError;
pub use report::BacktestReport;
pub use statistics::{
    drawdowns, max_drawdown, returns, sharpe_ratio, EquitySnapshot, PerformanceMetrics, TradeRecord,
    TRADING_DAYS_PER_YEAR,
};
