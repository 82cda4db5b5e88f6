//! Trading strategy implementations.
//!
//! Every strategy computes named indicator columns once per run and answers per-bar
//! entry and exit questions against them:
//! - Moving Average Crossover
//! - RSI thresholds with optional divergence
//! - Bollinger Bands (mean reversion or squeeze breakout)
//! - MACD crossings
//! - Grid trading
//! - Breakout pullback
//! - Momentum dip buying with a second leg
//!
//! [`StrategyRegistry`] builds any of them by identifier from JSON parameters.

mod bollinger_bands;
mod breakout_pullback;
mod common;
mod grid_trading;
mod ma_crossover;
mod macd;
mod momentum_dip;
mod registry;
mod rsi_strategy;

pub use bollinger_bands::{BandMode, BollingerConfig, BollingerStrategy};
pub use breakout_pullback::{BreakoutPullbackConfig, BreakoutPullbackStrategy};
pub use grid_trading::{GridConfig, GridMode, GridTradingStrategy};
pub use ma_crossover::{MACrossoverConfig, MACrossoverStrategy};
pub use macd::{MacdConfig, MacdStrategy};
pub use momentum_dip::{MomentumDipConfig, MomentumDipStrategy};
pub use registry::{StrategyConstructor, StrategyInfo, StrategyRegistry};
pub use rsi_strategy::{RsiConfig, RsiStrategy};
