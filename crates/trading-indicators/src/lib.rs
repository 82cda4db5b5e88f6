//! Technical indicators.
//!
//! Every indicator returns one value per input position, with NaN during warm-up:
//! - Moving averages (SMA, EMA)
//! - Momentum indicators (RSI, MACD, Stochastic, percent change)
//! - Volatility indicators (standard deviation, ATR, Bollinger Bands)
//! - Trend strength (ADX) and volume measures (OBV, VWAP)
//! - Rolling extremes and crossover helpers for building signal columns
//!
//! [`IndicatorCache`] memoizes computed columns per series snapshot.

pub mod cache;
pub mod momentum;
pub mod moving_average;
pub mod rolling;
pub mod signals;
pub mod trend;
pub mod volatility;
pub mod volume;

pub use cache::{IndicatorCache, IndicatorKey};
pub use momentum::{Macd, MacdSeries, PercentChange, Rsi, Stochastic, StochasticSeries};
pub use moving_average::{Ema, Sma};
pub use rolling::{RollingMax, RollingMin};
pub use trend::Adx;
pub use volatility::{Atr, BollingerBands, BollingerSeries, StdDev};
pub use volume::{Obv, Vwap};
