//! Core data types.

mod features;
mod ohlcv;
mod order;
mod position;
mod signal;
mod timeframe;

pub use features::{FeatureMap, SignalFrame};
pub use ohlcv::{Bar, BarSeries};
pub use order::{ExchangePosition, Order, OrderRequest, OrderStatus, Side};
pub use position::{ExitReason, PositionBook, PositionType, RiskParams};
pub use signal::SignalType;
pub use timeframe::Timeframe;
