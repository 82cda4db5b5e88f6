//! Core types and traits for the backtesting framework.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Bar, BarSeries) and the named feature map strategies produce
//! - Position bookkeeping, order and signal types
//! - The structured event sink used by the engine, strategies and live driver
//! - Core traits for strategies, indicators, market data and order execution

pub mod error;
pub mod events;
pub mod traits;
pub mod types;

pub use error::{TradingError, TradingResult};
pub use events::{Event, EventSink, MemorySink, NullSink, SharedSink, TracingSink};
pub use traits::*;
pub use types::*;
