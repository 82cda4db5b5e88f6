//! Structured run events.
//!
//! The engine, strategies and the live driver report what they do through an injected
//! [`EventSink`] instead of a global logger. A sink lives for one run; tests use
//! [`MemorySink`] to assert on the emitted stream.

use serde::Serialize;
use std::sync::{Arc, Mutex};

use crate::types::{ExitReason, PositionType, Side};

/// Shared handle to a sink.
pub type SharedSink = Arc<dyn EventSink>;

/// Something worth recording during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    RunStarted {
        strategy: String,
        symbol: String,
        bars: usize,
        initial_capital: f64,
    },
    PositionOpened {
        index: usize,
        timestamp: i64,
        position_type: PositionType,
        price: f64,
        effective_price: f64,
        size: f64,
        commission: f64,
        capital: f64,
    },
    PositionClosed {
        index: usize,
        timestamp: i64,
        position_type: PositionType,
        price: f64,
        effective_price: f64,
        reason: ExitReason,
        pnl: f64,
        pnl_pct: f64,
        capital: f64,
    },
    /// An entry was wanted but its cost exceeded available capital
    EntrySkipped {
        index: usize,
        timestamp: i64,
        position_type: PositionType,
        required: f64,
        available: f64,
    },
    /// Stop-loss or take-profit fired
    ProtectiveExit {
        index: usize,
        reason: ExitReason,
        price: f64,
        entry_price: f64,
    },
    /// A strategy explaining a decision
    Signal {
        strategy: String,
        index: usize,
        message: String,
    },
    RunCompleted {
        strategy: String,
        total_trades: usize,
        final_capital: f64,
        total_return: f64,
    },
    OrderPlaced {
        symbol: String,
        side: Side,
        quantity: f64,
        fill_price: Option<f64>,
    },
    PollFailed {
        attempt: u32,
        error: String,
    },
}

/// Receiver of run events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &Event);
}

/// Forwards events to `tracing` with structured fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn shared() -> SharedSink {
        Arc::new(TracingSink)
    }
}

impl EventSink for TracingSink {
    fn emit(&self, event: &Event) {
        match event {
            Event::RunStarted {
                strategy,
                symbol,
                bars,
                initial_capital,
            } => tracing::info!(%strategy, %symbol, bars, initial_capital, "Backtest started"),
            Event::PositionOpened {
                index,
                timestamp,
                position_type,
                price,
                effective_price,
                size,
                commission,
                capital,
            } => tracing::info!(
                index,
                timestamp,
                side = %position_type,
                price,
                effective_price,
                size,
                commission,
                capital,
                "Opened position"
            ),
            Event::PositionClosed {
                index,
                timestamp,
                position_type,
                price,
                effective_price,
                reason,
                pnl,
                pnl_pct,
                capital,
            } => tracing::info!(
                index,
                timestamp,
                side = %position_type,
                price,
                effective_price,
                reason = %reason,
                pnl,
                pnl_pct,
                capital,
                "Closed position"
            ),
            Event::EntrySkipped {
                index,
                timestamp,
                position_type,
                required,
                available,
            } => tracing::warn!(
                index,
                timestamp,
                side = %position_type,
                required,
                available,
                "Insufficient capital, entry skipped"
            ),
            Event::ProtectiveExit {
                index,
                reason,
                price,
                entry_price,
            } => tracing::info!(index, reason = %reason, price, entry_price, "Protective exit triggered"),
            Event::Signal {
                strategy,
                index,
                message,
            } => tracing::debug!(%strategy, index, "{}", message),
            Event::RunCompleted {
                strategy,
                total_trades,
                final_capital,
                total_return,
            } => tracing::info!(
                %strategy,
                total_trades,
                final_capital,
                total_return,
                "Backtest completed"
            ),
            Event::OrderPlaced {
                symbol,
                side,
                quantity,
                fill_price,
            } => tracing::info!(%symbol, side = %side, quantity, ?fill_price, "Order placed"),
            Event::PollFailed { attempt, error } => {
                tracing::warn!(attempt, %error, "Market data poll failed")
            }
        }
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &Event) {}
}

/// Records events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Snapshot of everything emitted so far.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of recorded events matching `pred`.
    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events
            .lock()
            .map(|events| events.iter().filter(|e| pred(e)).count())
            .unwrap_or(0)
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        let shared: SharedSink = sink.clone();

        shared.emit(&Event::PollFailed {
            attempt: 1,
            error: "timeout".into(),
        });
        shared.emit(&Event::Signal {
            strategy: "rsi".into(),
            index: 4,
            message: "oversold bounce".into(),
        });

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Event::PollFailed { attempt: 1, .. }));
        assert_eq!(sink.count(|e| matches!(e, Event::Signal { .. })), 1);

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = Event::ProtectiveExit {
            index: 3,
            reason: ExitReason::StopLoss,
            price: 98.0,
            entry_price: 100.0,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "protective_exit");
        assert_eq!(json["reason"], "STOP_LOSS");
    }
}
