//! Polled trading signals.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Action a strategy recommends for the most recent bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalType {
    /// Open a long position
    Buy,
    /// Open a short position
    Sell,
    CloseLong,
    CloseShort,
    /// Add a second leg to an open long
    AddLong,
    #[default]
    Hold,
}

impl SignalType {
    pub fn is_actionable(&self) -> bool {
        !matches!(self, SignalType::Hold)
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalType::Buy => "BUY",
            SignalType::Sell => "SELL",
            SignalType::CloseLong => "CLOSE_LONG",
            SignalType::CloseShort => "CLOSE_SHORT",
            SignalType::AddLong => "ADD_LONG",
            SignalType::Hold => "HOLD",
        };
        f.write_str(s)
    }
}
