//! Position state shared between the engine, the live driver and strategies.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::StrategyError;

/// Tri-state position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionType {
    #[default]
    Flat,
    Long,
    Short,
}

impl PositionType {
    pub fn is_flat(&self) -> bool {
        matches!(self, PositionType::Flat)
    }

    /// +1 for long, -1 for short, 0 when flat.
    pub fn sign(&self) -> f64 {
        match self {
            PositionType::Long => 1.0,
            PositionType::Short => -1.0,
            PositionType::Flat => 0.0,
        }
    }
}

impl fmt::Display for PositionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionType::Flat => write!(f, "FLAT"),
            PositionType::Long => write!(f, "LONG"),
            PositionType::Short => write!(f, "SHORT"),
        }
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    Signal,
    /// Forced liquidation at the end of a run
    Final,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::StopLoss => write!(f, "STOP_LOSS"),
            ExitReason::TakeProfit => write!(f, "TAKE_PROFIT"),
            ExitReason::Signal => write!(f, "SIGNAL"),
            ExitReason::Final => write!(f, "FINAL"),
        }
    }
}

/// Parameters every strategy carries: protective exits and default sizing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskParams {
    /// Fractional adverse move from entry that forces an exit
    pub stop_loss: f64,
    /// Fractional favourable move from entry that forces an exit
    pub take_profit: f64,
    /// Fraction of available capital committed per entry
    pub max_position_size: f64,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            stop_loss: 0.02,
            take_profit: 0.04,
            max_position_size: 0.5,
        }
    }
}

impl RiskParams {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.stop_loss <= 0.0 {
            return Err(StrategyError::InvalidConfig(
                "stop_loss must be positive".into(),
            ));
        }
        if self.take_profit <= 0.0 {
            return Err(StrategyError::InvalidConfig(
                "take_profit must be positive".into(),
            ));
        }
        if self.max_position_size <= 0.0 || self.max_position_size > 1.0 {
            return Err(StrategyError::InvalidConfig(
                "max_position_size must be in (0, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// A strategy's private record of the live position.
///
/// Mutated only through [`PositionBook::update`], which the strategy calls from
/// `on_position_changed`.
#[derive(Debug, Clone, Default)]
pub struct PositionBook {
    risk: RiskParams,
    position: PositionType,
    entry_price: f64,
    size: f64,
}

impl PositionBook {
    pub fn new(risk: RiskParams) -> Self {
        Self {
            risk,
            ..Default::default()
        }
    }

    /// Record a position change. Going flat zeroes entry price and size.
    pub fn update(&mut self, position: PositionType, price: f64, size: f64) {
        self.position = position;
        if position.is_flat() {
            self.entry_price = 0.0;
            self.size = 0.0;
        } else {
            self.entry_price = price;
            self.size = size;
        }
    }

    /// Back to flat; risk parameters are kept.
    pub fn clear(&mut self) {
        self.update(PositionType::Flat, 0.0, 0.0);
    }

    pub fn risk(&self) -> &RiskParams {
        &self.risk
    }

    pub fn position(&self) -> PositionType {
        self.position
    }

    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_flat()
    }

    /// Signed fractional move from entry in the position's favour.
    fn favourable_move(&self, price: f64) -> Option<f64> {
        if self.position.is_flat() || self.entry_price == 0.0 {
            return None;
        }
        Some(self.position.sign() * (price - self.entry_price) / self.entry_price)
    }

    pub fn stop_loss_hit(&self, price: f64) -> bool {
        self.favourable_move(price)
            .is_some_and(|mv| -mv >= self.risk.stop_loss)
    }

    pub fn take_profit_hit(&self, price: f64) -> bool {
        self.favourable_move(price)
            .is_some_and(|mv| mv >= self.risk.take_profit)
    }

    /// Quantity for `capital × max_position_size` at `price`.
    pub fn default_size(&self, capital: f64, price: f64) -> f64 {
        if price <= 0.0 {
            return 0.0;
        }
        capital * self.risk.max_position_size / price
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_at(price: f64) -> PositionBook {
        let mut book = PositionBook::new(RiskParams::default());
        book.update(PositionType::Long, price, 1.0);
        book
    }

    #[test]
    fn test_long_stop_and_target() {
        let book = long_at(100.0);
        assert!(!book.stop_loss_hit(98.5));
        assert!(book.stop_loss_hit(98.0));
        assert!(!book.take_profit_hit(103.9));
        assert!(book.take_profit_hit(104.0));
    }

    #[test]
    fn test_short_stop_and_target() {
        let mut book = PositionBook::new(RiskParams::default());
        book.update(PositionType::Short, 100.0, 2.0);
        assert!(book.stop_loss_hit(102.0));
        assert!(!book.stop_loss_hit(101.0));
        assert!(book.take_profit_hit(96.0));
        assert!(!book.take_profit_hit(97.0));
    }

    #[test]
    fn test_flat_book_never_triggers() {
        let mut book = long_at(100.0);
        book.clear();
        assert_eq!(book.entry_price(), 0.0);
        assert!(!book.stop_loss_hit(1.0));
        assert!(!book.take_profit_hit(1_000.0));
    }

    #[test]
    fn test_default_size() {
        let book = PositionBook::new(RiskParams::default());
        assert!((book.default_size(10_000.0, 100.0) - 50.0).abs() < 1e-12);
        assert_eq!(book.default_size(10_000.0, 0.0), 0.0);
    }

    #[test]
    fn test_risk_params_validation() {
        assert!(RiskParams::default().validate().is_ok());
        let bad = RiskParams {
            max_position_size: 1.5,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
