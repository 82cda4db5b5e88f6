//! Slippage and commission applied to simulated fills.

use serde::{Deserialize, Serialize};
use trading_core::types::Side;

/// Proportional slippage and commission.
///
/// Buys fill at `price × (1 + slippage)`, sells at `price × (1 − slippage)`. Commission
/// is charged on the filled notional.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    pub commission_rate: f64,
    pub slippage_rate: f64,
}

/// Result of pricing a fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub side: Side,
    pub effective_price: f64,
    pub size: f64,
    /// `size × effective_price`
    pub notional: f64,
    pub commission: f64,
}

impl Fill {
    /// Signed capital change: buys pay notional plus commission, sells receive notional
    /// minus commission.
    pub fn cash_flow(&self) -> f64 {
        match self.side {
            Side::Buy => -(self.notional + self.commission),
            Side::Sell => self.notional - self.commission,
        }
    }
}

impl CostModel {
    pub fn new(commission_rate: f64, slippage_rate: f64) -> Self {
        Self {
            commission_rate,
            slippage_rate,
        }
    }

    /// Frictionless fills.
    pub fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn effective_price(&self, side: Side, price: f64) -> f64 {
        match side {
            Side::Buy => price * (1.0 + self.slippage_rate),
            Side::Sell => price * (1.0 - self.slippage_rate),
        }
    }

    /// Price a fill of `size` units at the quoted `price`.
    pub fn fill(&self, side: Side, price: f64, size: f64) -> Fill {
        let effective_price = self.effective_price(side, price);
        let notional = size * effective_price;
        Fill {
            side,
            effective_price,
            size,
            notional,
            commission: notional * self.commission_rate,
        }
    }

    /// Price a fill committing `notional` of capital at the quoted `price`.
    pub fn fill_notional(&self, side: Side, price: f64, notional: f64) -> Fill {
        let effective_price = self.effective_price(side, price);
        let size = if effective_price > 0.0 {
            notional / effective_price
        } else {
            0.0
        };
        self.fill(side, price, size)
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self::new(0.001, 0.0005)
    }
}
