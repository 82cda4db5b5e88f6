//! Order types used by execution clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PositionType;

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Get the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Side that opens a position of the given type.
    pub fn opening(position: PositionType) -> Option<Self> {
        match position {
            PositionType::Long => Some(Side::Buy),
            PositionType::Short => Some(Side::Sell),
            PositionType::Flat => None,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Submitted,
    Filled,
    Rejected,
}

/// Market order request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    /// Quantity in base-asset units
    pub quantity: f64,
    /// Only reduce an existing position, never open or flip one
    pub reduce_only: bool,
}

impl OrderRequest {
    /// Create a market order request.
    pub fn market(symbol: impl Into<String>, side: Side, quantity: f64) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            quantity,
            reduce_only: false,
        }
    }

    /// Create a market order that closes (part of) a position.
    pub fn close(symbol: impl Into<String>, side: Side, quantity: f64) -> Self {
        Self {
            reduce_only: true,
            ..Self::market(symbol, side, quantity)
        }
    }
}

/// An order acknowledged by an execution client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub status: OrderStatus,
    /// Average fill price once filled
    pub fill_price: Option<f64>,
    pub commission: f64,
    pub reduce_only: bool,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Create a submitted order from a request.
    pub fn from_request(request: &OrderRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: request.symbol.clone(),
            side: request.side,
            quantity: request.quantity,
            status: OrderStatus::Submitted,
            fill_price: None,
            commission: 0.0,
            reduce_only: request.reduce_only,
            created_at: Utc::now(),
        }
    }

    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Filled
    }
}

/// A position as reported by an execution client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangePosition {
    pub symbol: String,
    pub position_type: PositionType,
    /// Absolute quantity
    pub quantity: f64,
    pub entry_price: f64,
    pub unrealized_pnl: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_helpers() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::opening(PositionType::Short), Some(Side::Sell));
        assert_eq!(Side::opening(PositionType::Flat), None);
    }

    #[test]
    fn test_close_request_is_reduce_only() {
        let request = OrderRequest::close("ETHUSDT", Side::Sell, 1.5);
        assert!(request.reduce_only);
        let order = Order::from_request(&request);
        assert_eq!(order.status, OrderStatus::Submitted);
        assert!(!order.is_filled());
    }
}
