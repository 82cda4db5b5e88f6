//! In-memory execution client for paper trading.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use trading_core::error::ExecutionError;
use trading_core::traits::ExecutionClient;
use trading_core::types::{ExchangePosition, Order, OrderRequest, OrderStatus, PositionType, Side};
use uuid::Uuid;

/// Paper account settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperConfig {
    pub initial_balance: f64,
    pub commission_rate: f64,
    pub slippage_rate: f64,
    /// Quantity increment; quantities are rounded down to a multiple of it
    pub step_size: f64,
    /// Smallest tradable quantity; anything below becomes 0
    pub min_quantity: f64,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            initial_balance: 10_000.0,
            commission_rate: 0.001,
            slippage_rate: 0.0005,
            step_size: 0.001,
            min_quantity: 0.001,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Holding {
    position_type: PositionType,
    quantity: f64,
    entry_price: f64,
}

#[derive(Debug, Default)]
struct Account {
    balance: f64,
    marks: HashMap<String, f64>,
    positions: HashMap<String, Holding>,
    orders: HashMap<Uuid, Order>,
}

/// Fills market orders immediately at the marked price.
///
/// Buys fill at `mark × (1 + slippage)` and sells at `mark × (1 − slippage)`; commission
/// is charged on the filled notional. Cash moves like a spot account: buys debit,
/// sells credit. One net position is kept per symbol.
#[derive(Debug)]
pub struct PaperClient {
    config: PaperConfig,
    account: Mutex<Account>,
}

impl PaperClient {
    pub fn new(config: PaperConfig) -> Self {
        Self {
            account: Mutex::new(Account {
                balance: config.initial_balance,
                ..Default::default()
            }),
            config,
        }
    }

    pub fn config(&self) -> &PaperConfig {
        &self.config
    }

    fn account(&self) -> MutexGuard<'_, Account> {
        self.account.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set the price the next orders for `symbol` fill against.
    pub fn set_mark(&self, symbol: &str, price: f64) {
        self.account().marks.insert(symbol.to_string(), price);
    }

    pub fn mark(&self, symbol: &str) -> Option<f64> {
        self.account().marks.get(symbol).copied()
    }

    pub fn balance(&self) -> f64 {
        self.account().balance
    }

    /// Balance plus open positions valued at their marks.
    pub fn equity(&self) -> f64 {
        let account = self.account();
        let held: f64 = account
            .positions
            .iter()
            .map(|(symbol, h)| {
                let mark = account.marks.get(symbol).copied().unwrap_or(h.entry_price);
                h.position_type.sign() * h.quantity * mark
            })
            .sum();
        account.balance + held
    }

    pub fn order(&self, id: Uuid) -> Result<Order, ExecutionError> {
        self.account()
            .orders
            .get(&id)
            .cloned()
            .ok_or_else(|| ExecutionError::OrderNotFound(id.to_string()))
    }

    /// All orders, oldest first.
    pub fn orders(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self.account().orders.values().cloned().collect();
        orders.sort_by_key(|o| o.created_at);
        orders
    }

    fn fill_price(&self, side: Side, mark: f64) -> f64 {
        match side {
            Side::Buy => mark * (1.0 + self.config.slippage_rate),
            Side::Sell => mark * (1.0 - self.config.slippage_rate),
        }
    }
}

impl Default for PaperClient {
    fn default() -> Self {
        Self::new(PaperConfig::default())
    }
}

/// Apply a fill of `quantity` on `side` to an optional net holding.
fn apply_fill(holding: Option<Holding>, side: Side, quantity: f64, price: f64) -> Option<Holding> {
    let signed = |pt: PositionType, q: f64| pt.sign() * q;
    let current = holding.map_or(0.0, |h| signed(h.position_type, h.quantity));
    let delta = match side {
        Side::Buy => quantity,
        Side::Sell => -quantity,
    };
    let next = current + delta;

    if next.abs() < f64::EPSILON * quantity.max(1.0) {
        return None;
    }
    let position_type = if next > 0.0 {
        PositionType::Long
    } else {
        PositionType::Short
    };

    let entry_price = match holding {
        // Same direction: weighted average entry
        Some(h) if h.position_type == position_type && current.abs() < next.abs() => {
            (h.entry_price * h.quantity + price * quantity) / next.abs()
        }
        // Reduced: entry unchanged
        Some(h) if h.position_type == position_type => h.entry_price,
        // Opened or flipped: remainder enters at the fill
        _ => price,
    };

    Some(Holding {
        position_type,
        quantity: next.abs(),
        entry_price,
    })
}

#[async_trait]
impl ExecutionClient for PaperClient {
    async fn place_market_order(&self, request: OrderRequest) -> Result<Order, ExecutionError> {
        if !(request.quantity > 0.0) {
            return Err(ExecutionError::OrderRejected(format!(
                "quantity must be positive, got {}",
                request.quantity
            )));
        }

        let mut account = self.account();
        let mark = account
            .marks
            .get(&request.symbol)
            .copied()
            .ok_or_else(|| ExecutionError::NoMarketPrice(request.symbol.clone()))?;

        let holding = account.positions.get(&request.symbol).copied();
        let mut quantity = request.quantity;
        if request.reduce_only {
            match holding {
                Some(h) if Side::opening(h.position_type) == Some(request.side.opposite()) => {
                    quantity = quantity.min(h.quantity);
                }
                _ => {
                    return Err(ExecutionError::OrderRejected(format!(
                        "reduce-only {} order has no {} position to reduce",
                        request.side, request.symbol
                    )));
                }
            }
        }

        let price = self.fill_price(request.side, mark);
        let notional = quantity * price;
        let commission = notional * self.config.commission_rate;

        if request.side == Side::Buy && notional + commission > account.balance {
            return Err(ExecutionError::InsufficientFunds {
                required: notional + commission,
                available: account.balance,
            });
        }

        match request.side {
            Side::Buy => account.balance -= notional + commission,
            Side::Sell => account.balance += notional - commission,
        }
        match apply_fill(holding, request.side, quantity, price) {
            Some(h) => account.positions.insert(request.symbol.clone(), h),
            None => account.positions.remove(&request.symbol),
        };

        let mut order = Order::from_request(&request);
        order.quantity = quantity;
        order.status = OrderStatus::Filled;
        order.fill_price = Some(price);
        order.commission = commission;
        account.orders.insert(order.id, order.clone());

        info!(
            order_id = %order.id,
            symbol = %order.symbol,
            side = %order.side,
            quantity,
            price,
            commission,
            balance = account.balance,
            "Paper order filled"
        );

        Ok(order)
    }

    async fn get_position(&self, symbol: &str) -> Result<Option<ExchangePosition>, ExecutionError> {
        let account = self.account();
        Ok(account.positions.get(symbol).map(|h| {
            let mark = account.marks.get(symbol).copied().unwrap_or(h.entry_price);
            ExchangePosition {
                symbol: symbol.to_string(),
                position_type: h.position_type,
                quantity: h.quantity,
                entry_price: h.entry_price,
                unrealized_pnl: h.position_type.sign() * (mark - h.entry_price) * h.quantity,
            }
        }))
    }

    async fn get_balance(&self) -> Result<f64, ExecutionError> {
        Ok(self.balance())
    }

    fn adjust_quantity(&self, symbol: &str, quantity: f64) -> f64 {
        let step = self.config.step_size;
        let adjusted = if step > 0.0 {
            let decimals = (-step.log10()).ceil().max(0.0) as i32;
            let factor = 10f64.powi(decimals);
            // nudge before flooring so 0.3 / 0.1 does not land on 2.999…
            let steps = (quantity / step + 1e-9).floor();
            (steps * step * factor).round() / factor
        } else {
            quantity
        };

        if adjusted < self.config.min_quantity || adjusted <= 0.0 {
            debug!(symbol, quantity, adjusted, "Quantity below minimum");
            return 0.0;
        }
        adjusted
    }

    fn name(&self) -> &str {
        "paper"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> PaperClient {
        let client = PaperClient::new(PaperConfig {
            initial_balance: 10_000.0,
            commission_rate: 0.001,
            slippage_rate: 0.0,
            step_size: 0.01,
            min_quantity: 0.05,
        });
        client.set_mark("BTCUSDT", 100.0);
        client
    }

    #[tokio::test]
    async fn test_buy_then_close() {
        let client = client();

        let order = client
            .place_market_order(OrderRequest::market("BTCUSDT", Side::Buy, 10.0))
            .await
            .unwrap();
        assert!(order.is_filled());
        assert_eq!(order.fill_price, Some(100.0));
        assert!((client.balance() - (10_000.0 - 1_000.0 - 1.0)).abs() < 1e-9);

        let position = client.get_position("BTCUSDT").await.unwrap().unwrap();
        assert_eq!(position.position_type, PositionType::Long);
        assert_eq!(position.quantity, 10.0);

        client.set_mark("BTCUSDT", 110.0);
        let position = client.get_position("BTCUSDT").await.unwrap().unwrap();
        assert!((position.unrealized_pnl - 100.0).abs() < 1e-9);

        client
            .place_market_order(OrderRequest::close("BTCUSDT", Side::Sell, 10.0))
            .await
            .unwrap();
        assert!(client.get_position("BTCUSDT").await.unwrap().is_none());
        assert!((client.balance() - (8_999.0 + 1_100.0 - 1.1)).abs() < 1e-9);
        assert_eq!(client.orders().len(), 2);
    }

    #[tokio::test]
    async fn test_adding_averages_entry() {
        let client = client();
        client
            .place_market_order(OrderRequest::market("BTCUSDT", Side::Buy, 1.0))
            .await
            .unwrap();
        client.set_mark("BTCUSDT", 90.0);
        client
            .place_market_order(OrderRequest::market("BTCUSDT", Side::Buy, 1.0))
            .await
            .unwrap();

        let position = client.get_position("BTCUSDT").await.unwrap().unwrap();
        assert_eq!(position.quantity, 2.0);
        assert!((position.entry_price - 95.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_short_and_slippage() {
        let client = PaperClient::default();
        client.set_mark("ETHUSDT", 2_000.0);

        let order = client
            .place_market_order(OrderRequest::market("ETHUSDT", Side::Sell, 1.0))
            .await
            .unwrap();
        assert!((order.fill_price.unwrap() - 1_999.0).abs() < 1e-9);

        let position = client.get_position("ETHUSDT").await.unwrap().unwrap();
        assert_eq!(position.position_type, PositionType::Short);
    }

    #[tokio::test]
    async fn test_rejections() {
        let client = client();

        assert!(matches!(
            client
                .place_market_order(OrderRequest::market("ETHUSDT", Side::Buy, 1.0))
                .await,
            Err(ExecutionError::NoMarketPrice(_))
        ));
        assert!(matches!(
            client
                .place_market_order(OrderRequest::market("BTCUSDT", Side::Buy, 1_000.0))
                .await,
            Err(ExecutionError::InsufficientFunds { .. })
        ));
        assert!(matches!(
            client
                .place_market_order(OrderRequest::close("BTCUSDT", Side::Sell, 1.0))
                .await,
            Err(ExecutionError::OrderRejected(_))
        ));
        assert!(matches!(
            client
                .place_market_order(OrderRequest::market("BTCUSDT", Side::Buy, 0.0))
                .await,
            Err(ExecutionError::OrderRejected(_))
        ));
        assert!(client.orders().is_empty());
        assert_eq!(client.balance(), 10_000.0);
    }

    #[test]
    fn test_adjust_quantity() {
        let client = client();
        assert_eq!(client.adjust_quantity("BTCUSDT", 1.239), 1.23);
        assert_eq!(client.adjust_quantity("BTCUSDT", 0.3), 0.3);
        assert_eq!(client.adjust_quantity("BTCUSDT", 0.049), 0.0);
        assert_eq!(client.adjust_quantity("BTCUSDT", -1.0), 0.0);
    }

    #[test]
    fn test_flip_enters_remainder_at_fill() {
        let long = Some(Holding {
            position_type: PositionType::Long,
            quantity: 1.0,
            entry_price: 100.0,
        });
        let flipped = apply_fill(long, Side::Sell, 3.0, 120.0).unwrap();
        assert_eq!(flipped.position_type, PositionType::Short);
        assert_eq!(flipped.quantity, 2.0);
        assert_eq!(flipped.entry_price, 120.0);

        let reduced = apply_fill(long, Side::Sell, 0.5, 120.0).unwrap();
        assert_eq!(reduced.entry_price, 100.0);
        assert!(apply_fill(long, Side::Sell, 1.0, 120.0).is_none());
    }
}
