//! Execution client trait.

use crate::error::ExecutionError;
use crate::types::{ExchangePosition, Order, OrderRequest};
use async_trait::async_trait;

/// Order placement and account queries for the live polling driver.
#[async_trait]
pub trait ExecutionClient: Send + Sync {
    /// Submit a market order.
    ///
    /// # Returns
    /// The order as acknowledged, filled when the venue executes synchronously
    async fn place_market_order(&self, request: OrderRequest) -> Result<Order, ExecutionError>;

    /// Open position for `symbol`, if any.
    async fn get_position(&self, symbol: &str) -> Result<Option<ExchangePosition>, ExecutionError>;

    /// Balance available for new positions.
    async fn get_balance(&self) -> Result<f64, ExecutionError>;

    /// Round `quantity` to the venue's precision for `symbol`; 0 when below the minimum.
    fn adjust_quantity(&self, symbol: &str, quantity: f64) -> f64;

    /// Get the client name.
    fn name(&self) -> &str;
}
