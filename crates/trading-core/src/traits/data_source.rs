//! Market data provider trait.

use crate::error::DataError;
use crate::types::{BarSeries, Timeframe};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Source of validated bar series.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch bars in `[start, end]`, ordered from oldest to newest.
    async fn get_historical_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BarSeries, DataError>;

    /// Fetch the most recent `limit` bars.
    async fn get_recent_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<BarSeries, DataError>;

    /// Get the data source name.
    fn name(&self) -> &str;
}
