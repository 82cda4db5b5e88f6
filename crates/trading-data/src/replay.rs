//! Bar-by-bar replay of a loaded series.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use trading_core::error::DataError;
use trading_core::traits::MarketDataProvider;
use trading_core::types::{Bar, BarSeries, Timeframe};

use crate::csv_source::slice_range;

/// Serves a series as if it were arriving live.
///
/// Only the first `cursor` bars are visible; [`advance`](ReplayFeed::advance) reveals one
/// more. Queries never see bars past the cursor.
#[derive(Debug)]
pub struct ReplayFeed {
    series: BarSeries,
    cursor: AtomicUsize,
}

impl ReplayFeed {
    /// Start with the first `visible` bars revealed (at least one).
    pub fn new(series: BarSeries, visible: usize) -> Self {
        let cursor = visible.clamp(1, series.len().max(1));
        Self {
            series,
            cursor: AtomicUsize::new(cursor),
        }
    }

    /// Reveal the next bar. Returns it, or `None` once the series is exhausted.
    pub fn advance(&self) -> Option<Bar> {
        let next = self
            .cursor
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| {
                (c < self.series.len()).then_some(c + 1)
            })
            .ok()?;
        self.series.get(next).copied()
    }

    /// Number of bars revealed so far.
    pub fn position(&self) -> usize {
        self.cursor.load(Ordering::SeqCst).min(self.series.len())
    }

    pub fn remaining(&self) -> usize {
        self.series.len() - self.position()
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Most recently revealed bar.
    pub fn current(&self) -> Option<&Bar> {
        self.position().checked_sub(1).and_then(|i| self.series.get(i))
    }

    /// Revealed bars.
    pub fn visible(&self) -> BarSeries {
        BarSeries::from_bars(
            self.series.symbol.clone(),
            self.series.timeframe,
            self.series.bars()[..self.position()].to_vec(),
        )
    }

    fn check_request(&self, symbol: &str, timeframe: Timeframe) -> Result<(), DataError> {
        if symbol != self.series.symbol {
            return Err(DataError::SymbolNotFound(symbol.to_string()));
        }
        if timeframe != self.series.timeframe {
            return Err(DataError::InvalidTimeframe(timeframe.to_string()));
        }
        if self.series.is_empty() {
            return Err(DataError::NoDataAvailable);
        }
        Ok(())
    }
}

#[async_trait]
impl MarketDataProvider for ReplayFeed {
    async fn get_historical_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BarSeries, DataError> {
        self.check_request(symbol, timeframe)?;
        slice_range(&self.visible(), start, end)
    }

    async fn get_recent_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<BarSeries, DataError> {
        self.check_request(symbol, timeframe)?;
        let end = self.position();
        let start = end.saturating_sub(limit);
        Ok(BarSeries::from_bars(
            self.series.symbol.clone(),
            self.series.timeframe,
            self.series.bars()[start..end].to_vec(),
        ))
    }

    fn name(&self) -> &str {
        "replay"
    }
}
