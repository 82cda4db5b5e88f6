//! OHLCV (Open, High, Low, Close, Volume) data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Timeframe;
use crate::error::DataError;

/// A single OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Bar {
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Create a new bar.
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Typical price (HLC average).
    #[inline]
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// Bar range (high - low).
    #[inline]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Get the timestamp as a DateTime.
    pub fn datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp).unwrap_or_default()
    }

    /// True range against the previous close; the first bar uses its own range.
    pub fn true_range(&self, prev_close: Option<f64>) -> f64 {
        match prev_close {
            Some(pc) => {
                let hl = self.high - self.low;
                let hc = (self.high - pc).abs();
                let lc = (self.low - pc).abs();
                hl.max(hc).max(lc)
            }
            None => self.high - self.low,
        }
    }

    fn check(&self, index: usize) -> Result<(), DataError> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Err(DataError::InvalidBar {
                index,
                reason: "prices must be positive and finite".into(),
            });
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(DataError::InvalidBar {
                index,
                reason: "volume must be non-negative".into(),
            });
        }
        Ok(())
    }
}

/// Ordered bars for one instrument.
///
/// Indexing is positional (0 = oldest).
#[derive(Debug, Clone)]
pub struct BarSeries {
    pub symbol: String,
    pub timeframe: Timeframe,
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Create a new empty bar series.
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            bars: Vec::new(),
        }
    }

    /// Build a series from bars already in chronological order.
    pub fn from_bars(symbol: impl Into<String>, timeframe: Timeframe, bars: Vec<Bar>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            bars,
        }
    }

    /// Append a bar; ordering is checked by [`validate`](BarSeries::validate).
    pub fn push(&mut self, bar: Bar) {
        self.bars.push(bar);
    }

    /// Push multiple bars.
    pub fn extend(&mut self, bars: impl IntoIterator<Item = Bar>) {
        for bar in bars {
            self.push(bar);
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// All bars as a slice.
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Get a bar by index (0 = oldest).
    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// The most recent `n` bars as a new series.
    pub fn tail(&self, n: usize) -> BarSeries {
        let start = self.bars.len().saturating_sub(n);
        BarSeries::from_bars(self.symbol.clone(), self.timeframe, self.bars[start..].to_vec())
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn opens(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.open).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    pub fn typical_prices(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.typical_price()).collect()
    }

    /// Check the series invariants: non-empty, strictly increasing timestamps,
    /// positive prices and non-negative volume.
    pub fn validate(&self) -> Result<(), DataError> {
        if self.bars.is_empty() {
            return Err(DataError::NoDataAvailable);
        }
        for (i, bar) in self.bars.iter().enumerate() {
            bar.check(i)?;
            if i > 0 && bar.timestamp <= self.bars[i - 1].timestamp {
                return Err(DataError::InvalidBar {
                    index: i,
                    reason: format!(
                        "timestamp {} does not follow {}",
                        bar.timestamp,
                        self.bars[i - 1].timestamp
                    ),
                });
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bar> {
        self.bars.iter()
    }
}

impl FromIterator<Bar> for BarSeries {
    fn from_iter<T: IntoIterator<Item = Bar>>(iter: T) -> Self {
        Self::from_bars(String::new(), Timeframe::default(), iter.into_iter().collect())
    }
}
