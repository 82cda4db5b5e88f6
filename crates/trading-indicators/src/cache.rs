//! Indicator column cache.

use std::collections::HashMap;
use trading_core::types::{Bar, BarSeries, Timeframe};

/// Identity of a computed column: formula, input column and parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndicatorKey {
    formula: &'static str,
    input: &'static str,
    params: Vec<u64>,
}

impl IndicatorKey {
    pub fn new(formula: &'static str, input: &'static str) -> Self {
        Self {
            formula,
            input,
            params: Vec::new(),
        }
    }

    /// Append an integer parameter.
    pub fn param(mut self, value: usize) -> Self {
        self.params.push(value as u64);
        self
    }

    /// Append a float parameter (compared bitwise).
    pub fn param_f64(mut self, value: f64) -> Self {
        self.params.push(value.to_bits());
        self
    }
}

/// Copy of the series the cached columns were computed from.
#[derive(Debug, Clone)]
struct Snapshot {
    symbol: String,
    timeframe: Timeframe,
    bars: Vec<Bar>,
}

impl Snapshot {
    fn of(series: &BarSeries) -> Self {
        Self {
            symbol: series.symbol.clone(),
            timeframe: series.timeframe,
            bars: series.bars().to_vec(),
        }
    }

    /// Every bar field compared bitwise.
    fn matches(&self, series: &BarSeries) -> bool {
        self.symbol == series.symbol
            && self.timeframe == series.timeframe
            && self.bars.len() == series.len()
            && self.bars.iter().zip(series.iter()).all(|(a, b)| same_bar(a, b))
    }
}

fn same_bar(a: &Bar, b: &Bar) -> bool {
    a.timestamp == b.timestamp
        && a.open.to_bits() == b.open.to_bits()
        && a.high.to_bits() == b.high.to_bits()
        && a.low.to_bits() == b.low.to_bits()
        && a.close.to_bits() == b.close.to_bits()
        && a.volume.to_bits() == b.volume.to_bits()
}

/// Memoizes indicator columns for one series snapshot.
///
/// Every lookup first compares the series against the snapshot the entries belong to;
/// a different snapshot drops all entries before computing.
#[derive(Debug, Default)]
pub struct IndicatorCache {
    snapshot: Option<Snapshot>,
    entries: HashMap<IndicatorKey, Vec<Vec<f64>>>,
    hits: u64,
    misses: u64,
}

impl IndicatorCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn bind(&mut self, series: &BarSeries) {
        if !self.snapshot.as_ref().is_some_and(|s| s.matches(series)) {
            self.entries.clear();
            self.snapshot = Some(Snapshot::of(series));
        }
    }

    /// Get a single column, computing it on a miss.
    pub fn column(
        &mut self,
        series: &BarSeries,
        key: IndicatorKey,
        compute: impl FnOnce() -> Vec<f64>,
    ) -> Vec<f64> {
        let [column] = self.columns(series, key, || [compute()]);
        column
    }

    /// Get a group of `N` columns produced together (e.g. the three Bollinger bands).
    pub fn columns<const N: usize>(
        &mut self,
        series: &BarSeries,
        key: IndicatorKey,
        compute: impl FnOnce() -> [Vec<f64>; N],
    ) -> [Vec<f64>; N] {
        self.bind(series);

        if let Some(cached) = self.entries.get(&key) {
            if let Ok(columns) = <[Vec<f64>; N]>::try_from(cached.clone()) {
                self.hits += 1;
                return columns;
            }
        }

        self.misses += 1;
        let columns = compute();
        self.entries.insert(key, columns.to_vec());
        columns
    }

    /// Drop every entry and forget the bound snapshot.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.snapshot = None;
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
