//! Named indicator columns aligned with a bar series.

use std::collections::BTreeMap;

use super::{Bar, BarSeries};
use crate::error::StrategyError;

/// Indicator columns produced by a strategy's signal computation.
///
/// Every column has exactly one value per bar. Undefined values (warm-up) are NaN.
/// Boolean columns are stored as 1.0 / 0.0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMap {
    len: usize,
    columns: BTreeMap<String, Vec<f64>>,
}

impl FeatureMap {
    /// Empty map for a series of `len` bars.
    pub fn new(len: usize) -> Self {
        Self {
            len,
            columns: BTreeMap::new(),
        }
    }

    /// Insert or replace a column.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<(), StrategyError> {
        let name = name.into();
        if values.len() != self.len {
            return Err(StrategyError::MisalignedFeature {
                name,
                expected: self.len,
                actual: values.len(),
            });
        }
        self.columns.insert(name, values);
        Ok(())
    }

    /// Insert a boolean column.
    pub fn insert_flags(
        &mut self,
        name: impl Into<String>,
        flags: impl IntoIterator<Item = bool>,
    ) -> Result<(), StrategyError> {
        let values = flags
            .into_iter()
            .map(|f| if f { 1.0 } else { 0.0 })
            .collect();
        self.insert(name, values)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Defined value at `index`; `None` when the column is missing, the index is out of
    /// range or the value is NaN.
    pub fn value(&self, name: &str, index: usize) -> Option<f64> {
        self.columns
            .get(name)
            .and_then(|c| c.get(index))
            .copied()
            .filter(|v| !v.is_nan())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Number of bars each column covers.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

/// Read-only view of a series and its features, handed to decision methods.
#[derive(Debug, Clone, Copy)]
pub struct SignalFrame<'a> {
    series: &'a BarSeries,
    features: &'a FeatureMap,
}

impl<'a> SignalFrame<'a> {
    pub fn new(series: &'a BarSeries, features: &'a FeatureMap) -> Result<Self, StrategyError> {
        if features.len() != series.len() {
            return Err(StrategyError::MisalignedFeature {
                name: "<feature map>".into(),
                expected: series.len(),
                actual: features.len(),
            });
        }
        Ok(Self { series, features })
    }

    pub fn series(&self) -> &'a BarSeries {
        self.series
    }

    pub fn features(&self) -> &'a FeatureMap {
        self.features
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Index of the most recent bar.
    pub fn last_index(&self) -> Option<usize> {
        self.series.len().checked_sub(1)
    }

    pub fn bar(&self, index: usize) -> Result<&'a Bar, StrategyError> {
        self.series.get(index).ok_or(StrategyError::IndexOutOfRange {
            index,
            len: self.series.len(),
        })
    }

    pub fn close(&self, index: usize) -> Result<f64, StrategyError> {
        self.bar(index).map(|b| b.close)
    }

    pub fn value(&self, name: &str, index: usize) -> Option<f64> {
        self.features.value(name, index)
    }

    /// Boolean column value; undefined reads as false.
    pub fn flag(&self, name: &str, index: usize) -> bool {
        self.value(name, index).is_some_and(|v| v != 0.0)
    }
}
