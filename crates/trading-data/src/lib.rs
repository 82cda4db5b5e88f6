//! Market data sources.
//!
//! [`CsvDataSource`] loads historical bars from CSV files; [`ReplayFeed`] serves a loaded
//! series one bar at a time so the live driver can be exercised offline.

mod csv_source;
mod replay;

pub use csv_source::{parse_timestamp, CsvDataSource};
pub use replay::ReplayFeed;

use std::path::Path;
use trading_core::error::DataError;
use trading_core::types::{BarSeries, Timeframe};

/// Load a validated series from a CSV file.
pub fn load_csv(path: impl AsRef<Path>, symbol: &str, timeframe: Timeframe) -> Result<BarSeries, DataError> {
    CsvDataSource::open(path, symbol, timeframe).map(CsvDataSource::into_series)
}
