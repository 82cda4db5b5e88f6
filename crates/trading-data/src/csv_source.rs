//! CSV data source.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use trading_core::error::DataError;
use trading_core::traits::MarketDataProvider;
use trading_core::types::{Bar, BarSeries, Timeframe};

/// Integer timestamps above this are taken as milliseconds, below as seconds.
const MILLIS_THRESHOLD: i64 = 10_000_000_000;

/// CSV record format.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(
        alias = "Date",
        alias = "date",
        alias = "Timestamp",
        alias = "open_time",
        alias = "Open Time",
        alias = "datetime"
    )]
    timestamp: String,
    #[serde(alias = "Open")]
    open: f64,
    #[serde(alias = "High")]
    high: f64,
    #[serde(alias = "Low")]
    low: f64,
    #[serde(alias = "Close")]
    close: f64,
    #[serde(alias = "Volume", default)]
    volume: f64,
}

/// Historical bars for one instrument, loaded from a CSV file.
///
/// The whole file is read, sorted and validated up front; queries are served from memory.
#[derive(Debug, Clone)]
pub struct CsvDataSource {
    path: PathBuf,
    series: BarSeries,
}

impl CsvDataSource {
    /// Load `path` as bars of `symbol` at `timeframe`.
    pub fn open(path: impl AsRef<Path>, symbol: &str, timeframe: Timeframe) -> Result<Self, DataError> {
        let path = path.as_ref();
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| DataError::ParseError(format!("{}: {e}", path.display())))?;

        let series = read_series(reader, symbol, timeframe)?;
        info!(
            path = %path.display(),
            symbol,
            bars = series.len(),
            "Loaded CSV data"
        );

        Ok(Self {
            path: path.to_path_buf(),
            series,
        })
    }

    /// Parse CSV text from any reader.
    pub fn from_reader<R: Read>(reader: R, symbol: &str, timeframe: Timeframe) -> Result<BarSeries, DataError> {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        read_series(reader, symbol, timeframe)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Everything loaded.
    pub fn series(&self) -> &BarSeries {
        &self.series
    }

    pub fn into_series(self) -> BarSeries {
        self.series
    }

    fn check_request(&self, symbol: &str, timeframe: Timeframe) -> Result<(), DataError> {
        if symbol != self.series.symbol {
            return Err(DataError::SymbolNotFound(symbol.to_string()));
        }
        if timeframe != self.series.timeframe {
            return Err(DataError::InvalidTimeframe(format!(
                "{} holds {} bars, {} requested",
                self.path.display(),
                self.series.timeframe,
                timeframe
            )));
        }
        Ok(())
    }
}

fn read_series<R: Read>(mut reader: csv::Reader<R>, symbol: &str, timeframe: Timeframe) -> Result<BarSeries, DataError> {
    let mut bars = Vec::new();

    for (row, result) in reader.deserialize::<CsvRecord>().enumerate() {
        let record = result.map_err(|e| DataError::ParseError(format!("row {}: {e}", row + 1)))?;
        let timestamp = parse_timestamp(&record.timestamp)?;

        bars.push(Bar::new(
            timestamp,
            record.open,
            record.high,
            record.low,
            record.close,
            record.volume,
        ));
    }

    bars.sort_by_key(|b| b.timestamp);

    let series = BarSeries::from_bars(symbol, timeframe, bars);
    series.validate()?;
    debug!(symbol, bars = series.len(), "Parsed CSV bars");
    Ok(series)
}

/// Parse an ISO date, an ISO datetime or a Unix timestamp into Unix milliseconds.
pub fn parse_timestamp(value: &str) -> Result<i64, DataError> {
    let value = value.trim();

    if let Ok(ts) = value.parse::<i64>() {
        return Ok(if ts.abs() > MILLIS_THRESHOLD { ts } else { ts * 1000 });
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc).timestamp_millis());
    }

    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }

    const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
    for format in DATE_FORMATS {
        if let Some(dt) = NaiveDate::parse_from_str(value, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }

    Err(DataError::ParseError(format!("Could not parse timestamp: {value}")))
}

/// Bars of `series` whose timestamps fall in `[start, end]`.
pub(crate) fn slice_range(
    series: &BarSeries,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<BarSeries, DataError> {
    let (start, end) = (start.timestamp_millis(), end.timestamp_millis());
    let bars: Vec<Bar> = series
        .iter()
        .filter(|b| b.timestamp >= start && b.timestamp <= end)
        .copied()
        .collect();
    if bars.is_empty() {
        return Err(DataError::NoDataAvailable);
    }
    Ok(BarSeries::from_bars(series.symbol.clone(), series.timeframe, bars))
}

#[async_trait]
impl MarketDataProvider for CsvDataSource {
    async fn get_historical_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BarSeries, DataError> {
        self.check_request(symbol, timeframe)?;
        slice_range(&self.series, start, end)
    }

    async fn get_recent_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<BarSeries, DataError> {
        self.check_request(symbol, timeframe)?;
        Ok(self.series.tail(limit))
    }

    fn name(&self) -> &str {
        "csv"
    }
}
