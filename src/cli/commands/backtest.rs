//! Backtest command implementation.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;
use trading_backtest::BacktestEngine;
use trading_config::AppConfig;
use trading_core::traits::MarketDataProvider;
use trading_core::types::BarSeries;
use trading_data::CsvDataSource;

use super::{create_strategy, resolve_config};
use crate::cli::{BacktestArgs, OutputFormat};

pub async fn run(args: BacktestArgs, config: &AppConfig) -> Result<()> {
    let mut config = resolve_config(config, &args.market)?;
    if args.start.is_some() {
        config.backtest.start_date = args.start.clone();
    }
    if args.end.is_some() {
        config.backtest.end_date = args.end.clone();
    }
    config.validate()?;

    let data_path = config
        .backtest
        .data_file
        .clone()
        .context("No data file given; pass --data or set backtest.data_file")?;
    let timeframe = config.timeframe()?;
    let source = CsvDataSource::open(&data_path, &config.trading.symbol, timeframe)
        .with_context(|| format!("Failed to load {}", data_path.display()))?;
    let series = select_range(&source, &config).await?;

    let mut strategy = create_strategy(&config)?;
    info!(
        strategy = strategy.name(),
        symbol = %series.symbol,
        bars = series.len(),
        "Starting backtest"
    );

    let engine = BacktestEngine::new(config.run_config())?;
    let report = engine.run(strategy.as_mut(), &series)?;

    match args.output {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Text => {
            println!("{}", report.summary());
            if args.trades {
                println!("{}", report.trades_table());
            }
        }
    }

    if let Some(path) = &args.save {
        std::fs::write(path, report.to_json()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Report saved");
    }
    if let Some(path) = &args.trades_csv {
        report.write_trades_csv(path)?;
        info!(path = %path.display(), trades = report.trades.len(), "Trades saved");
    }
    if let Some(path) = &args.equity_csv {
        report.write_equity_csv(path)?;
        info!(path = %path.display(), "Equity curve saved");
    }

    Ok(())
}

/// Bars between the configured start and end dates, both days inclusive.
async fn select_range(source: &CsvDataSource, config: &AppConfig) -> Result<BarSeries> {
    let backtest = &config.backtest;
    if backtest.start_date.is_none() && backtest.end_date.is_none() {
        return Ok(source.series().clone());
    }

    let start = match &backtest.start_date {
        Some(date) => day_bound(date, 0, 0, 0)?,
        None => DateTime::<Utc>::MIN_UTC,
    };
    let end = match &backtest.end_date {
        Some(date) => day_bound(date, 23, 59, 59)?,
        None => DateTime::<Utc>::MAX_UTC,
    };

    source
        .get_historical_bars(&config.trading.symbol, config.timeframe()?, start, end)
        .await
        .with_context(|| format!("No bars between {start} and {end}"))
}

fn day_bound(date: &str, hour: u32, min: u32, sec: u32) -> Result<DateTime<Utc>> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(hour, min, sec))
        .map(|dt| dt.and_utc())
        .with_context(|| format!("Invalid date '{date}'"))
}
