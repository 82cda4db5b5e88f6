//! CLI definitions.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "trading")]
#[command(author, version, about = "Strategy backtesting and paper trading")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", env = "TRADING_CONFIG")]
    pub config: PathBuf,

    /// Log level, overriding the configuration file
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a backtest over CSV data
    Backtest(BacktestArgs),
    /// Replay CSV data through the live driver with a paper account
    Paper(PaperArgs),
    /// List available strategies
    Strategies,
    /// Validate configuration
    ValidateConfig,
}

/// Overrides shared by the backtest and paper commands.
#[derive(clap::Args)]
pub struct MarketArgs {
    /// Strategy identifier (see `strategies`)
    #[arg(short, long)]
    pub strategy: Option<String>,

    /// Strategy parameters as a JSON object
    #[arg(short, long)]
    pub params: Option<String>,

    /// Data file (CSV)
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Symbol recorded for the data
    #[arg(long)]
    pub symbol: Option<String>,

    /// Bar interval of the data (1m, 1h, 1d, ...)
    #[arg(short, long)]
    pub timeframe: Option<String>,

    /// Initial capital
    #[arg(long)]
    pub capital: Option<f64>,

    /// Commission rate per fill
    #[arg(long)]
    pub commission: Option<f64>,

    /// Slippage rate per fill
    #[arg(long)]
    pub slippage: Option<f64>,
}

#[derive(clap::Args)]
pub struct BacktestArgs {
    #[command(flatten)]
    pub market: MarketArgs,

    /// First day to include (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<String>,

    /// Last day to include (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Print every closed trade
    #[arg(long)]
    pub trades: bool,

    /// Save the full report as JSON
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Write closed trades as CSV
    #[arg(long)]
    pub trades_csv: Option<PathBuf>,

    /// Write the equity curve as CSV
    #[arg(long)]
    pub equity_csv: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct PaperArgs {
    #[command(flatten)]
    pub market: MarketArgs,

    /// Bars visible before the first step (defaults to the live window)
    #[arg(long)]
    pub warmup: Option<usize>,
}
