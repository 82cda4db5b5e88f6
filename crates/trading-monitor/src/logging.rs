//! Logging setup.

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use trading_config::{LogFormat, LoggingConfig};

/// Filter from `RUST_LOG`, falling back to the configured level, then to `info`.
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Directory and file name for a rolling appender writing to `path`.
fn split_log_path(path: &Path) -> Option<(PathBuf, PathBuf)> {
    let file_name = path.file_name()?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Some((dir, PathBuf::from(file_name)))
}

/// Install the global subscriber.
///
/// Console output is pretty or JSON per `config.format`. When `config.file` is set,
/// logs are also written there without ANSI colours, rolled daily through a
/// non-blocking writer; keep the returned guard alive until exit so buffered lines
/// are flushed.
pub fn setup_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>, TryInitError> {
    let filter = build_filter(&config.level);

    let console = match config.format {
        LogFormat::Json => fmt::layer().json().boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
    };

    let (file_layer, guard) = match config.file.as_deref().and_then(split_log_path) {
        Some((dir, file_name)) => {
            let appender = tracing_appender::rolling::daily(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}
