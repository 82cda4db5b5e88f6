//! Backtest report generation.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use trading_core::types::Timeframe;

use crate::engine::RunConfig;
use crate::error::BacktestError;
use crate::statistics::{EquitySnapshot, PerformanceMetrics, TradeRecord};

/// Complete backtest report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub strategy: String,
    pub symbol: String,
    pub timeframe: Timeframe,
    /// Configuration used
    pub config: RunConfig,
    pub metrics: PerformanceMetrics,
    /// Closed trades in exit order
    pub trades: Vec<TradeRecord>,
    /// One snapshot per bar
    pub equity_curve: Vec<EquitySnapshot>,
}

/// Flat trade row for CSV export.
#[derive(Serialize)]
struct TradeRow<'a> {
    position_type: &'a str,
    entry_time: String,
    entry_price: f64,
    exit_time: String,
    exit_price: f64,
    size: f64,
    pnl: f64,
    pnl_pct: f64,
    commission: f64,
    exit_reason: &'a str,
    bars_held: usize,
}

#[derive(Serialize)]
struct EquityRow<'a> {
    timestamp: String,
    equity: f64,
    position: &'a str,
}

fn iso(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| millis.to_string())
}

impl BacktestReport {
    /// Generate a text summary.
    pub fn summary(&self) -> String {
        let m = &self.metrics;
        let mut s = String::new();

        s.push_str("═══════════════════════════════════════════════════════════\n");
        s.push_str("                     BACKTEST REPORT                        \n");
        s.push_str("═══════════════════════════════════════════════════════════\n\n");

        s.push_str(&format!("  Strategy:            {}\n", self.strategy));
        s.push_str(&format!(
            "  Market:              {} ({})\n",
            self.symbol,
            self.timeframe.as_str()
        ));
        s.push_str(&format!("  Bars:                {}\n", self.equity_curve.len()));
        s.push('\n');

        s.push_str("PERFORMANCE\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Initial Capital:     ${:.2}\n", m.initial_capital));
        s.push_str(&format!("  Final Capital:       ${:.2}\n", m.final_capital));
        s.push_str(&format!("  Total Return:        {:.2}%\n", m.total_return));
        s.push_str(&format!("  Total PnL:           ${:.2}\n", m.total_pnl));
        s.push_str(&format!("  Max Drawdown:        {:.2}%\n", m.max_drawdown));
        s.push_str(&format!("  Sharpe Ratio:        {:.2}\n", m.sharpe_ratio));
        s.push('\n');

        s.push_str("TRADE STATISTICS\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Total Trades:        {}\n", m.total_trades));
        s.push_str(&format!("  Winning Trades:      {}\n", m.winning_trades));
        s.push_str(&format!("  Losing Trades:       {}\n", m.losing_trades));
        s.push_str(&format!("  Win Rate:            {:.2}%\n", m.win_rate));
        s.push_str(&format!("  Avg Win:             ${:.2}\n", m.avg_win));
        s.push_str(&format!("  Avg Loss:            ${:.2}\n", m.avg_loss));
        s.push_str(&format!("  Profit Factor:       {:.2}\n", m.profit_factor));
        s.push_str(&format!("  Commission Paid:     ${:.2}\n", m.total_commission));
        s.push('\n');

        s.push_str("═══════════════════════════════════════════════════════════\n");

        s
    }

    /// Render closed trades as a fixed-width table.
    pub fn trades_table(&self) -> String {
        let mut s = format!(
            "{:<6} {:<20} {:>12} {:<20} {:>12} {:>12} {:>8} {:<12}\n",
            "SIDE", "ENTRY", "ENTRY PX", "EXIT", "EXIT PX", "PNL", "PNL %", "REASON"
        );
        for t in &self.trades {
            s.push_str(&format!(
                "{:<6} {:<20} {:>12.4} {:<20} {:>12.4} {:>12.2} {:>8.2} {:<12}\n",
                t.position_type.to_string(),
                iso(t.entry_time),
                t.entry_price,
                iso(t.exit_time),
                t.exit_price,
                t.pnl,
                t.pnl_pct,
                t.exit_reason.to_string(),
            ));
        }
        s
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write closed trades to `path` as CSV.
    pub fn write_trades_csv(&self, path: impl AsRef<Path>) -> Result<(), BacktestError> {
        let mut writer = csv::Writer::from_path(path)?;
        for t in &self.trades {
            let position_type = t.position_type.to_string();
            let exit_reason = t.exit_reason.to_string();
            writer.serialize(TradeRow {
                position_type: &position_type,
                entry_time: iso(t.entry_time),
                entry_price: t.entry_price,
                exit_time: iso(t.exit_time),
                exit_price: t.exit_price,
                size: t.size,
                pnl: t.pnl,
                pnl_pct: t.pnl_pct,
                commission: t.total_commission(),
                exit_reason: &exit_reason,
                bars_held: t.bars_held(),
            })?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the equity curve to `path` as CSV.
    pub fn write_equity_csv(&self, path: impl AsRef<Path>) -> Result<(), BacktestError> {
        let mut writer = csv::Writer::from_path(path)?;
        for snapshot in &self.equity_curve {
            let position = snapshot.position.to_string();
            writer.serialize(EquityRow {
                timestamp: iso(snapshot.timestamp),
                equity: snapshot.equity,
                position: &position,
            })?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trading_core::types::{ExitReason, PositionType};

    fn report() -> BacktestReport {
        let trades = vec![TradeRecord {
            position_type: PositionType::Long,
            entry_index: 0,
            entry_time: 1_704_067_200_000,
            entry_price: 100.05,
            size: 49.975,
            entry_commission: 5.0,
            exit_index: 1,
            exit_time: 1_704_153_600_000,
            exit_price: 109.945,
            exit_commission: 5.49,
            exit_reason: ExitReason::Signal,
            pnl: 494.5,
            pnl_pct: 9.89,
        }];
        let equity_curve = vec![
            EquitySnapshot {
                timestamp: 1_704_067_200_000,
                equity: 4_995.0,
                position: PositionType::Long,
            },
            EquitySnapshot {
                timestamp: 1_704_153_600_000,
                equity: 10_484.01,
                position: PositionType::Flat,
            },
        ];
        let metrics = PerformanceMetrics::compute(10_000.0, 10_484.01, &trades, &equity_curve);
        BacktestReport {
            strategy: "ma_crossover".into(),
            symbol: "BTCUSDT".into(),
            timeframe: Timeframe::Daily,
            config: RunConfig::default(),
            metrics,
            trades,
            equity_curve,
        }
    }

    #[test]
    fn test_summary_contains_key_figures() {
        let summary = report().summary();
        assert!(summary.contains("ma_crossover"));
        assert!(summary.contains("BTCUSDT (1d)"));
        assert!(summary.contains("$10484.01"));
        assert!(summary.contains("Total Trades:        1"));
    }

    #[test]
    fn test_trades_table_uses_iso_times() {
        let table = report().trades_table();
        assert_eq!(table.lines().count(), 2);
        assert!(table.contains("2024-01-01T00:00:00Z"));
        assert!(table.contains("2024-01-02T00:00:00Z"));
    }

    #[test]
    fn test_json_roundtrips() {
        let report = report();
        let json = report.to_json().unwrap();
        let parsed: BacktestReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.trades.len(), 1);
        assert_eq!(parsed.trades[0].exit_reason, ExitReason::Signal);
        assert_eq!(parsed.metrics.total_trades, 1);
        assert!((parsed.metrics.final_capital - 10_484.01).abs() < 1e-9);
        assert!(json.contains("\"exit_reason\": \"SIGNAL\""));
    }

    #[test]
    fn test_csv_export() {
        let dir = std::env::temp_dir().join(format!("report-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let trades_path = dir.join("trades.csv");
        let equity_path = dir.join("equity.csv");

        let report = report();
        report.write_trades_csv(&trades_path).unwrap();
        report.write_equity_csv(&equity_path).unwrap();

        let trades = std::fs::read_to_string(&trades_path).unwrap();
        let mut lines = trades.lines();
        assert!(lines.next().unwrap().starts_with("position_type,entry_time"));
        assert!(lines.next().unwrap().starts_with("LONG,2024-01-01T00:00:00Z"));

        let equity = std::fs::read_to_string(&equity_path).unwrap();
        assert_eq!(equity.lines().count(), 3);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
