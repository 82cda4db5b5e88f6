//! Trade ledger, equity curve and the metrics derived from them.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use trading_core::types::{ExitReason, PositionType};

/// Annualization factor applied to per-bar Sharpe ratios.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// A closed trade. Prices are effective (after slippage).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub position_type: PositionType,
    pub entry_index: usize,
    /// Unix milliseconds
    pub entry_time: i64,
    pub entry_price: f64,
    pub size: f64,
    pub entry_commission: f64,
    pub exit_index: usize,
    pub exit_time: i64,
    pub exit_price: f64,
    pub exit_commission: f64,
    pub exit_reason: ExitReason,
    pub pnl: f64,
    pub pnl_pct: f64,
}

impl TradeRecord {
    pub fn total_commission(&self) -> f64 {
        self.entry_commission + self.exit_commission
    }

    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }

    /// Bars between entry and exit.
    pub fn bars_held(&self) -> usize {
        self.exit_index.saturating_sub(self.entry_index)
    }
}

/// Equity at a bar close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquitySnapshot {
    pub timestamp: i64,
    pub equity: f64,
    pub position: PositionType,
}

/// Summary statistics of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub initial_capital: f64,
    pub final_capital: f64,
    /// Percent
    pub total_return: f64,
    pub total_pnl: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Percent
    pub win_rate: f64,
    pub avg_win: f64,
    /// Zero or negative
    pub avg_loss: f64,
    /// `|avg_win / avg_loss|`, 0 without losses
    pub profit_factor: f64,
    pub total_commission: f64,
    /// Percent, zero or negative
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
}

impl PerformanceMetrics {
    /// Derive metrics from a finished ledger and equity curve.
    pub fn compute(
        initial_capital: f64,
        final_capital: f64,
        trades: &[TradeRecord],
        equity_curve: &[EquitySnapshot],
    ) -> Self {
        let wins: Vec<f64> = trades.iter().map(|t| t.pnl).filter(|p| *p > 0.0).collect();
        let losses: Vec<f64> = trades.iter().map(|t| t.pnl).filter(|p| *p < 0.0).collect();

        let avg_win = mean_or_zero(&wins);
        let avg_loss = mean_or_zero(&losses);
        let total_trades = trades.len();

        let equity: Vec<f64> = equity_curve.iter().map(|s| s.equity).collect();

        Self {
            initial_capital,
            final_capital,
            total_return: if initial_capital > 0.0 {
                (final_capital - initial_capital) / initial_capital * 100.0
            } else {
                0.0
            },
            total_pnl: trades.iter().map(|t| t.pnl).sum(),
            total_trades,
            winning_trades: wins.len(),
            losing_trades: losses.len(),
            win_rate: if total_trades > 0 {
                wins.len() as f64 / total_trades as f64 * 100.0
            } else {
                0.0
            },
            avg_win,
            avg_loss,
            profit_factor: if avg_loss != 0.0 {
                (avg_win / avg_loss).abs()
            } else {
                0.0
            },
            total_commission: trades.iter().map(TradeRecord::total_commission).sum(),
            max_drawdown: max_drawdown(&equity),
            sharpe_ratio: sharpe_ratio(&equity),
        }
    }
}

fn mean_or_zero(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Drawdown from the running peak at each point, in percent.
pub fn drawdowns(equity: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    equity
        .iter()
        .map(|&e| {
            peak = peak.max(e);
            if peak > 0.0 {
                (e - peak) / peak * 100.0
            } else {
                0.0
            }
        })
        .collect()
}

/// Deepest drawdown in percent; 0 for an empty curve.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    drawdowns(equity).into_iter().fold(0.0, f64::min)
}

/// Per-step fractional changes; steps from a zero value are skipped.
pub fn returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .filter(|r| r.is_finite())
        .collect()
}

/// `mean / sample std × √252` of per-bar returns; 0 when the deviation is zero or
/// undefined.
pub fn sharpe_ratio(equity: &[f64]) -> f64 {
    let returns = returns(equity);
    if returns.len() < 2 {
        return 0.0;
    }
    let std_dev = returns.iter().std_dev();
    if !(std_dev > 0.0) {
        return 0.0;
    }
    returns.iter().mean() / std_dev * TRADING_DAYS_PER_YEAR.sqrt()
}
