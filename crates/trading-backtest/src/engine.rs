//! Backtesting engine.
//!
//! A run replays a validated series bar by bar through one strategy. Per bar, in order:
//! stop-loss then take-profit while positioned; entries while flat (including a
//! position closed earlier in the same bar); signal exits otherwise; then an equity
//! snapshot at the close. An open position is liquidated at the last close.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use trading_core::events::{Event, NullSink, SharedSink, TracingSink};
use trading_core::traits::Strategy;
use trading_core::types::{Bar, BarSeries, ExitReason, PositionType, Side, SignalFrame};
use trading_core::error::StrategyError;

use crate::cost::{CostModel, Fill};
use crate::error::BacktestError;
use crate::report::BacktestReport;
use crate::statistics::{EquitySnapshot, PerformanceMetrics, TradeRecord};

/// Run configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub initial_capital: f64,
    /// Fraction of the filled notional charged per fill
    pub commission_rate: f64,
    /// Fractional price concession per fill
    pub slippage_rate: f64,
    /// Fraction of available capital committed per entry
    pub max_position_size: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            commission_rate: 0.001,
            slippage_rate: 0.0005,
            max_position_size: 0.5,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), BacktestError> {
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(BacktestError::InvalidConfig(format!(
                "initial_capital must be positive, got {}",
                self.initial_capital
            )));
        }
        if !(self.commission_rate >= 0.0) {
            return Err(BacktestError::InvalidConfig(
                "commission_rate must not be negative".into(),
            ));
        }
        if !(self.slippage_rate >= 0.0 && self.slippage_rate < 1.0) {
            return Err(BacktestError::InvalidConfig(
                "slippage_rate must be in [0, 1)".into(),
            ));
        }
        if !(self.max_position_size > 0.0 && self.max_position_size <= 1.0) {
            return Err(BacktestError::InvalidConfig(
                "max_position_size must be in (0, 1]".into(),
            ));
        }
        Ok(())
    }

    pub fn cost_model(&self) -> CostModel {
        CostModel::new(self.commission_rate, self.slippage_rate)
    }
}

/// Backtesting engine.
pub struct BacktestEngine {
    config: RunConfig,
    costs: CostModel,
    sink: SharedSink,
}

impl BacktestEngine {
    /// Create an engine; invalid configuration is rejected here, before any bar.
    pub fn new(config: RunConfig) -> Result<Self, BacktestError> {
        config.validate()?;
        Ok(Self {
            costs: config.cost_model(),
            config,
            sink: TracingSink::shared(),
        })
    }

    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    /// Engine that reports nothing.
    pub fn silent(config: RunConfig) -> Result<Self, BacktestError> {
        Ok(Self::new(config)?.with_sink(Arc::new(NullSink)))
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Replay `series` through `strategy`.
    ///
    /// The strategy is reset first, so the same instance can be run repeatedly.
    pub fn run(&self, strategy: &mut dyn Strategy, series: &BarSeries) -> Result<BacktestReport, BacktestError> {
        series.validate()?;
        strategy.reset();

        let name = strategy.name().to_string();
        self.sink.emit(&Event::RunStarted {
            strategy: name.clone(),
            symbol: series.symbol.clone(),
            bars: series.len(),
            initial_capital: self.config.initial_capital,
        });

        let signals_failed = |source: StrategyError| BacktestError::Signals {
            strategy: name.clone(),
            source,
        };
        let features = strategy.compute_signals(series).map_err(signals_failed)?;
        let frame = SignalFrame::new(series, &features).map_err(signals_failed)?;

        let mut account = Account::new(&self.config, self.costs, &self.sink);
        for (index, bar) in series.iter().enumerate() {
            account
                .step(strategy, &frame, index, bar)
                .map_err(|source| BacktestError::Evaluation {
                    strategy: name.clone(),
                    index,
                    timestamp: bar.timestamp,
                    source,
                })?;
        }

        if let Some(last) = series.last() {
            if account.open.is_some() {
                account.close(strategy, series.len() - 1, last, ExitReason::Final);
            }
        }

        let metrics = PerformanceMetrics::compute(
            self.config.initial_capital,
            account.capital,
            &account.trades,
            &account.equity,
        );
        self.sink.emit(&Event::RunCompleted {
            strategy: name.clone(),
            total_trades: metrics.total_trades,
            final_capital: metrics.final_capital,
            total_return: metrics.total_return,
        });

        Ok(BacktestReport {
            strategy: name,
            symbol: series.symbol.clone(),
            timeframe: series.timeframe,
            config: self.config,
            metrics,
            trades: account.trades,
            equity_curve: account.equity,
        })
    }
}

/// The live leg, held until it closes into a [`TradeRecord`].
#[derive(Debug, Clone, Copy)]
struct OpenPosition {
    position_type: PositionType,
    index: usize,
    timestamp: i64,
    fill: Fill,
}

impl OpenPosition {
    /// Unrealized PnL against the entry effective price.
    fn unrealized(&self, price: f64) -> f64 {
        self.position_type.sign() * (price - self.fill.effective_price) * self.fill.size
    }
}

/// Capital, position and records for one run.
struct Account<'a> {
    config: &'a RunConfig,
    costs: CostModel,
    sink: &'a SharedSink,
    capital: f64,
    open: Option<OpenPosition>,
    trades: Vec<TradeRecord>,
    equity: Vec<EquitySnapshot>,
}

impl<'a> Account<'a> {
    fn new(config: &'a RunConfig, costs: CostModel, sink: &'a SharedSink) -> Self {
        Self {
            config,
            costs,
            sink,
            capital: config.initial_capital,
            open: None,
            trades: Vec::new(),
            equity: Vec::new(),
        }
    }

    fn position(&self) -> PositionType {
        self.open.map_or(PositionType::Flat, |p| p.position_type)
    }

    fn step(
        &mut self,
        strategy: &mut dyn Strategy,
        frame: &SignalFrame<'_>,
        index: usize,
        bar: &Bar,
    ) -> Result<(), StrategyError> {
        let price = bar.close;

        if let Some(open) = self.open {
            let reason = if strategy.check_stop_loss(price) {
                Some(ExitReason::StopLoss)
            } else if strategy.check_take_profit(price) {
                Some(ExitReason::TakeProfit)
            } else {
                None
            };
            if let Some(reason) = reason {
                self.sink.emit(&Event::ProtectiveExit {
                    index,
                    reason,
                    price,
                    entry_price: open.fill.effective_price,
                });
                self.close(strategy, index, bar, reason);
            }
        }

        match self.position() {
            PositionType::Flat => {
                if strategy.should_enter_long(frame, index)? {
                    self.open(strategy, PositionType::Long, index, bar);
                } else if strategy.should_enter_short(frame, index)? {
                    self.open(strategy, PositionType::Short, index, bar);
                }
            }
            PositionType::Long => {
                if strategy.should_exit_long(frame, index)? {
                    self.close(strategy, index, bar, ExitReason::Signal);
                }
            }
            PositionType::Short => {
                if strategy.should_exit_short(frame, index)? {
                    self.close(strategy, index, bar, ExitReason::Signal);
                }
            }
        }

        let unrealized = self.open.map_or(0.0, |p| p.unrealized(price));
        self.equity.push(EquitySnapshot {
            timestamp: bar.timestamp,
            equity: self.capital + unrealized,
            position: self.position(),
        });
        Ok(())
    }

    fn open(&mut self, strategy: &mut dyn Strategy, position_type: PositionType, index: usize, bar: &Bar) {
        let Some(side) = Side::opening(position_type) else {
            return;
        };
        let notional = self.capital * self.config.max_position_size;
        let fill = self.costs.fill_notional(side, bar.close, notional);
        let required = fill.notional + fill.commission;

        // short entries credit the proceeds and are never capital-bound
        let unaffordable = side == Side::Buy && required > self.capital;
        if unaffordable || !(fill.size > 0.0) {
            self.sink.emit(&Event::EntrySkipped {
                index,
                timestamp: bar.timestamp,
                position_type,
                required,
                available: self.capital,
            });
            return;
        }

        self.capital += fill.cash_flow();
        self.open = Some(OpenPosition {
            position_type,
            index,
            timestamp: bar.timestamp,
            fill,
        });
        self.sink.emit(&Event::PositionOpened {
            index,
            timestamp: bar.timestamp,
            position_type,
            price: bar.close,
            effective_price: fill.effective_price,
            size: fill.size,
            commission: fill.commission,
            capital: self.capital,
        });
        strategy.on_position_changed(position_type, bar.close, fill.size);
    }

    fn close(&mut self, strategy: &mut dyn Strategy, index: usize, bar: &Bar, reason: ExitReason) {
        let Some(open) = self.open.take() else {
            return;
        };
        let entry = open.fill;
        let exit = self.costs.fill(entry.side.opposite(), bar.close, entry.size);
        self.capital += exit.cash_flow();

        let pnl = open.position_type.sign() * (exit.effective_price - entry.effective_price) * entry.size;
        let basis = entry.effective_price * entry.size;
        let pnl_pct = if basis > 0.0 { pnl / basis * 100.0 } else { 0.0 };

        self.trades.push(TradeRecord {
            position_type: open.position_type,
            entry_index: open.index,
            entry_time: open.timestamp,
            entry_price: entry.effective_price,
            size: entry.size,
            entry_commission: entry.commission,
            exit_index: index,
            exit_time: bar.timestamp,
            exit_price: exit.effective_price,
            exit_commission: exit.commission,
            exit_reason: reason,
            pnl,
            pnl_pct,
        });
        self.sink.emit(&Event::PositionClosed {
            index,
            timestamp: bar.timestamp,
            position_type: open.position_type,
            price: bar.close,
            effective_price: exit.effective_price,
            reason,
            pnl,
            pnl_pct,
            capital: self.capital,
        });
        strategy.on_position_changed(PositionType::Flat, 0.0, 0.0);
    }
}
