//! Scripted strategy shared by the integration tests.

#![allow(dead_code)]

use std::collections::BTreeSet;
use trading_core::error::StrategyError;
use trading_core::traits::Strategy;
use trading_core::types::{Bar, BarSeries, FeatureMap, PositionBook, RiskParams, SignalFrame, Timeframe};

pub const DAY_MS: i64 = 86_400_000;

/// Answers each decision from fixed sets of bar indices.
#[derive(Debug, Clone)]
pub struct Scripted {
    book: PositionBook,
    pub enter_long: BTreeSet<usize>,
    pub exit_long: BTreeSet<usize>,
    pub enter_short: BTreeSet<usize>,
    pub exit_short: BTreeSet<usize>,
}

impl Scripted {
    /// Protective exits far enough away to never fire on test prices.
    pub fn new() -> Self {
        Self::with_risk(RiskParams {
            stop_loss: 0.9,
            take_profit: 10.0,
            max_position_size: 0.5,
        })
    }

    pub fn with_risk(risk: RiskParams) -> Self {
        Self {
            book: PositionBook::new(risk),
            enter_long: BTreeSet::new(),
            exit_long: BTreeSet::new(),
            enter_short: BTreeSet::new(),
            exit_short: BTreeSet::new(),
        }
    }

    pub fn long(mut self, enter: &[usize], exit: &[usize]) -> Self {
        self.enter_long.extend(enter);
        self.exit_long.extend(exit);
        self
    }

    pub fn short(mut self, enter: &[usize], exit: &[usize]) -> Self {
        self.enter_short.extend(enter);
        self.exit_short.extend(exit);
        self
    }
}

impl Strategy for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn warmup_period(&self) -> usize {
        0
    }

    fn compute_signals(&mut self, series: &BarSeries) -> Result<FeatureMap, StrategyError> {
        Ok(FeatureMap::new(series.len()))
    }

    fn should_enter_long(&mut self, _: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        Ok(self.enter_long.contains(&index))
    }

    fn should_enter_short(&mut self, _: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        Ok(self.enter_short.contains(&index))
    }

    fn should_exit_long(&mut self, _: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        Ok(self.exit_long.contains(&index))
    }

    fn should_exit_short(&mut self, _: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        Ok(self.exit_short.contains(&index))
    }

    fn book(&self) -> &PositionBook {
        &self.book
    }

    fn book_mut(&mut self) -> &mut PositionBook {
        &mut self.book
    }

    fn reset(&mut self) {
        self.book.clear();
    }
}

/// Daily bars closing at `closes`, each spanning 1% either side of the close.
pub fn daily_series(closes: &[f64]) -> BarSeries {
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar::new(i as i64 * DAY_MS, c, c * 1.01, c * 0.99, c, 1_000.0))
        .collect();
    BarSeries::from_bars("TEST", Timeframe::Daily, bars)
}
