//! Strategy trait definitions.

use crate::error::StrategyError;
use crate::types::{BarSeries, FeatureMap, PositionBook, PositionType, SignalFrame, SignalType};
use serde::{Deserialize, Serialize};

/// Configuration trait for strategies.
pub trait StrategyConfig: Send + Sync + Clone + 'static {
    /// Validate the configuration.
    fn validate(&self) -> Result<(), StrategyError>;
}

/// Snapshot of a strategy for monitoring.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StrategyState {
    pub name: String,
    pub position: PositionType,
    pub entry_price: f64,
    pub size: f64,
    /// Variant-specific state
    pub custom: serde_json::Value,
}

/// Core strategy trait.
///
/// A strategy turns a bar series into named indicator columns once per run, then answers
/// per-bar entry and exit questions. The caller (the backtest engine or the live driver)
/// owns capital and the real position; the strategy only keeps its own
/// [`PositionBook`], which changes exclusively through [`Strategy::on_position_changed`].
///
/// Decision methods must return `Ok(false)` for indices before the variant's minimum
/// lookback. An `Err` aborts the run.
pub trait Strategy: Send + Sync {
    /// Display name of this strategy.
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Number of bars needed before decisions can be true.
    fn warmup_period(&self) -> usize;

    /// Compute the indicator columns for `series`.
    ///
    /// Deterministic in `series`. May be called repeatedly on a growing window.
    fn compute_signals(&mut self, series: &BarSeries) -> Result<FeatureMap, StrategyError>;

    /// Evaluated only while flat.
    fn should_enter_long(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError>;

    /// Evaluated only while flat, after `should_enter_long` returned false.
    fn should_enter_short(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError>;

    /// Evaluated only while long.
    fn should_exit_long(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError>;

    /// Evaluated only while short.
    fn should_exit_short(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError>;

    fn book(&self) -> &PositionBook;

    fn book_mut(&mut self) -> &mut PositionBook;

    /// Whether `price` breaches the stop-loss relative to the recorded entry.
    fn check_stop_loss(&self, price: f64) -> bool {
        self.book().stop_loss_hit(price)
    }

    /// Whether `price` reaches the take-profit relative to the recorded entry.
    fn check_take_profit(&self, price: f64) -> bool {
        self.book().take_profit_hit(price)
    }

    /// Order quantity for an entry at `price` given `capital`.
    fn size_position(&self, capital: f64, price: f64) -> f64 {
        self.book().default_size(capital, price)
    }

    /// Notification that the position changed. Called by the engine or the live driver
    /// after every open and close, never by the strategy itself.
    fn on_position_changed(&mut self, position: PositionType, price: f64, size: f64) {
        self.book_mut().update(position, price, size);
    }

    /// Clear all internal state to start-of-run values.
    fn reset(&mut self);

    /// Recommended action for the most recent bar of `frame` (live polling).
    fn current_signal(&mut self, frame: &SignalFrame<'_>) -> Result<SignalType, StrategyError> {
        let Some(index) = frame.last_index() else {
            return Ok(SignalType::Hold);
        };
        let price = frame.close(index)?;

        let signal = match self.book().position() {
            PositionType::Long => {
                if self.check_stop_loss(price)
                    || self.check_take_profit(price)
                    || self.should_exit_long(frame, index)?
                {
                    SignalType::CloseLong
                } else {
                    SignalType::Hold
                }
            }
            PositionType::Short => {
                if self.check_stop_loss(price)
                    || self.check_take_profit(price)
                    || self.should_exit_short(frame, index)?
                {
                    SignalType::CloseShort
                } else {
                    SignalType::Hold
                }
            }
            PositionType::Flat => {
                if self.should_enter_long(frame, index)? {
                    SignalType::Buy
                } else if self.should_enter_short(frame, index)? {
                    SignalType::Sell
                } else {
                    SignalType::Hold
                }
            }
        };
        Ok(signal)
    }

    /// Current state for monitoring.
    fn state(&self) -> StrategyState {
        let book = self.book();
        StrategyState {
            name: self.name().to_string(),
            position: book.position(),
            entry_price: book.entry_price(),
            size: book.size(),
            custom: serde_json::Value::Null,
        }
    }

    /// Check if enough bars are available for decisions.
    fn is_warmed_up(&self, bars_available: usize) -> bool {
        bars_available >= self.warmup_period()
    }
}
