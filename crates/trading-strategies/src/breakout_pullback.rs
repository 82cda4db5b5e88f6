//! Breakout Pullback Strategy.
//!
//! Watches for a close through the recent high (or low), then waits for price to
//! retrace part of the move and turn back before entering in the breakout direction.

use serde::{Deserialize, Serialize};
use trading_core::{
    error::StrategyError,
    events::{SharedSink, TracingSink},
    traits::{Indicator, OhlcvIndicator, Strategy, StrategyConfig, StrategyState},
    types::{BarSeries, FeatureMap, PositionBook, PositionType, RiskParams, SignalFrame},
};
use trading_indicators::{signals, Atr, IndicatorCache, IndicatorKey, RollingMax, RollingMin, Sma};

use crate::common::{emit_signal, require_period, require_positive};

/// Adverse move from entry that closes the trade regardless of levels.
const MAX_ADVERSE_MOVE: f64 = 0.03;

/// Configuration for the breakout pullback strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakoutPullbackConfig {
    /// Bars used for support and resistance
    pub lookback_period: usize,
    /// Margin beyond the level a close needs to count as a breakout
    pub breakout_threshold: f64,
    /// Fraction of the breakout move price must give back
    pub pullback_ratio: f64,
    pub use_volume: bool,
    pub volume_multiplier: f64,
    #[serde(flatten)]
    pub risk: RiskParams,
}

impl Default for BreakoutPullbackConfig {
    fn default() -> Self {
        Self {
            lookback_period: 20,
            breakout_threshold: 0.01,
            pullback_ratio: 0.5,
            use_volume: true,
            volume_multiplier: 1.5,
            risk: RiskParams::default(),
        }
    }
}

impl StrategyConfig for BreakoutPullbackConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        require_period("lookback_period", self.lookback_period)?;
        require_positive("volume_multiplier", self.volume_multiplier)?;
        if self.breakout_threshold < 0.0 {
            return Err(StrategyError::InvalidConfig(
                "breakout_threshold must not be negative".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.pullback_ratio) {
            return Err(StrategyError::InvalidConfig(
                "pullback_ratio must be between 0 and 1".into(),
            ));
        }
        self.risk.validate()
    }
}

/// Progress towards a pullback entry.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum Setup {
    #[default]
    Idle,
    AwaitingPullback {
        side: PositionType,
        /// Broken support or resistance
        level: f64,
        /// High (long) or low (short) of the breakout bar
        extreme: f64,
    },
}

/// Breakout Pullback Strategy.
pub struct BreakoutPullbackStrategy {
    config: BreakoutPullbackConfig,
    book: PositionBook,
    cache: IndicatorCache,
    sink: SharedSink,
    setup: Setup,
}

impl BreakoutPullbackStrategy {
    pub fn new(config: BreakoutPullbackConfig) -> Self {
        Self {
            book: PositionBook::new(config.risk),
            config,
            cache: IndicatorCache::new(),
            sink: TracingSink::shared(),
            setup: Setup::Idle,
        }
    }

    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    /// Whether a breakout has been seen and an entry is pending.
    pub fn is_awaiting_pullback(&self) -> bool {
        matches!(self.setup, Setup::AwaitingPullback { .. })
    }

    /// Two consecutive closes in `side`'s direction, with rising volume when required.
    fn confirm_reversal(&self, frame: &SignalFrame<'_>, index: usize, side: PositionType) -> Result<bool, StrategyError> {
        if index < 3 {
            return Ok(false);
        }
        let cur = frame.bar(index)?;
        let prev1 = frame.bar(index - 1)?;
        let prev2 = frame.bar(index - 2)?;

        let two_bar_move = match side {
            PositionType::Long => cur.close > prev1.close && prev1.close > prev2.close,
            PositionType::Short => cur.close < prev1.close && prev1.close < prev2.close,
            PositionType::Flat => false,
        };
        Ok(two_bar_move && (!self.config.use_volume || cur.volume > prev1.volume))
    }

    fn enter(&mut self, frame: &SignalFrame<'_>, index: usize, side: PositionType) -> Result<bool, StrategyError> {
        if index < self.config.lookback_period + 5 {
            return Ok(false);
        }
        let (trigger, level_column, label) = match side {
            PositionType::Long => ("resistance_breakout", "resistance", "Resistance breakout"),
            _ => ("support_breakdown", "support", "Support breakdown"),
        };
        let bar = frame.bar(index)?;

        if frame.flag(trigger, index) && frame.flag("volume_confirmed", index) {
            let level = frame.value(level_column, index).unwrap_or(f64::NAN);
            let extreme = if side == PositionType::Long { bar.high } else { bar.low };
            self.setup = Setup::AwaitingPullback { side, level, extreme };
            tracing::info!(index, price = bar.close, level, "{label} detected, awaiting pullback");
            return Ok(false);
        }

        let Setup::AwaitingPullback { side: pending, level, extreme } = self.setup else {
            return Ok(false);
        };
        if pending != side {
            return Ok(false);
        }

        let retrace = 1.0 - self.config.pullback_ratio;
        let prev_close = frame.close(index - 1)?;
        let (target, turned) = match side {
            PositionType::Long => {
                let target = level + (extreme - level) * retrace;
                (target, prev_close <= target && bar.close > prev_close)
            }
            _ => {
                let target = level - (level - extreme) * retrace;
                (target, prev_close >= target && bar.close < prev_close)
            }
        };

        if turned && self.confirm_reversal(frame, index, side)? {
            self.setup = Setup::Idle;
            emit_signal(
                &self.sink,
                self.name(),
                index,
                format!("{side} entry: pullback complete at {:.2}, target was {target:.2}", bar.close),
            );
            return Ok(true);
        }
        Ok(false)
    }
}

impl Strategy for BreakoutPullbackStrategy {
    fn name(&self) -> &str {
        "Breakout Pullback"
    }

    fn description(&self) -> &str {
        "Enters on the retest after a support or resistance breakout"
    }

    fn warmup_period(&self) -> usize {
        self.config.lookback_period + 6
    }

    fn compute_signals(&mut self, series: &BarSeries) -> Result<FeatureMap, StrategyError> {
        let lookback = self.config.lookback_period;
        let threshold = self.config.breakout_threshold;
        let closes = series.closes();
        let highs = series.highs();
        let lows = series.lows();
        let volumes = series.volumes();

        let resistance = self.cache.column(series, IndicatorKey::new("max_prior", "high").param(lookback), || {
            signals::lag(&RollingMax::new(lookback).calculate(&highs), 1)
        });
        let support = self.cache.column(series, IndicatorKey::new("min_prior", "low").param(lookback), || {
            signals::lag(&RollingMin::new(lookback).calculate(&lows), 1)
        });
        let avg_volume = self.cache.column(series, IndicatorKey::new("sma", "volume").param(lookback), || {
            Sma::new(lookback).calculate(&volumes)
        });
        let atr = self.cache.column(series, IndicatorKey::new("atr", "bars").param(14), || {
            Atr::new(14).calculate(series.bars())
        });

        let breakout_line: Vec<f64> = resistance.iter().map(|r| r * (1.0 + threshold)).collect();
        let breakdown_line: Vec<f64> = support.iter().map(|s| s * (1.0 - threshold)).collect();

        let volume_confirmed: Vec<bool> = if self.config.use_volume {
            let multiplier = self.config.volume_multiplier;
            volumes
                .iter()
                .zip(&avg_volume)
                .map(|(v, avg)| *v > avg * multiplier)
                .collect()
        } else {
            vec![true; volumes.len()]
        };

        let mut features = FeatureMap::new(series.len());
        features.insert_flags("resistance_breakout", signals::cross_above(&closes, &breakout_line)?)?;
        features.insert_flags("support_breakdown", signals::cross_below(&closes, &breakdown_line)?)?;
        features.insert_flags("volume_confirmed", volume_confirmed)?;
        features.insert("resistance", resistance)?;
        features.insert("support", support)?;
        features.insert("avg_volume", avg_volume)?;
        features.insert("atr", atr)?;
        Ok(features)
    }

    fn should_enter_long(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        self.enter(frame, index, PositionType::Long)
    }

    fn should_enter_short(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        self.enter(frame, index, PositionType::Short)
    }

    fn should_exit_long(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        if index < 5 {
            return Ok(false);
        }
        if frame.flag("support_breakdown", index) {
            emit_signal(&self.sink, self.name(), index, "Exit long: support breakdown".into());
            return Ok(true);
        }
        let entry = self.book.entry_price();
        let close = frame.close(index)?;
        if entry > 0.0 && (entry - close) / entry > MAX_ADVERSE_MOVE {
            emit_signal(
                &self.sink,
                self.name(),
                index,
                format!("Exit long: drawdown {:.2}%", (entry - close) / entry * 100.0),
            );
            return Ok(true);
        }
        Ok(false)
    }

    fn should_exit_short(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        if index < 5 {
            return Ok(false);
        }
        if frame.flag("resistance_breakout", index) {
            emit_signal(&self.sink, self.name(), index, "Exit short: resistance breakout".into());
            return Ok(true);
        }
        let entry = self.book.entry_price();
        let close = frame.close(index)?;
        if entry > 0.0 && (close - entry) / entry > MAX_ADVERSE_MOVE {
            emit_signal(
                &self.sink,
                self.name(),
                index,
                format!("Exit short: bounce {:.2}%", (close - entry) / entry * 100.0),
            );
            return Ok(true);
        }
        Ok(false)
    }

    fn book(&self) -> &PositionBook {
        &self.book
    }

    fn book_mut(&mut self) -> &mut PositionBook {
        &mut self.book
    }

    fn reset(&mut self) {
        self.book.clear();
        self.cache.clear();
        self.setup = Setup::Idle;
    }

    fn state(&self) -> StrategyState {
        StrategyState {
            name: self.name().to_string(),
            position: self.book.position(),
            entry_price: self.book.entry_price(),
            size: self.book.size(),
            custom: serde_json::json!({
                "awaiting_pullback": self.is_awaiting_pullback(),
                "lookback_period": self.config.lookback_period,
            }),
        }
    }
}
