//! MACD Trend Strategy.
//!
//! Enters on MACD/signal line crossings, optionally confirmed by the histogram and by
//! the MACD line's side of zero. Exits on the opposite crossing or when the histogram
//! turns sharply against the position.

use serde::{Deserialize, Serialize};
use trading_core::{
    error::StrategyError,
    events::{SharedSink, TracingSink},
    traits::{MultiOutputIndicator, Strategy, StrategyConfig, StrategyState},
    types::{BarSeries, FeatureMap, PositionBook, RiskParams, SignalFrame},
};
use trading_indicators::{signals, IndicatorCache, IndicatorKey, Macd};

use crate::common::{emit_signal, require_period};

/// Configuration for the MACD strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdConfig {
    pub fast_period: usize,
    pub slow_period: usize,
    pub signal_period: usize,
    /// Require histogram confirmation on entries; enables histogram-decay exits
    pub use_histogram: bool,
    /// Require the MACD line on the trade's side of zero; enables zero-cross trades
    pub use_zero_cross: bool,
    #[serde(flatten)]
    pub risk: RiskParams,
}

impl Default for MacdConfig {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
            use_histogram: true,
            use_zero_cross: false,
            risk: RiskParams::default(),
        }
    }
}

impl StrategyConfig for MacdConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        require_period("fast_period", self.fast_period)?;
        require_period("signal_period", self.signal_period)?;
        if self.fast_period >= self.slow_period {
            return Err(StrategyError::InvalidConfig(
                "fast_period must be less than slow_period".into(),
            ));
        }
        self.risk.validate()
    }
}

/// MACD Trend Strategy.
pub struct MacdStrategy {
    config: MacdConfig,
    book: PositionBook,
    cache: IndicatorCache,
    sink: SharedSink,
}

impl MacdStrategy {
    pub fn new(config: MacdConfig) -> Self {
        Self {
            book: PositionBook::new(config.risk),
            config,
            cache: IndicatorCache::new(),
            sink: TracingSink::shared(),
        }
    }

    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    fn ready(&self, index: usize) -> bool {
        index >= self.config.slow_period.max(self.config.signal_period) + 1
    }

    fn fire(&self, index: usize, message: &str) -> bool {
        emit_signal(&self.sink, self.name(), index, message.to_string());
        true
    }

    /// Undefined values compare false, like NaN.
    fn value(frame: &SignalFrame<'_>, name: &str, index: usize) -> f64 {
        frame.value(name, index).unwrap_or(f64::NAN)
    }
}

impl Strategy for MacdStrategy {
    fn name(&self) -> &str {
        "MACD"
    }

    fn description(&self) -> &str {
        "Follows MACD signal line crossings with histogram and zero line confirmation"
    }

    fn warmup_period(&self) -> usize {
        self.config.slow_period.max(self.config.signal_period) + 2
    }

    fn compute_signals(&mut self, series: &BarSeries) -> Result<FeatureMap, StrategyError> {
        let closes = series.closes();
        let (fast, slow, signal) = (
            self.config.fast_period,
            self.config.slow_period,
            self.config.signal_period,
        );
        let macd = Macd::with_periods(fast, slow, signal)?;

        let key = IndicatorKey::new("macd", "close").param(fast).param(slow).param(signal);
        let [line, signal_line, histogram] = self.cache.columns(series, key, || {
            let out = macd.calculate(&closes);
            [out.macd, out.signal, out.histogram]
        });

        let mut features = FeatureMap::new(series.len());
        features.insert_flags("golden_cross", signals::cross_above(&line, &signal_line)?)?;
        features.insert_flags("death_cross", signals::cross_below(&line, &signal_line)?)?;
        features.insert_flags("zero_cross_up", signals::cross_above_level(&line, 0.0))?;
        features.insert_flags("zero_cross_down", signals::cross_below_level(&line, 0.0))?;
        features.insert_flags("histogram_increasing", signals::rising(&histogram))?;
        features.insert_flags("histogram_decreasing", signals::falling(&histogram))?;
        features.insert("macd", line)?;
        features.insert("macd_signal", signal_line)?;
        features.insert("macd_histogram", histogram)?;
        Ok(features)
    }

    fn should_enter_long(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        if !self.ready(index) {
            return Ok(false);
        }
        let macd = Self::value(frame, "macd", index);
        let histogram = Self::value(frame, "macd_histogram", index);

        if frame.flag("golden_cross", index) {
            if self.config.use_histogram
                && !(histogram > 0.0 || frame.flag("histogram_increasing", index))
            {
                tracing::debug!(index, "Histogram confirmation failed");
                return Ok(false);
            }
            if self.config.use_zero_cross && !(macd > 0.0) {
                tracing::debug!(index, "Zero line confirmation failed");
                return Ok(false);
            }
            return Ok(self.fire(index, "MACD golden cross confirmed"));
        }

        if self.config.use_zero_cross
            && frame.flag("zero_cross_up", index)
            && macd > Self::value(frame, "macd_signal", index)
        {
            return Ok(self.fire(index, "MACD crossed above zero"));
        }
        Ok(false)
    }

    fn should_enter_short(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        if !self.ready(index) {
            return Ok(false);
        }
        let macd = Self::value(frame, "macd", index);
        let histogram = Self::value(frame, "macd_histogram", index);

        if frame.flag("death_cross", index) {
            if self.config.use_histogram
                && !(histogram < 0.0 || frame.flag("histogram_decreasing", index))
            {
                tracing::debug!(index, "Histogram confirmation failed");
                return Ok(false);
            }
            if self.config.use_zero_cross && !(macd < 0.0) {
                tracing::debug!(index, "Zero line confirmation failed");
                return Ok(false);
            }
            return Ok(self.fire(index, "MACD death cross confirmed"));
        }

        if self.config.use_zero_cross
            && frame.flag("zero_cross_down", index)
            && macd < Self::value(frame, "macd_signal", index)
        {
            return Ok(self.fire(index, "MACD crossed below zero"));
        }
        Ok(false)
    }

    fn should_exit_long(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        if !self.ready(index) {
            return Ok(false);
        }
        if frame.flag("death_cross", index) {
            return Ok(self.fire(index, "Exit long: MACD death cross"));
        }
        if self.config.use_zero_cross && frame.flag("zero_cross_down", index) {
            return Ok(self.fire(index, "Exit long: MACD crossed below zero"));
        }
        if self.config.use_histogram {
            let cur = Self::value(frame, "macd_histogram", index);
            let prev = Self::value(frame, "macd_histogram", index - 1);
            let prev2 = Self::value(frame, "macd_histogram", index - 2);
            if cur < prev && prev < prev2 && cur < prev * 0.5 {
                return Ok(self.fire(index, "Exit long: histogram decaying fast"));
            }
        }
        Ok(false)
    }

    fn should_exit_short(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        if !self.ready(index) {
            return Ok(false);
        }
        if frame.flag("golden_cross", index) {
            return Ok(self.fire(index, "Exit short: MACD golden cross"));
        }
        if self.config.use_zero_cross && frame.flag("zero_cross_up", index) {
            return Ok(self.fire(index, "Exit short: MACD crossed above zero"));
        }
        if self.config.use_histogram {
            let cur = Self::value(frame, "macd_histogram", index);
            let prev = Self::value(frame, "macd_histogram", index - 1);
            let prev2 = Self::value(frame, "macd_histogram", index - 2);
            if cur > prev && prev > prev2 && cur.abs() > prev.abs() * 1.5 {
                return Ok(self.fire(index, "Exit short: histogram growing fast"));
            }
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
    }

    fn state(&self) -> StrategyState {
        StrategyState {
            name: self.name().to_string(),
            position: self.book.position(),
            entry_price: self.book.entry_price(),
            size: self.book.size(),
            custom: serde_json::json!({
                "fast_period": self.config.fast_period,
                "slow_period": self.config.slow_period,
                "signal_period": self.config.signal_period,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_support::series_from_closes;

    fn strategy(use_histogram: bool, use_zero_cross: bool) -> MacdStrategy {
        MacdStrategy::new(MacdConfig {
            fast_period: 3,
            slow_period: 6,
            signal_period: 3,
            use_histogram,
            use_zero_cross,
            ..Default::default()
        })
    }

    /// Decline, then a sustained rally.
    fn v_shape() -> Vec<f64> {
        let mut closes: Vec<f64> = (0..15).map(|i| 120.0 - i as f64).collect();
        closes.extend((1..=15).map(|i| 106.0 + 2.0 * i as f64));
        closes
    }

    #[test]
    fn test_config_validation() {
        assert!(MacdConfig::default().validate().is_ok());

        let config = MacdConfig {
            fast_period: 26,
            slow_period: 12,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_columns() {
        let mut strategy = strategy(true, false);
        let series = series_from_closes(&v_shape());
        let features = strategy.compute_signals(&series).unwrap();

        for name in [
            "macd",
            "macd_signal",
            "macd_histogram",
            "golden_cross",
            "death_cross",
            "zero_cross_up",
            "zero_cross_down",
            "histogram_increasing",
            "histogram_decreasing",
        ] {
            assert!(features.contains(name), "missing {name}");
        }
    }

    #[test]
    fn test_golden_cross_after_reversal() {
        let mut strategy = strategy(true, false);
        let closes = v_shape();
        let series = series_from_closes(&closes);
        let features = strategy.compute_signals(&series).unwrap();
        let frame = SignalFrame::new(&series, &features).unwrap();

        let entries: Vec<usize> = (0..closes.len())
            .filter(|&i| strategy.should_enter_long(&frame, i).unwrap())
            .collect();
        assert_eq!(entries.len(), 1);
        assert!(entries[0] >= 15);
        assert!(frame.flag("golden_cross", entries[0]));

        // a golden cross also closes shorts
        assert!(strategy.should_exit_short(&frame, entries[0]).unwrap());
    }

    #[test]
    fn test_zero_line_confirmation_blocks_early_cross() {
        let mut strict = strategy(false, true);
        let closes = v_shape();
        let series = series_from_closes(&closes);
        let features = strict.compute_signals(&series).unwrap();
        let frame = SignalFrame::new(&series, &features).unwrap();

        let cross = (0..closes.len())
            .find(|&i| frame.flag("golden_cross", i))
            .unwrap();
        // the first crossing happens while MACD is still below zero
        assert!(frame.value("macd", cross).unwrap() < 0.0);
        assert!(!strict.should_enter_long(&frame, cross).unwrap());
    }

    /// Flat series whose last three histogram values are `tail`; no cross flags set.
    fn with_histogram(tail: [f64; 3]) -> (BarSeries, FeatureMap) {
        let series = series_from_closes(&[100.0; 10]);
        let mut histogram = vec![0.0; 10];
        histogram[7..].copy_from_slice(&tail);
        let mut features = FeatureMap::new(series.len());
        features.insert("macd_histogram", histogram).unwrap();
        (series, features)
    }

    fn exits(strategy: &mut MacdStrategy, tail: [f64; 3]) -> (bool, bool) {
        let (series, features) = with_histogram(tail);
        let frame = SignalFrame::new(&series, &features).unwrap();
        (
            strategy.should_exit_long(&frame, 9).unwrap(),
            strategy.should_exit_short(&frame, 9).unwrap(),
        )
    }

    #[test]
    fn test_histogram_decay_exits_long() {
        let mut macd = strategy(true, false);

        // falling twice and more than halved
        assert_eq!(exits(&mut macd, [1.0, 0.8, 0.3]), (true, false));
        // falling twice but not halved
        assert!(!exits(&mut macd, [1.0, 0.8, 0.5]).0);
        // halved but only one fall
        assert!(!exits(&mut macd, [0.5, 0.8, 0.3]).0);

        let mut plain = strategy(false, false);
        assert_eq!(exits(&mut plain, [1.0, 0.8, 0.3]), (false, false));
    }

    #[test]
    fn test_histogram_growth_exits_short() {
        let mut macd = strategy(true, false);

        // rising twice and half again larger
        assert_eq!(exits(&mut macd, [0.1, 0.2, 0.5]), (false, true));
        // rising twice but not by half
        assert!(!exits(&mut macd, [0.1, 0.4, 0.5]).1);
        // rising toward zero shrinks the magnitude
        assert!(!exits(&mut macd, [-1.0, -0.8, -0.3]).1);

        let mut plain = strategy(false, false);
        assert_eq!(exits(&mut plain, [0.1, 0.2, 0.5]), (false, false));
    }
}
