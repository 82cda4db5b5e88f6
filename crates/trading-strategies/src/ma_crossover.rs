//! Moving Average Crossover Strategy.
//!
//! Goes long when the short SMA crosses above the long SMA (golden cross) and short on
//! the opposite crossing (death cross). Each crossing also exits the opposite side.

use serde::{Deserialize, Serialize};
use trading_core::{
    error::StrategyError,
    events::{SharedSink, TracingSink},
    traits::{Indicator, Strategy, StrategyConfig, StrategyState},
    types::{BarSeries, FeatureMap, PositionBook, RiskParams, SignalFrame},
};
use trading_indicators::{signals, IndicatorCache, IndicatorKey, Sma};

use crate::common::{emit_signal, require_period};

/// Configuration for the MA Crossover strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MACrossoverConfig {
    /// Short moving average period
    pub ma_short: usize,
    /// Long moving average period
    pub ma_long: usize,
    #[serde(flatten)]
    pub risk: RiskParams,
}

impl Default for MACrossoverConfig {
    fn default() -> Self {
        Self {
            ma_short: 10,
            ma_long: 30,
            risk: RiskParams::default(),
        }
    }
}

impl StrategyConfig for MACrossoverConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        require_period("ma_short", self.ma_short)?;
        if self.ma_short >= self.ma_long {
            return Err(StrategyError::InvalidConfig(
                "ma_short must be less than ma_long".into(),
            ));
        }
        self.risk.validate()
    }
}

/// Moving Average Crossover Strategy.
pub struct MACrossoverStrategy {
    config: MACrossoverConfig,
    book: PositionBook,
    cache: IndicatorCache,
    sink: SharedSink,
}

impl MACrossoverStrategy {
    /// Create a new MA Crossover strategy.
    pub fn new(config: MACrossoverConfig) -> Self {
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

    pub fn config(&self) -> &MACrossoverConfig {
        &self.config
    }

    fn crossed(&self, frame: &SignalFrame<'_>, column: &str, index: usize, message: &str) -> bool {
        if index < self.config.ma_long || !frame.flag(column, index) {
            return false;
        }
        emit_signal(&self.sink, self.name(), index, message.to_string());
        true
    }
}

impl Strategy for MACrossoverStrategy {
    fn name(&self) -> &str {
        "MA Crossover"
    }

    fn description(&self) -> &str {
        "Trades short/long simple moving average crossovers"
    }

    fn warmup_period(&self) -> usize {
        self.config.ma_long + 1
    }

    fn compute_signals(&mut self, series: &BarSeries) -> Result<FeatureMap, StrategyError> {
        let closes = series.closes();
        let (short, long) = (self.config.ma_short, self.config.ma_long);

        let ma_short = self.cache.column(series, IndicatorKey::new("sma", "close").param(short), || {
            Sma::new(short).calculate(&closes)
        });
        let ma_long = self.cache.column(series, IndicatorKey::new("sma", "close").param(long), || {
            Sma::new(long).calculate(&closes)
        });

        let golden = signals::cross_above(&ma_short, &ma_long)?;
        let death = signals::cross_below(&ma_short, &ma_long)?;

        let mut features = FeatureMap::new(series.len());
        features.insert("ma_short", ma_short)?;
        features.insert("ma_long", ma_long)?;
        features.insert_flags("golden_cross", golden)?;
        features.insert_flags("death_cross", death)?;
        Ok(features)
    }

    fn should_enter_long(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        Ok(self.crossed(frame, "golden_cross", index, "Golden cross"))
    }

    fn should_enter_short(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        Ok(self.crossed(frame, "death_cross", index, "Death cross"))
    }

    fn should_exit_long(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        Ok(self.crossed(frame, "death_cross", index, "Exit long on death cross"))
    }

    fn should_exit_short(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        Ok(self.crossed(frame, "golden_cross", index, "Exit short on golden cross"))
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
                "ma_short": self.config.ma_short,
                "ma_long": self.config.ma_long,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_support::series_from_closes;
    use trading_core::events::{Event, MemorySink};
    use trading_core::types::PositionType;

    fn strategy(short: usize, long: usize) -> MACrossoverStrategy {
        MACrossoverStrategy::new(MACrossoverConfig {
            ma_short: short,
            ma_long: long,
            ..Default::default()
        })
    }

    #[test]
    fn test_config_validation() {
        assert!(MACrossoverConfig::default().validate().is_ok());

        let config = MACrossoverConfig {
            ma_short: 30,
            ma_long: 20,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_defaults_from_partial_json() {
        let config: MACrossoverConfig =
            serde_json::from_value(serde_json::json!({ "ma_short": 5, "stop_loss": 0.05 })).unwrap();
        assert_eq!(config.ma_short, 5);
        assert_eq!(config.ma_long, 30);
        assert_eq!(config.risk.stop_loss, 0.05);
        assert_eq!(config.risk.take_profit, 0.04);
    }

    #[test]
    fn test_golden_cross_enters_long() {
        let sink = MemorySink::new();
        let mut strategy = strategy(3, 5).with_sink(sink.clone());

        let prices = [100.0, 99.0, 98.0, 97.0, 96.0, 97.0, 99.0, 102.0, 105.0, 108.0];
        let series = series_from_closes(&prices);
        let features = strategy.compute_signals(&series).unwrap();
        let frame = SignalFrame::new(&series, &features).unwrap();

        let entries: Vec<usize> = (0..prices.len())
            .filter(|&i| strategy.should_enter_long(&frame, i).unwrap())
            .collect();
        assert_eq!(entries.len(), 1);
        assert!(!strategy.should_enter_short(&frame, entries[0]).unwrap());
        assert_eq!(sink.count(|e| matches!(e, Event::Signal { .. })), 1);
    }

    #[test]
    fn test_no_decision_before_lookback() {
        let mut strategy = strategy(2, 4);
        // nothing may fire before index ma_long
        let series = series_from_closes(&[10.0, 9.0, 8.0, 7.0, 12.0, 13.0]);
        let features = strategy.compute_signals(&series).unwrap();
        let frame = SignalFrame::new(&series, &features).unwrap();

        for i in 0..4 {
            assert!(!strategy.should_enter_long(&frame, i).unwrap());
        }
        assert!(strategy.should_enter_long(&frame, 4).unwrap());
    }

    #[test]
    fn test_columns_are_aligned() {
        let mut strategy = strategy(3, 5);
        let series = series_from_closes(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let features = strategy.compute_signals(&series).unwrap();

        assert_eq!(features.len(), 6);
        assert!(features.value("ma_long", 3).is_none());
        assert_eq!(features.value("ma_long", 4), Some(3.0));
    }

    #[test]
    fn test_reset() {
        let mut strategy = strategy(3, 5);
        strategy.on_position_changed(PositionType::Long, 100.0, 1.0);
        assert_eq!(strategy.state().position, PositionType::Long);

        strategy.reset();
        assert_eq!(strategy.state().position, PositionType::Flat);
        assert_eq!(strategy.book().entry_price(), 0.0);
    }
}
