//! RSI-based Trading Strategy.
//!
//! Oscillator threshold trading: buys on the way out of the oversold zone and sells
//! on the way out of the overbought zone. Sharp RSI moves against the position exit.

use serde::{Deserialize, Serialize};
use trading_core::{
    error::StrategyError,
    events::{SharedSink, TracingSink},
    traits::{Indicator, Strategy, StrategyConfig, StrategyState},
    types::{BarSeries, FeatureMap, PositionBook, RiskParams, SignalFrame},
};
use trading_indicators::{signals, IndicatorCache, IndicatorKey, RollingMax, RollingMin, Rsi, Sma};

use crate::common::emit_signal;

/// Window used to find price and RSI extremes for divergence.
const DIVERGENCE_WINDOW: usize = 14;

/// Configuration for the RSI strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiConfig {
    /// RSI calculation period
    pub rsi_period: usize,
    /// Oversold threshold
    pub oversold: f64,
    /// Overbought threshold
    pub overbought: f64,
    /// Treat divergences as additional entry triggers
    pub use_divergence: bool,
    #[serde(flatten)]
    pub risk: RiskParams,
}

impl Default for RsiConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            oversold: 30.0,
            overbought: 70.0,
            use_divergence: false,
            risk: RiskParams::default(),
        }
    }
}

impl StrategyConfig for RsiConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        if self.rsi_period < 2 {
            return Err(StrategyError::InvalidConfig(
                "RSI period must be at least 2".into(),
            ));
        }
        if self.overbought <= self.oversold {
            return Err(StrategyError::InvalidConfig(
                "Overbought must be greater than oversold".into(),
            ));
        }
        if self.overbought > 100.0 || self.oversold < 0.0 {
            return Err(StrategyError::InvalidConfig(
                "RSI thresholds must be between 0 and 100".into(),
            ));
        }
        self.risk.validate()
    }
}

/// RSI Strategy.
pub struct RsiStrategy {
    config: RsiConfig,
    book: PositionBook,
    cache: IndicatorCache,
    sink: SharedSink,
}

impl RsiStrategy {
    /// Create a new RSI strategy.
    pub fn new(config: RsiConfig) -> Self {
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

    /// Current and previous RSI, once past the lookback.
    fn rsi_pair(&self, frame: &SignalFrame<'_>, index: usize) -> Option<(f64, f64)> {
        if index < self.config.rsi_period + 1 {
            return None;
        }
        Some((frame.value("rsi", index)?, frame.value("rsi", index - 1)?))
    }

    fn fire(&self, index: usize, message: String) -> bool {
        emit_signal(&self.sink, self.name(), index, message);
        true
    }
}

impl Strategy for RsiStrategy {
    fn name(&self) -> &str {
        "RSI"
    }

    fn description(&self) -> &str {
        "Trades RSI moves out of the oversold and overbought zones"
    }

    fn warmup_period(&self) -> usize {
        self.config.rsi_period + 2
    }

    fn compute_signals(&mut self, series: &BarSeries) -> Result<FeatureMap, StrategyError> {
        let closes = series.closes();
        let period = self.config.rsi_period;

        let rsi = self.cache.column(series, IndicatorKey::new("rsi", "close").param(period), || {
            Rsi::new(period).calculate(&closes)
        });
        let rsi_ma = Sma::new(5).calculate(&rsi);

        let price_low = RollingMin::new(DIVERGENCE_WINDOW).calculate(&closes);
        let price_high = RollingMax::new(DIVERGENCE_WINDOW).calculate(&closes);
        let rsi_low = signals::lag(&RollingMin::new(DIVERGENCE_WINDOW).calculate(&rsi), 1);
        let rsi_high = signals::lag(&RollingMax::new(DIVERGENCE_WINDOW).calculate(&rsi), 1);

        let bullish = (0..closes.len()).map(|i| closes[i] == price_low[i] && rsi[i] > rsi_low[i]);
        let bearish = (0..closes.len()).map(|i| closes[i] == price_high[i] && rsi[i] < rsi_high[i]);

        let mut features = FeatureMap::new(series.len());
        features.insert_flags("bullish_divergence", bullish)?;
        features.insert_flags("bearish_divergence", bearish)?;
        features.insert("rsi", rsi)?;
        features.insert("rsi_ma", rsi_ma)?;
        Ok(features)
    }

    fn should_enter_long(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        let Some((cur, prev)) = self.rsi_pair(frame, index) else {
            return Ok(false);
        };
        let oversold = self.config.oversold;

        if prev <= oversold && cur > oversold {
            return Ok(self.fire(index, format!("RSI breakout from oversold at {cur:.2}")));
        }
        if cur < oversold + 5.0 && cur > prev {
            return Ok(self.fire(index, format!("RSI reversal from oversold at {cur:.2}")));
        }
        if self.config.use_divergence && frame.flag("bullish_divergence", index) {
            return Ok(self.fire(index, format!("Bullish RSI divergence at {cur:.2}")));
        }
        Ok(false)
    }

    fn should_enter_short(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        let Some((cur, prev)) = self.rsi_pair(frame, index) else {
            return Ok(false);
        };
        let overbought = self.config.overbought;

        if prev >= overbought && cur < overbought {
            return Ok(self.fire(index, format!("RSI breakdown from overbought at {cur:.2}")));
        }
        if cur > overbought - 5.0 && cur < prev {
            return Ok(self.fire(index, format!("RSI reversal from overbought at {cur:.2}")));
        }
        if self.config.use_divergence && frame.flag("bearish_divergence", index) {
            return Ok(self.fire(index, format!("Bearish RSI divergence at {cur:.2}")));
        }
        Ok(false)
    }

    fn should_exit_long(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        let Some((cur, prev)) = self.rsi_pair(frame, index) else {
            return Ok(false);
        };

        if cur >= self.config.overbought {
            return Ok(self.fire(index, format!("Exit long: RSI overbought at {cur:.2}")));
        }
        if cur < prev - 5.0 {
            return Ok(self.fire(index, format!("Exit long: RSI falling at {cur:.2}")));
        }
        Ok(false)
    }

    fn should_exit_short(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        let Some((cur, prev)) = self.rsi_pair(frame, index) else {
            return Ok(false);
        };

        if cur <= self.config.oversold {
            return Ok(self.fire(index, format!("Exit short: RSI oversold at {cur:.2}")));
        }
        if cur > prev + 5.0 {
            return Ok(self.fire(index, format!("Exit short: RSI rising at {cur:.2}")));
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
                "rsi_period": self.config.rsi_period,
                "oversold": self.config.oversold,
                "overbought": self.config.overbought,
            }),
        }
    }
}
