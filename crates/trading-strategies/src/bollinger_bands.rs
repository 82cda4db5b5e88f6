//! Bollinger Bands Strategy.
//!
//! Two modes over the same bands:
//! - mean reversion fades touches of the outer bands and exits near the middle band
//! - trend follows band breakouts that come out of a recent squeeze

use serde::{Deserialize, Serialize};
use trading_core::{
    error::StrategyError,
    events::{SharedSink, TracingSink},
    traits::{MultiOutputIndicator, Strategy, StrategyConfig, StrategyState},
    types::{BarSeries, FeatureMap, PositionBook, RiskParams, SignalFrame},
};
use trading_indicators::{BollingerBands, IndicatorCache, IndicatorKey};

use crate::common::{emit_signal, require_positive};

/// Bars before the current one searched for a squeeze in trend mode.
const SQUEEZE_LOOKBACK: usize = 5;

/// Relative distance from the middle band treated as "at the middle".
const NEAR_MIDDLE: f64 = 0.005;

/// How band touches are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandMode {
    #[default]
    MeanReversion,
    Trend,
}

/// Configuration for the Bollinger Bands strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BollingerConfig {
    /// Band period
    pub bb_period: usize,
    /// Standard deviation multiplier
    pub bb_std: f64,
    pub mode: BandMode,
    /// Bandwidth below which the bands count as squeezed
    pub squeeze_threshold: f64,
    #[serde(flatten)]
    pub risk: RiskParams,
}

impl Default for BollingerConfig {
    fn default() -> Self {
        Self {
            bb_period: 20,
            bb_std: 2.0,
            mode: BandMode::MeanReversion,
            squeeze_threshold: 0.02,
            risk: RiskParams::default(),
        }
    }
}

impl StrategyConfig for BollingerConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        if self.bb_period < 2 {
            return Err(StrategyError::InvalidConfig(
                "bb_period must be at least 2".into(),
            ));
        }
        require_positive("bb_std", self.bb_std)?;
        require_positive("squeeze_threshold", self.squeeze_threshold)?;
        self.risk.validate()
    }
}

/// Bollinger Bands Strategy.
pub struct BollingerStrategy {
    config: BollingerConfig,
    book: PositionBook,
    cache: IndicatorCache,
    sink: SharedSink,
}

/// Values a decision needs at one bar and the bar before it.
struct BandView {
    close: f64,
    prev_close: f64,
    upper: f64,
    prev_upper: f64,
    middle: f64,
    prev_middle: f64,
    lower: f64,
    prev_lower: f64,
    percent_b: Option<f64>,
}

impl BollingerStrategy {
    /// Create a new Bollinger Bands strategy.
    pub fn new(config: BollingerConfig) -> Self {
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

    fn view(&self, frame: &SignalFrame<'_>, index: usize) -> Result<Option<BandView>, StrategyError> {
        if index < self.config.bb_period + 1 {
            return Ok(None);
        }
        let band = |name: &str, i: usize| frame.value(name, i).unwrap_or(f64::NAN);

        Ok(Some(BandView {
            close: frame.close(index)?,
            prev_close: frame.close(index - 1)?,
            upper: band("bb_upper", index),
            prev_upper: band("bb_upper", index - 1),
            middle: band("bb_middle", index),
            prev_middle: band("bb_middle", index - 1),
            lower: band("bb_lower", index),
            prev_lower: band("bb_lower", index - 1),
            percent_b: frame.value("bb_percent", index),
        }))
    }

    /// Squeeze on this bar or any of the preceding few.
    fn recent_squeeze(frame: &SignalFrame<'_>, index: usize) -> bool {
        let start = index.saturating_sub(SQUEEZE_LOOKBACK);
        (start..=index).any(|i| frame.flag("bb_squeeze", i))
    }

    fn fire(&self, index: usize, message: &str) -> bool {
        emit_signal(&self.sink, self.name(), index, message.to_string());
        true
    }
}

impl Strategy for BollingerStrategy {
    fn name(&self) -> &str {
        "Bollinger Bands"
    }

    fn description(&self) -> &str {
        "Trades band touches (mean reversion) or squeeze breakouts (trend)"
    }

    fn warmup_period(&self) -> usize {
        self.config.bb_period + 2
    }

    fn compute_signals(&mut self, series: &BarSeries) -> Result<FeatureMap, StrategyError> {
        let closes = series.closes();
        let (period, k) = (self.config.bb_period, self.config.bb_std);

        let key = IndicatorKey::new("bollinger", "close").param(period).param_f64(k);
        let [upper, middle, lower] = self.cache.columns(series, key, || {
            let bands = BollingerBands::with_params(period, k).calculate(&closes);
            [bands.upper, bands.middle, bands.lower]
        });

        let width: Vec<f64> = (0..closes.len())
            .map(|i| (upper[i] - lower[i]) / middle[i])
            .collect();
        let percent: Vec<f64> = (0..closes.len())
            .map(|i| (closes[i] - lower[i]) / (upper[i] - lower[i]))
            .collect();
        let squeeze: Vec<bool> = width.iter().map(|w| *w < self.config.squeeze_threshold).collect();
        let near_middle = (0..closes.len()).map(|i| ((closes[i] - middle[i]) / middle[i]).abs() < NEAR_MIDDLE);

        let mut features = FeatureMap::new(series.len());
        features.insert_flags("near_middle", near_middle)?;
        features.insert_flags("bb_squeeze", squeeze)?;
        features.insert("bb_upper", upper)?;
        features.insert("bb_middle", middle)?;
        features.insert("bb_lower", lower)?;
        features.insert("bb_width", width)?;
        features.insert("bb_percent", percent)?;
        Ok(features)
    }

    fn should_enter_long(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        let Some(v) = self.view(frame, index)? else {
            return Ok(false);
        };

        let hit = match self.config.mode {
            BandMode::MeanReversion => {
                if v.prev_close <= v.prev_lower && v.close > v.lower {
                    self.fire(index, "Price bouncing from lower band")
                } else if v.percent_b.is_some_and(|b| 0.0 < b && b < 0.1) && v.close > v.prev_close {
                    self.fire(index, "Price near lower band and rising")
                } else {
                    false
                }
            }
            BandMode::Trend => {
                v.prev_close <= v.prev_upper
                    && v.close > v.upper
                    && Self::recent_squeeze(frame, index)
                    && self.fire(index, "Breakout above upper band after squeeze")
            }
        };
        Ok(hit)
    }

    fn should_enter_short(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        let Some(v) = self.view(frame, index)? else {
            return Ok(false);
        };

        let hit = match self.config.mode {
            BandMode::MeanReversion => {
                if v.prev_close >= v.prev_upper && v.close < v.upper {
                    self.fire(index, "Price falling from upper band")
                } else if v.percent_b.is_some_and(|b| 0.9 < b && b < 1.0) && v.close < v.prev_close {
                    self.fire(index, "Price near upper band and falling")
                } else {
                    false
                }
            }
            BandMode::Trend => {
                v.prev_close >= v.prev_lower
                    && v.close < v.lower
                    && Self::recent_squeeze(frame, index)
                    && self.fire(index, "Breakdown below lower band after squeeze")
            }
        };
        Ok(hit)
    }

    fn should_exit_long(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        let Some(v) = self.view(frame, index)? else {
            return Ok(false);
        };

        let hit = match self.config.mode {
            BandMode::MeanReversion => {
                if frame.flag("near_middle", index) {
                    self.fire(index, "Exit long: price near middle band")
                } else if v.close >= v.upper {
                    self.fire(index, "Exit long: price at upper band")
                } else {
                    false
                }
            }
            BandMode::Trend => {
                v.prev_close >= v.prev_middle
                    && v.close < v.middle
                    && self.fire(index, "Exit long: price below middle band")
            }
        };
        Ok(hit)
    }

    fn should_exit_short(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        let Some(v) = self.view(frame, index)? else {
            return Ok(false);
        };

        let hit = match self.config.mode {
            BandMode::MeanReversion => {
                if frame.flag("near_middle", index) {
                    self.fire(index, "Exit short: price near middle band")
                } else if v.close <= v.lower {
                    self.fire(index, "Exit short: price at lower band")
                } else {
                    false
                }
            }
            BandMode::Trend => {
                v.prev_close <= v.prev_middle
                    && v.close > v.middle
                    && self.fire(index, "Exit short: price above middle band")
            }
        };
        Ok(hit)
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
                "bb_period": self.config.bb_period,
                "bb_std": self.config.bb_std,
                "mode": self.config.mode,
            }),
        }
    }
}
