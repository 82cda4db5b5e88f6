//! Momentum Dip Buying Strategy.
//!
//! Buys a fast pump with half the allocation, adds the other half if price dips after
//! entry, and exits on a profit target against the average cost or on a second dip
//! below the add price. Long only.

use serde::{Deserialize, Serialize};
use trading_core::{
    error::StrategyError,
    events::{SharedSink, TracingSink},
    traits::{Indicator, OhlcvIndicator, Strategy, StrategyConfig, StrategyState},
    types::{BarSeries, FeatureMap, PositionBook, PositionType, RiskParams, SignalFrame, SignalType},
};
use trading_indicators::{Atr, IndicatorCache, IndicatorKey, PercentChange, Sma};

use crate::common::{emit_signal, require_positive};

/// Multiple of the 20-bar average volume that counts as a spike.
const VOLUME_SPIKE: f64 = 1.5;

/// Configuration for the momentum dip strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumDipConfig {
    /// Five-bar gain that triggers the first entry
    pub pump_threshold: f64,
    /// Drop that triggers the add, and after it the exit
    pub dip_threshold: f64,
    /// Gain over the cost basis that takes profit
    pub profit_target: f64,
    /// Share of capital committed by the first leg
    pub position_1_ratio: f64,
    pub leverage_multiplier: f64,
    #[serde(flatten)]
    pub risk: RiskParams,
}

impl Default for MomentumDipConfig {
    fn default() -> Self {
        Self {
            pump_threshold: 0.05,
            dip_threshold: 0.03,
            profit_target: 0.05,
            position_1_ratio: 0.5,
            leverage_multiplier: 2.0,
            risk: RiskParams::default(),
        }
    }
}

impl StrategyConfig for MomentumDipConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        require_positive("pump_threshold", self.pump_threshold)?;
        require_positive("dip_threshold", self.dip_threshold)?;
        require_positive("profit_target", self.profit_target)?;
        require_positive("leverage_multiplier", self.leverage_multiplier)?;
        if !(self.position_1_ratio > 0.0 && self.position_1_ratio <= 1.0) {
            return Err(StrategyError::InvalidConfig(
                "position_1_ratio must be in (0, 1]".into(),
            ));
        }
        self.risk.validate()
    }
}

/// Entry legs of the open position.
#[derive(Debug, Clone, Copy, Default)]
struct Legs {
    first_price: f64,
    first_size: f64,
    second_price: f64,
    second_size: f64,
    average_price: f64,
    added: bool,
}

impl Legs {
    fn open(price: f64, size: f64) -> Self {
        Self {
            first_price: price,
            first_size: size,
            average_price: price,
            ..Default::default()
        }
    }

    fn add(&mut self, price: f64, size: f64) {
        self.second_price = price;
        self.second_size = size;
        self.added = true;
        let total = self.first_size + size;
        if total > 0.0 {
            self.average_price = (self.first_price * self.first_size + price * size) / total;
        }
    }

    fn total_size(&self) -> f64 {
        self.first_size + self.second_size
    }

    /// Average cost after an add, else the first entry.
    fn cost_basis(&self) -> f64 {
        if self.added {
            self.average_price
        } else {
            self.first_price
        }
    }
}

/// Momentum Dip Buying Strategy.
pub struct MomentumDipStrategy {
    config: MomentumDipConfig,
    book: PositionBook,
    cache: IndicatorCache,
    sink: SharedSink,
    legs: Legs,
}

impl MomentumDipStrategy {
    pub fn new(config: MomentumDipConfig) -> Self {
        Self {
            book: PositionBook::new(config.risk),
            config,
            cache: IndicatorCache::new(),
            sink: TracingSink::shared(),
            legs: Legs::default(),
        }
    }

    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn has_added(&self) -> bool {
        self.legs.added
    }

    pub fn average_price(&self) -> f64 {
        self.legs.average_price
    }

    /// Fractional drop of `price` below the first entry.
    fn dip_from_first(&self, price: f64) -> f64 {
        if self.legs.first_price <= 0.0 {
            return 0.0;
        }
        (self.legs.first_price - price) / self.legs.first_price
    }

    fn wants_add(&self, price: f64) -> bool {
        self.book.position() == PositionType::Long
            && !self.legs.added
            && self.dip_from_first(price) > self.config.dip_threshold
    }
}

impl Strategy for MomentumDipStrategy {
    fn name(&self) -> &str {
        "Momentum Dip Buying"
    }

    fn description(&self) -> &str {
        "Buys fast pumps with half size and adds the other half on the first dip"
    }

    fn warmup_period(&self) -> usize {
        11
    }

    fn compute_signals(&mut self, series: &BarSeries) -> Result<FeatureMap, StrategyError> {
        let closes = series.closes();
        let volumes = series.volumes();

        let change_5 = self.cache.column(series, IndicatorKey::new("pct_change", "close").param(5), || {
            PercentChange::new(5).calculate(&closes)
        });
        let change_1 = PercentChange::new(1).calculate(&closes);
        let volume_ma = self.cache.column(series, IndicatorKey::new("sma", "volume").param(20), || {
            Sma::new(20).calculate(&volumes)
        });
        let atr = self.cache.column(series, IndicatorKey::new("atr", "bars").param(14), || {
            Atr::new(14).calculate(series.bars())
        });
        let spike: Vec<bool> = volumes
            .iter()
            .zip(&volume_ma)
            .map(|(v, ma)| *v > ma * VOLUME_SPIKE)
            .collect();

        let mut features = FeatureMap::new(series.len());
        features.insert("price_change_5", change_5)?;
        features.insert("price_change_1", change_1)?;
        features.insert("volume_ma20", volume_ma)?;
        features.insert_flags("volume_spike", spike)?;
        features.insert("atr", atr)?;
        Ok(features)
    }

    fn should_enter_long(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        if index < 10 || !self.book.is_flat() {
            return Ok(false);
        }
        let Some(change) = frame.value("price_change_5", index) else {
            return Ok(false);
        };
        if change > self.config.pump_threshold {
            let spike = frame.flag("volume_spike", index);
            emit_signal(
                &self.sink,
                self.name(),
                index,
                format!("Pump detected: 5-bar change {:.2}%, volume spike {spike}", change * 100.0),
            );
            return Ok(true);
        }
        Ok(false)
    }

    fn should_enter_short(&mut self, _frame: &SignalFrame<'_>, _index: usize) -> Result<bool, StrategyError> {
        Ok(false)
    }

    fn should_exit_long(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        if index < 5 || self.book.position() != PositionType::Long {
            return Ok(false);
        }
        let basis = self.legs.cost_basis();
        if basis <= 0.0 {
            return Ok(false);
        }
        let price = frame.close(index)?;

        let profit = (price - basis) / basis;
        if profit >= self.config.profit_target {
            emit_signal(
                &self.sink,
                self.name(),
                index,
                format!("Take profit: {:.2}% at {price:.2}", profit * 100.0),
            );
            return Ok(true);
        }

        if self.legs.added && self.legs.second_price > 0.0 {
            let dip = (self.legs.second_price - price) / self.legs.second_price;
            if dip > self.config.dip_threshold {
                emit_signal(
                    &self.sink,
                    self.name(),
                    index,
                    format!("Stop out: {:.2}% below the add at {price:.2}", dip * 100.0),
                );
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn should_exit_short(&mut self, _frame: &SignalFrame<'_>, _index: usize) -> Result<bool, StrategyError> {
        Ok(false)
    }

    fn book(&self) -> &PositionBook {
        &self.book
    }

    fn book_mut(&mut self) -> &mut PositionBook {
        &mut self.book
    }

    /// First leg while flat, the remaining allocation for the add.
    fn size_position(&self, capital: f64, price: f64) -> f64 {
        if price <= 0.0 {
            return 0.0;
        }
        let ratio = if self.book.position() == PositionType::Long && !self.legs.added {
            1.0 - self.config.position_1_ratio
        } else {
            self.config.position_1_ratio
        };
        capital * ratio * self.config.leverage_multiplier / price
    }

    fn on_position_changed(&mut self, position: PositionType, price: f64, size: f64) {
        match (self.book.position(), position) {
            (PositionType::Long, PositionType::Long) if !self.legs.added => {
                self.legs.add(price, size);
                tracing::info!(
                    price,
                    size,
                    average = self.legs.average_price,
                    total = self.legs.total_size(),
                    "Position added"
                );
                self.book
                    .update(PositionType::Long, self.legs.average_price, self.legs.total_size());
            }
            (_, PositionType::Long) => {
                self.legs = Legs::open(price, size);
                self.book.update(position, price, size);
            }
            (_, PositionType::Flat) => {
                self.legs = Legs::default();
                self.book.clear();
            }
            (_, PositionType::Short) => {
                self.legs = Legs::default();
                self.book.update(position, price, size);
            }
        }
    }

    /// The add is checked before protective exits, which would otherwise pre-empt it.
    fn current_signal(&mut self, frame: &SignalFrame<'_>) -> Result<SignalType, StrategyError> {
        let Some(index) = frame.last_index() else {
            return Ok(SignalType::Hold);
        };
        let price = frame.close(index)?;

        let signal = match self.book.position() {
            PositionType::Flat => {
                if self.should_enter_long(frame, index)? {
                    SignalType::Buy
                } else {
                    SignalType::Hold
                }
            }
            PositionType::Long => {
                if self.wants_add(price) {
                    emit_signal(
                        &self.sink,
                        self.name(),
                        index,
                        format!(
                            "Add position: {:.2}% below first entry at {price:.2}",
                            self.dip_from_first(price) * 100.0
                        ),
                    );
                    SignalType::AddLong
                } else if self.check_stop_loss(price)
                    || self.check_take_profit(price)
                    || self.should_exit_long(frame, index)?
                {
                    SignalType::CloseLong
                } else {
                    SignalType::Hold
                }
            }
            PositionType::Short => SignalType::Hold,
        };
        Ok(signal)
    }

    fn reset(&mut self) {
        self.book.clear();
        self.cache.clear();
        self.legs = Legs::default();
    }

    fn state(&self) -> StrategyState {
        StrategyState {
            name: self.name().to_string(),
            position: self.book.position(),
            entry_price: self.book.entry_price(),
            size: self.book.size(),
            custom: serde_json::json!({
                "first_entry_price": self.legs.first_price,
                "second_entry_price": self.legs.second_price,
                "average_price": self.legs.average_price,
                "has_added": self.legs.added,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_support::series_from_closes;

    fn pump_series() -> Vec<f64> {
        let mut closes = vec![100.0; 11];
        closes.extend([102.0, 104.0, 106.0]);
        closes
    }

    #[test]
    fn test_config_validation() {
        assert!(MomentumDipConfig::default().validate().is_ok());

        let config = MomentumDipConfig {
            position_1_ratio: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_recompute_sees_updated_last_bar() {
        let mut strategy = MomentumDipStrategy::new(MomentumDipConfig::default());
        let series = series_from_closes(&[100.0; 30]);
        strategy.compute_signals(&series).unwrap();

        let mut bars = series.bars().to_vec();
        bars[29].volume *= 50.0;
        let updated = crate::common::test_support::series_from_bars(bars);

        let recomputed = strategy.compute_signals(&updated).unwrap();
        let fresh = MomentumDipStrategy::new(MomentumDipConfig::default())
            .compute_signals(&updated)
            .unwrap();

        assert_eq!(recomputed.value("volume_ma20", 29), fresh.value("volume_ma20", 29));
        assert_eq!(recomputed.value("volume_ma20", 29), Some(3450.0));
        assert_eq!(recomputed.value("volume_spike", 29), Some(1.0));
        assert_eq!(recomputed.column("atr"), fresh.column("atr"));
    }

    #[test]
    fn test_enters_on_pump() {
        let mut strategy = MomentumDipStrategy::new(MomentumDipConfig::default());
        let series = series_from_closes(&pump_series());
        let features = strategy.compute_signals(&series).unwrap();
        let frame = SignalFrame::new(&series, &features).unwrap();

        // 104 / 100 is below the threshold, 106 / 100 above it
        assert!(!strategy.should_enter_long(&frame, 12).unwrap());
        assert!(strategy.should_enter_long(&frame, 13).unwrap());
        assert!(!strategy.should_enter_short(&frame, 13).unwrap());

        strategy.on_position_changed(PositionType::Long, 106.0, 1.0);
        assert!(!strategy.should_enter_long(&frame, 13).unwrap());
    }

    #[test]
    fn test_leg_sizing() {
        let mut strategy = MomentumDipStrategy::new(MomentumDipConfig {
            position_1_ratio: 0.4,
            ..Default::default()
        });
        // 10_000 × 0.4 × 2 / 100
        assert!((strategy.size_position(10_000.0, 100.0) - 80.0).abs() < 1e-9);

        strategy.on_position_changed(PositionType::Long, 100.0, 80.0);
        assert!((strategy.size_position(10_000.0, 100.0) - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_add_recomputes_average() {
        let mut strategy = MomentumDipStrategy::new(MomentumDipConfig::default());
        strategy.on_position_changed(PositionType::Long, 100.0, 1.0);
        strategy.on_position_changed(PositionType::Long, 96.0, 3.0);

        assert!(strategy.has_added());
        assert!((strategy.average_price() - 97.0).abs() < 1e-9);
        assert!((strategy.book().size() - 4.0).abs() < 1e-9);
        assert!((strategy.book().entry_price() - 97.0).abs() < 1e-9);

        strategy.on_position_changed(PositionType::Flat, 0.0, 0.0);
        assert!(!strategy.has_added());
        assert_eq!(strategy.average_price(), 0.0);
    }

    #[test]
    fn test_current_signal_adds_on_dip() {
        let mut strategy = MomentumDipStrategy::new(MomentumDipConfig {
            risk: RiskParams {
                stop_loss: 0.05,
                ..Default::default()
            },
            ..Default::default()
        });
        let series = series_from_closes(&[100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 96.0]);
        let features = strategy.compute_signals(&series).unwrap();
        let frame = SignalFrame::new(&series, &features).unwrap();

        assert_eq!(strategy.current_signal(&frame).unwrap(), SignalType::Hold);

        strategy.on_position_changed(PositionType::Long, 100.0, 1.0);
        assert_eq!(strategy.current_signal(&frame).unwrap(), SignalType::AddLong);

        // after the add, 96 is on the add price, no exit yet
        strategy.on_position_changed(PositionType::Long, 96.0, 1.0);
        assert_eq!(strategy.current_signal(&frame).unwrap(), SignalType::Hold);
    }

    #[test]
    fn test_exit_rules() {
        let mut strategy = MomentumDipStrategy::new(MomentumDipConfig::default());
        let series = series_from_closes(&[100.0, 100.0, 100.0, 100.0, 100.0, 105.0, 92.0]);
        let features = strategy.compute_signals(&series).unwrap();
        let frame = SignalFrame::new(&series, &features).unwrap();

        strategy.on_position_changed(PositionType::Long, 100.0, 1.0);
        assert!(strategy.should_exit_long(&frame, 5).unwrap());
        // a dip without an add is not an exit
        assert!(!strategy.should_exit_long(&frame, 6).unwrap());

        strategy.on_position_changed(PositionType::Long, 96.0, 1.0);
        assert!(strategy.should_exit_long(&frame, 6).unwrap());
    }
}
