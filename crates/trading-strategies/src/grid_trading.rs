//! Grid Trading Strategy.
//!
//! Lays a ladder of price levels around a recent mean and buys each time price falls
//! through a free level, selling once it climbs back through one at a profit. Suited to
//! ranging markets; it never opens shorts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use trading_core::{
    error::StrategyError,
    events::{SharedSink, TracingSink},
    traits::{Strategy, StrategyConfig, StrategyState},
    types::{BarSeries, FeatureMap, PositionBook, PositionType, RiskParams, SignalFrame},
};

use crate::common::{emit_signal, require_period, require_positive};

/// Closes averaged for the grid's base price.
const BASE_WINDOW: usize = 50;

/// Minimum profit before a level crossing closes a trade.
const MIN_GRID_PROFIT: f64 = 0.01;

/// Level spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridMode {
    /// Evenly spaced prices
    #[default]
    Arithmetic,
    /// Evenly spaced log prices
    Geometric,
}

/// Configuration for the grid strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Number of intervals; the grid has one more level than this
    pub grid_num: usize,
    /// Half-width of the grid as a fraction of the base price
    pub price_range: f64,
    pub grid_mode: GridMode,
    /// Deviation of the last close from the base that rebuilds the grid
    pub rebalance_threshold: f64,
    #[serde(flatten)]
    pub risk: RiskParams,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            grid_num: 10,
            price_range: 0.2,
            grid_mode: GridMode::Arithmetic,
            rebalance_threshold: 0.3,
            risk: RiskParams::default(),
        }
    }
}

impl StrategyConfig for GridConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        require_period("grid_num", self.grid_num)?;
        require_positive("price_range", self.price_range)?;
        require_positive("rebalance_threshold", self.rebalance_threshold)?;
        if self.price_range >= 1.0 {
            return Err(StrategyError::InvalidConfig(
                "price_range must be less than 1".into(),
            ));
        }
        self.risk.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

/// Grid Trading Strategy.
pub struct GridTradingStrategy {
    config: GridConfig,
    book: PositionBook,
    sink: SharedSink,
    base_price: Option<f64>,
    levels: Vec<f64>,
    /// Levels holding an open position
    occupied: BTreeSet<usize>,
    /// Level recorded when the current position opened
    entry_level: Option<usize>,
}

impl GridTradingStrategy {
    pub fn new(config: GridConfig) -> Self {
        Self {
            book: PositionBook::new(config.risk),
            config,
            sink: TracingSink::shared(),
            base_price: None,
            levels: Vec::new(),
            occupied: BTreeSet::new(),
            entry_level: None,
        }
    }

    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn base_price(&self) -> Option<f64> {
        self.base_price
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    fn needs_rebalance(&self, last_close: f64) -> bool {
        match self.base_price {
            None => true,
            Some(base) => {
                let deviation = (last_close - base).abs() / base;
                if deviation > self.config.rebalance_threshold {
                    tracing::info!(deviation, "Rebalancing grid");
                    true
                } else {
                    false
                }
            }
        }
    }

    fn build_grid(&mut self, base: f64) {
        let lower = base * (1.0 - self.config.price_range);
        let upper = base * (1.0 + self.config.price_range);
        let n = self.config.grid_num;

        self.levels = (0..=n)
            .map(|i| {
                let t = i as f64 / n as f64;
                match self.config.grid_mode {
                    GridMode::Arithmetic => lower + (upper - lower) * t,
                    GridMode::Geometric => lower * (upper / lower).powf(t),
                }
            })
            .collect();
        self.base_price = Some(base);

        tracing::info!(base, lower, upper, levels = self.levels.len(), "Grid set up");
    }

    /// Index of the first level at or above `price`, else the top level.
    fn level_of(&self, price: f64) -> Option<usize> {
        if self.levels.is_empty() {
            return None;
        }
        Some(
            self.levels
                .iter()
                .position(|&g| price <= g)
                .unwrap_or(self.levels.len() - 1),
        )
    }

    /// First level crossed between two closes, scanning from the bottom.
    fn crossed_level(&self, prev: f64, cur: f64, direction: Direction) -> Option<usize> {
        self.levels.iter().position(|&g| match direction {
            Direction::Down => prev > g && g >= cur,
            Direction::Up => prev < g && g <= cur,
        })
    }

    /// Previous and current close, once the grid exists.
    fn closes(&self, frame: &SignalFrame<'_>, index: usize) -> Result<Option<(f64, f64)>, StrategyError> {
        if index < 1 || self.levels.is_empty() {
            return Ok(None);
        }
        Ok(Some((frame.close(index - 1)?, frame.close(index)?)))
    }
}

impl Strategy for GridTradingStrategy {
    fn name(&self) -> &str {
        "Grid Trading"
    }

    fn description(&self) -> &str {
        "Buys falls through a price grid and sells the rebound in ranging markets"
    }

    fn warmup_period(&self) -> usize {
        2
    }

    fn compute_signals(&mut self, series: &BarSeries) -> Result<FeatureMap, StrategyError> {
        let closes = series.closes();
        let mut features = FeatureMap::new(closes.len());
        let Some(&last) = closes.last() else {
            return Ok(features);
        };

        if self.needs_rebalance(last) {
            let recent = &closes[closes.len().saturating_sub(BASE_WINDOW)..];
            let base = recent.iter().sum::<f64>() / recent.len() as f64;
            self.build_grid(base);
        }

        let (bottom, top) = (self.levels[0], self.levels[self.levels.len() - 1]);
        let base = self.base_price.unwrap_or(f64::NAN);

        let level: Vec<f64> = closes
            .iter()
            .map(|&c| self.level_of(c).map_or(f64::NAN, |l| l as f64))
            .collect();
        let position: Vec<f64> = closes
            .iter()
            .map(|&c| ((c - bottom) / (top - bottom)).clamp(0.0, 1.0))
            .collect();

        features.insert("grid_level", level)?;
        features.insert("grid_position", position)?;
        features.insert("grid_base", vec![base; closes.len()])?;
        Ok(features)
    }

    fn should_enter_long(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        let Some((prev, cur)) = self.closes(frame, index)? else {
            return Ok(false);
        };
        match self.crossed_level(prev, cur, Direction::Down) {
            Some(level) if !self.occupied.contains(&level) => {
                emit_signal(
                    &self.sink,
                    self.name(),
                    index,
                    format!("Price crossed down to grid {level} at {cur:.2}"),
                );
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn should_enter_short(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        if let Some((prev, cur)) = self.closes(frame, index)? {
            if let Some(level) = self.crossed_level(prev, cur, Direction::Up) {
                tracing::debug!(level, price = cur, "Upward grid crossing, shorts disabled");
            }
        }
        Ok(false)
    }

    fn should_exit_long(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        let Some((prev, cur)) = self.closes(frame, index)? else {
            return Ok(false);
        };
        let entry = self.book.entry_price();
        if self.book.position() != PositionType::Long || entry <= 0.0 {
            return Ok(false);
        }
        let Some(level) = self.crossed_level(prev, cur, Direction::Up) else {
            return Ok(false);
        };

        let profit = (cur - entry) / entry;
        if profit > MIN_GRID_PROFIT {
            emit_signal(
                &self.sink,
                self.name(),
                index,
                format!("Exit long: crossed up to grid {level}, profit {:.2}%", profit * 100.0),
            );
            return Ok(true);
        }
        Ok(false)
    }

    fn should_exit_short(&mut self, frame: &SignalFrame<'_>, index: usize) -> Result<bool, StrategyError> {
        let Some((prev, cur)) = self.closes(frame, index)? else {
            return Ok(false);
        };
        let entry = self.book.entry_price();
        if self.book.position() != PositionType::Short || entry <= 0.0 {
            return Ok(false);
        }
        let Some(level) = self.crossed_level(prev, cur, Direction::Down) else {
            return Ok(false);
        };

        let profit = (entry - cur) / entry;
        if profit > MIN_GRID_PROFIT {
            emit_signal(
                &self.sink,
                self.name(),
                index,
                format!("Exit short: crossed down to grid {level}, profit {:.2}%", profit * 100.0),
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

    fn on_position_changed(&mut self, position: PositionType, price: f64, size: f64) {
        match position {
            PositionType::Long | PositionType::Short => {
                if let Some(level) = self.level_of(price) {
                    self.occupied.insert(level);
                    self.entry_level = Some(level);
                }
            }
            PositionType::Flat => {
                if let Some(level) = self.entry_level.take() {
                    self.occupied.remove(&level);
                }
            }
        }
        self.book.update(position, price, size);
    }

    fn reset(&mut self) {
        self.book.clear();
        self.base_price = None;
        self.levels.clear();
        self.occupied.clear();
        self.entry_level = None;
    }

    fn state(&self) -> StrategyState {
        StrategyState {
            name: self.name().to_string(),
            position: self.book.position(),
            entry_price: self.book.entry_price(),
            size: self.book.size(),
            custom: serde_json::json!({
                "base_price": self.base_price,
                "levels": self.levels,
                "occupied": self.occupied,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_support::series_from_closes;

    fn dip_then_recover() -> Vec<f64> {
        let mut closes = vec![100.0; 20];
        closes.extend([95.0, 101.0]);
        closes
    }

    #[test]
    fn test_config_validation() {
        assert!(GridConfig::default().validate().is_ok());

        let config = GridConfig {
            grid_num: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = GridConfig {
            price_range: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_arithmetic_levels() {
        let mut strategy = GridTradingStrategy::new(GridConfig::default());
        let series = series_from_closes(&[97.0, 103.0]);
        let features = strategy.compute_signals(&series).unwrap();

        let levels = strategy.levels();
        assert_eq!(levels.len(), 11);
        assert!((levels[0] - 80.0).abs() < 1e-9);
        assert!((levels[5] - 100.0).abs() < 1e-9);
        assert!((levels[10] - 120.0).abs() < 1e-9);
        assert_eq!(features.value("grid_level", 0), Some(5.0));
        assert_eq!(features.value("grid_level", 1), Some(6.0));
        assert_eq!(features.value("grid_base", 1), Some(100.0));
    }

    #[test]
    fn test_geometric_levels_have_constant_ratio() {
        let mut strategy = GridTradingStrategy::new(GridConfig {
            grid_mode: GridMode::Geometric,
            grid_num: 4,
            ..Default::default()
        });
        strategy.compute_signals(&series_from_closes(&[100.0; 5])).unwrap();

        let levels = strategy.levels();
        let ratio = levels[1] / levels[0];
        for pair in levels.windows(2) {
            assert!((pair[1] / pair[0] - ratio).abs() < 1e-12);
        }
        assert!((levels[4] - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_rebalance_on_large_deviation() {
        let mut strategy = GridTradingStrategy::new(GridConfig::default());
        strategy.compute_signals(&series_from_closes(&[100.0; 10])).unwrap();
        assert_eq!(strategy.base_price(), Some(100.0));

        // within the threshold the grid stays put
        strategy.compute_signals(&series_from_closes(&[100.0, 120.0])).unwrap();
        assert_eq!(strategy.base_price(), Some(100.0));

        strategy.compute_signals(&series_from_closes(&[140.0; 3])).unwrap();
        assert_eq!(strategy.base_price(), Some(140.0));
    }

    #[test]
    fn test_occupied_level_blocks_entry_until_flat() {
        let mut strategy = GridTradingStrategy::new(GridConfig::default());
        let series = series_from_closes(&dip_then_recover());
        let features = strategy.compute_signals(&series).unwrap();
        let frame = SignalFrame::new(&series, &features).unwrap();

        assert!(strategy.should_enter_long(&frame, 20).unwrap());
        assert!(!strategy.should_enter_short(&frame, 21).unwrap());

        strategy.on_position_changed(PositionType::Long, 95.0, 1.0);
        assert!(!strategy.should_enter_long(&frame, 20).unwrap());

        strategy.on_position_changed(PositionType::Flat, 0.0, 0.0);
        assert!(strategy.should_enter_long(&frame, 20).unwrap());
    }

    #[test]
    fn test_exit_long_needs_crossing_and_profit() {
        let mut strategy = GridTradingStrategy::new(GridConfig::default());
        let series = series_from_closes(&dip_then_recover());
        let features = strategy.compute_signals(&series).unwrap();
        let frame = SignalFrame::new(&series, &features).unwrap();

        strategy.on_position_changed(PositionType::Long, 95.0, 1.0);
        assert!(strategy.should_exit_long(&frame, 21).unwrap());

        // same crossing without enough profit
        strategy.on_position_changed(PositionType::Flat, 0.0, 0.0);
        strategy.on_position_changed(PositionType::Long, 100.5, 1.0);
        assert!(!strategy.should_exit_long(&frame, 21).unwrap());
    }

    #[test]
    fn test_no_decisions_without_grid() {
        let mut strategy = GridTradingStrategy::new(GridConfig::default());
        let series = series_from_closes(&dip_then_recover());
        let features = FeatureMap::new(series.len());
        let frame = SignalFrame::new(&series, &features).unwrap();

        assert!(!strategy.should_enter_long(&frame, 20).unwrap());
    }
}
