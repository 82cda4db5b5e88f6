//! Strategy registry for dynamic strategy loading.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use trading_core::{error::StrategyError, events::SharedSink, traits::Strategy};

use crate::common::parse_config;
use crate::{
    BollingerConfig, BollingerStrategy, BreakoutPullbackConfig, BreakoutPullbackStrategy, GridConfig,
    GridTradingStrategy, MACrossoverConfig, MACrossoverStrategy, MacdConfig, MacdStrategy,
    MomentumDipConfig, MomentumDipStrategy, RsiConfig, RsiStrategy,
};

/// Builds a strategy from JSON parameters, reporting through `sink`.
pub type StrategyConstructor = fn(Value, SharedSink) -> Result<Box<dyn Strategy>, StrategyError>;

/// Information about a registered strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyInfo {
    /// Identifier used on the command line and in configuration
    pub id: String,
    /// Display name
    pub name: String,
    pub description: String,
    /// Default parameters as JSON
    pub default_params: Value,
}

/// Registry for available trading strategies, in registration order.
pub struct StrategyRegistry {
    entries: Vec<(StrategyInfo, StrategyConstructor)>,
}

fn defaults<C: Serialize + Default>() -> Value {
    serde_json::to_value(C::default()).unwrap_or(Value::Null)
}

impl StrategyRegistry {
    /// Create a new strategy registry with all built-in strategies.
    pub fn new() -> Self {
        let mut registry = Self { entries: Vec::new() };

        registry.register(
            "ma_crossover",
            "MA Crossover",
            "Trades short/long simple moving average crossovers",
            defaults::<MACrossoverConfig>(),
            |params, sink| {
                let config: MACrossoverConfig = parse_config(params)?;
                Ok(Box::new(MACrossoverStrategy::new(config).with_sink(sink)))
            },
        );

        registry.register(
            "rsi",
            "RSI",
            "Trades RSI moves out of the oversold and overbought zones",
            defaults::<RsiConfig>(),
            |params, sink| {
                let config: RsiConfig = parse_config(params)?;
                Ok(Box::new(RsiStrategy::new(config).with_sink(sink)))
            },
        );

        registry.register(
            "bollinger_bands",
            "Bollinger Bands",
            "Mean reversion or squeeze breakouts around Bollinger Bands",
            defaults::<BollingerConfig>(),
            |params, sink| {
                let config: BollingerConfig = parse_config(params)?;
                Ok(Box::new(BollingerStrategy::new(config).with_sink(sink)))
            },
        );

        registry.register(
            "macd",
            "MACD",
            "Follows MACD signal line crossings with histogram and zero line confirmation",
            defaults::<MacdConfig>(),
            |params, sink| {
                let config: MacdConfig = parse_config(params)?;
                Ok(Box::new(MacdStrategy::new(config).with_sink(sink)))
            },
        );

        registry.register(
            "grid_trading",
            "Grid Trading",
            "Buys falls through a price grid and sells the rebound in ranging markets",
            defaults::<GridConfig>(),
            |params, sink| {
                let config: GridConfig = parse_config(params)?;
                Ok(Box::new(GridTradingStrategy::new(config).with_sink(sink)))
            },
        );

        registry.register(
            "breakout_pullback",
            "Breakout Pullback",
            "Enters on the retest after a support or resistance breakout",
            defaults::<BreakoutPullbackConfig>(),
            |params, sink| {
                let config: BreakoutPullbackConfig = parse_config(params)?;
                Ok(Box::new(BreakoutPullbackStrategy::new(config).with_sink(sink)))
            },
        );

        registry.register(
            "momentum_dip_buying",
            "Momentum Dip Buying",
            "Buys fast pumps with half size and adds the other half on the first dip",
            defaults::<MomentumDipConfig>(),
            |params, sink| {
                let config: MomentumDipConfig = parse_config(params)?;
                Ok(Box::new(MomentumDipStrategy::new(config).with_sink(sink)))
            },
        );

        registry
    }

    /// Add a strategy, replacing any previous registration under `id`.
    pub fn register(
        &mut self,
        id: &str,
        name: &str,
        description: &str,
        default_params: Value,
        constructor: StrategyConstructor,
    ) {
        let info = StrategyInfo {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            default_params,
        };
        match self.entries.iter_mut().find(|(existing, _)| existing.id == id) {
            Some(entry) => *entry = (info, constructor),
            None => self.entries.push((info, constructor)),
        }
    }

    /// List all available strategies.
    pub fn list(&self) -> Vec<&StrategyInfo> {
        self.entries.iter().map(|(info, _)| info).collect()
    }

    /// Get strategy info by identifier.
    pub fn get(&self, id: &str) -> Option<&StrategyInfo> {
        self.entries
            .iter()
            .find(|(info, _)| info.id == id)
            .map(|(info, _)| info)
    }

    /// Check if a strategy exists.
    pub fn exists(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|(info, _)| info.id.as_str()).collect()
    }

    /// Create a strategy instance; parameters missing from `params` take their defaults.
    pub fn create(
        &self,
        id: &str,
        params: Value,
        sink: SharedSink,
    ) -> Result<Box<dyn Strategy>, StrategyError> {
        let (_, constructor) = self
            .entries
            .iter()
            .find(|(info, _)| info.id == id)
            .ok_or_else(|| StrategyError::NotFound(id.to_string()))?;
        tracing::debug!(strategy = id, %params, "Creating strategy");
        constructor(params, sink)
    }

    /// Create a strategy with default configuration.
    pub fn create_default(&self, id: &str, sink: SharedSink) -> Result<Box<dyn Strategy>, StrategyError> {
        self.create(id, Value::Null, sink)
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}
