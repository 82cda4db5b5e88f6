//! Helpers shared by the strategy implementations.

use serde::de::DeserializeOwned;
use trading_core::error::StrategyError;
use trading_core::events::{Event, SharedSink};
use trading_core::traits::StrategyConfig;

/// Deserialize and validate a JSON parameter object; missing keys take their defaults.
pub(crate) fn parse_config<C>(params: serde_json::Value) -> Result<C, StrategyError>
where
    C: StrategyConfig + DeserializeOwned,
{
    let params = if params.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        params
    };
    let config: C =
        serde_json::from_value(params).map_err(|e| StrategyError::InvalidConfig(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Report a decision through the sink.
pub(crate) fn emit_signal(sink: &SharedSink, strategy: &str, index: usize, message: String) {
    sink.emit(&Event::Signal {
        strategy: strategy.to_string(),
        index,
        message,
    });
}

pub(crate) fn require_positive(name: &str, value: f64) -> Result<(), StrategyError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(StrategyError::InvalidConfig(format!(
            "{name} must be positive, got {value}"
        )))
    }
}

pub(crate) fn require_period(name: &str, value: usize) -> Result<(), StrategyError> {
    if value == 0 {
        return Err(StrategyError::InvalidConfig(format!(
            "{name} must be greater than 0"
        )));
    }
    Ok(())
}
