//! Rolling window extremes.

use trading_core::traits::Indicator;

fn rolling_extreme(data: &[f64], period: usize, pick: fn(f64, f64) -> f64) -> Vec<f64> {
    let mut result = vec![f64::NAN; data.len()];
    if period == 0 {
        return result;
    }

    for (i, window) in data.windows(period).enumerate() {
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[i + period - 1] = window.iter().copied().reduce(pick).unwrap_or(f64::NAN);
    }

    result
}

/// Highest value over the last N inputs.
#[derive(Debug, Clone)]
pub struct RollingMax {
    period: usize,
}

impl RollingMax {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }
}

impl Indicator for RollingMax {
    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        rolling_extreme(data, self.period, f64::max)
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "MAX"
    }
}

/// Lowest value over the last N inputs.
#[derive(Debug, Clone)]
pub struct RollingMin {
    period: usize,
}

impl RollingMin {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }
}

impl Indicator for RollingMin {
    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        rolling_extreme(data, self.period, f64::min)
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "MIN"
    }
}
