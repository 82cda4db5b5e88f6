//! Momentum indicators.

use crate::moving_average::{Ema, Sma};
use crate::rolling::{RollingMax, RollingMin};
use trading_core::error::IndicatorError;
use trading_core::traits::{Indicator, MultiOutputIndicator, OhlcvIndicator};
use trading_core::types::Bar;

/// Relative Strength Index (RSI).
///
/// Average gain and average loss are plain rolling means over the period. The first
/// price change is counted as zero, so the first RSI value lands at index `period - 1`.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
}

impl Rsi {
    /// Create a new RSI indicator.
    ///
    /// Common periods are 14 (default) or 9.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }
}

impl Indicator for Rsi {
    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        let mut gains = vec![0.0; data.len()];
        let mut losses = vec![0.0; data.len()];

        for i in 1..data.len() {
            let change = data[i] - data[i - 1];
            if change > 0.0 {
                gains[i] = change;
            } else if change < 0.0 {
                losses[i] = -change;
            }
        }

        let sma = Sma::new(self.period);
        let avg_gains = sma.calculate(&gains);
        let avg_losses = sma.calculate(&losses);

        avg_gains
            .iter()
            .zip(&avg_losses)
            .map(|(&gain, &loss)| {
                // gain / 0 -> inf -> 100; 0 / 0 stays NaN
                let rs = gain / loss;
                100.0 - 100.0 / (1.0 + rs)
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "RSI"
    }
}

/// MACD columns, aligned with the input.
#[derive(Debug, Clone, Default)]
pub struct MacdSeries {
    /// MACD line (fast EMA - slow EMA)
    pub macd: Vec<f64>,
    /// Signal line (EMA of MACD)
    pub signal: Vec<f64>,
    /// Histogram (MACD - Signal)
    pub histogram: Vec<f64>,
}

/// MACD indicator.
///
/// Three passes of [`Ema`]: fast and slow over the input, then the signal span over
/// their difference.
#[derive(Debug, Clone)]
pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
}

impl Macd {
    /// Create a new MACD with default parameters (12, 26, 9).
    pub fn new() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
        }
    }

    /// Create a MACD with custom periods.
    pub fn with_periods(fast: usize, slow: usize, signal: usize) -> Result<Self, IndicatorError> {
        if fast == 0 || slow == 0 || signal == 0 {
            return Err(IndicatorError::InvalidParameter(
                "MACD periods must be greater than 0".into(),
            ));
        }
        if fast >= slow {
            return Err(IndicatorError::InvalidParameter(format!(
                "fast period ({fast}) must be less than slow period ({slow})"
            )));
        }
        Ok(Self {
            fast_period: fast,
            slow_period: slow,
            signal_period: signal,
        })
    }
}

impl Default for Macd {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiOutputIndicator for Macd {
    type Outputs = MacdSeries;

    fn calculate(&self, data: &[f64]) -> MacdSeries {
        let fast = Ema::new(self.fast_period).calculate(data);
        let slow = Ema::new(self.slow_period).calculate(data);

        let macd: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let signal = Ema::new(self.signal_period).calculate(&macd);
        let histogram = macd.iter().zip(&signal).map(|(m, s)| m - s).collect();

        MacdSeries {
            macd,
            signal,
            histogram,
        }
    }

    fn period(&self) -> usize {
        self.slow_period.max(self.signal_period)
    }

    fn name(&self) -> &str {
        "MACD"
    }
}

/// Stochastic oscillator columns.
#[derive(Debug, Clone, Default)]
pub struct StochasticSeries {
    /// %K (fast stochastic)
    pub k: Vec<f64>,
    /// %D (SMA of %K)
    pub d: Vec<f64>,
}

/// Stochastic oscillator.
///
/// Compares the close to the high/low range of the last `k_period` bars. %K is NaN
/// when that range is zero.
#[derive(Debug, Clone)]
pub struct Stochastic {
    k_period: usize,
    d_period: usize,
}

impl Stochastic {
    /// Create a new stochastic oscillator with default parameters (14, 3).
    pub fn new() -> Self {
        Self::with_periods(14, 3)
    }

    /// Create with custom periods.
    pub fn with_periods(k_period: usize, d_period: usize) -> Self {
        assert!(k_period > 0 && d_period > 0);
        Self { k_period, d_period }
    }
}

impl Default for Stochastic {
    fn default() -> Self {
        Self::new()
    }
}

impl OhlcvIndicator for Stochastic {
    type Output = StochasticSeries;

    fn calculate(&self, bars: &[Bar]) -> StochasticSeries {
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();

        let highest = RollingMax::new(self.k_period).calculate(&highs);
        let lowest = RollingMin::new(self.k_period).calculate(&lows);

        let k: Vec<f64> = bars
            .iter()
            .zip(highest.iter().zip(&lowest))
            .map(|(bar, (&hh, &ll))| {
                let range = hh - ll;
                if range == 0.0 {
                    f64::NAN
                } else {
                    100.0 * (bar.close - ll) / range
                }
            })
            .collect();
        let d = Sma::new(self.d_period).calculate(&k);

        StochasticSeries { k, d }
    }

    fn period(&self) -> usize {
        self.k_period + self.d_period - 1
    }

    fn name(&self) -> &str {
        "Stochastic"
    }
}

/// Fractional change over `n` steps: `(x[i] - x[i-n]) / x[i-n]`.
#[derive(Debug, Clone)]
pub struct PercentChange {
    periods: usize,
}

impl PercentChange {
    pub fn new(periods: usize) -> Self {
        assert!(periods > 0, "Period must be greater than 0");
        Self { periods }
    }
}

impl Indicator for PercentChange {
    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        (0..data.len())
            .map(|i| {
                if i < self.periods {
                    f64::NAN
                } else {
                    let base = data[i - self.periods];
                    (data[i] - base) / base
                }
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.periods + 1
    }

    fn name(&self) -> &str {
        "PCT_CHANGE"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(high: f64, low: f64, close: f64) -> Bar {
        Bar::new(0, close, high, low, close, 1.0)
    }

    #[test]
    fn test_rsi_basic() {
        let rsi = Rsi::new(14);
        let data: Vec<f64> = (0..30)
            .map(|i| 100.0 + (i as f64 * 0.5).sin() * 5.0)
            .collect();

        let result = rsi.calculate(&data);
        assert_eq!(result.len(), data.len());
        assert!(result[..13].iter().all(|v| v.is_nan()));

        for value in &result[13..] {
            assert!(*value >= 0.0 && *value <= 100.0);
        }
    }

    #[test]
    fn test_rsi_all_gains() {
        let result = Rsi::new(5).calculate(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert!((result[4] - 100.0).abs() < 1e-10);
        assert!((result[6] - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_rsi_all_losses() {
        let result = Rsi::new(5).calculate(&[7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0]);
        assert!(result[6].abs() < 1e-10);
    }

    #[test]
    fn test_rsi_flat_is_nan() {
        let result = Rsi::new(3).calculate(&[5.0; 6]);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_rsi_known_value() {
        // changes: 0, +2, -1, +1 -> gains 3/3, losses 1/3 over the last three
        let result = Rsi::new(3).calculate(&[10.0, 10.0, 12.0, 11.0, 12.0]);
        assert!((result[4] - 75.0).abs() < 1e-10);
    }

    #[test]
    fn test_macd_uptrend() {
        let data: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();
        let result = Macd::new().calculate(&data);

        assert_eq!(result.macd.len(), 50);
        assert_eq!(result.histogram.len(), 50);
        assert!(result.macd[0].abs() < 1e-12);
        assert!(*result.macd.last().unwrap() > 0.0);
    }

    #[test]
    fn test_macd_histogram_identity() {
        let macd = Macd::with_periods(5, 10, 3).unwrap();
        let data: Vec<f64> = (0..30).map(|i| 100.0 + (i as f64 * 0.3).cos()).collect();
        let result = macd.calculate(&data);

        for i in 0..data.len() {
            let expected = result.macd[i] - result.signal[i];
            assert!((result.histogram[i] - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_macd_rejects_inverted_periods() {
        assert!(Macd::with_periods(26, 12, 9).is_err());
        assert!(Macd::with_periods(0, 12, 9).is_err());
    }

    #[test]
    fn test_stochastic_at_high() {
        let stoch = Stochastic::with_periods(5, 3);
        let bars: Vec<Bar> = (0..8)
            .map(|i| bar(10.0 + i as f64, 5.0 + i as f64, 10.0 + i as f64))
            .collect();

        let result = stoch.calculate(&bars);
        assert_eq!(result.k.len(), 8);
        assert!(result.k[3].is_nan());
        assert!((result.k[7] - 100.0).abs() < 1e-10);
        assert!((result.d[7] - 100.0).abs() < 1e-10);
        assert!(result.d[5].is_nan());
    }

    #[test]
    fn test_stochastic_flat_range_is_nan() {
        let bars = vec![bar(10.0, 10.0, 10.0); 4];
        let result = Stochastic::with_periods(2, 2).calculate(&bars);
        assert!(result.k.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_percent_change() {
        let result = PercentChange::new(2).calculate(&[100.0, 50.0, 110.0, 55.0]);
        assert!(result[0].is_nan() && result[1].is_nan());
        assert!((result[2] - 0.1).abs() < 1e-12);
        assert!((result[3] - 0.1).abs() < 1e-12);
    }
}
