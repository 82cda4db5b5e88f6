//! Volatility indicators.

use crate::moving_average::Sma;
use statrs::statistics::Statistics;
use trading_core::traits::{Indicator, MultiOutputIndicator, OhlcvIndicator};
use trading_core::types::Bar;

/// Rolling sample standard deviation (n - 1 denominator).
#[derive(Debug, Clone)]
pub struct StdDev {
    period: usize,
}

impl StdDev {
    /// Create a new standard deviation indicator.
    pub fn new(period: usize) -> Self {
        assert!(period > 1, "Period must be greater than 1");
        Self { period }
    }
}

impl Indicator for StdDev {
    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        let mut result = vec![f64::NAN; data.len()];

        for (i, window) in data.windows(self.period).enumerate() {
            // NaN anywhere in the window propagates through the mean
            result[i + self.period - 1] = window.iter().std_dev();
        }

        result
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "StdDev"
    }
}

/// True range per bar. The first bar has no previous close and uses `high - low`.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let prev_close = i.checked_sub(1).map(|p| bars[p].close);
            bar.true_range(prev_close)
        })
        .collect()
}

/// Average True Range (ATR).
///
/// Simple rolling mean of the true range.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
}

impl Atr {
    /// Create a new ATR indicator.
    ///
    /// Common period is 14.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }
}

impl OhlcvIndicator for Atr {
    type Output = Vec<f64>;

    fn calculate(&self, bars: &[Bar]) -> Vec<f64> {
        Sma::new(self.period).calculate(&true_range(bars))
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "ATR"
    }
}

/// Bollinger band columns, aligned with the input.
#[derive(Debug, Clone, Default)]
pub struct BollingerSeries {
    pub upper: Vec<f64>,
    /// Middle band (SMA)
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

impl BollingerSeries {
    /// Bandwidth `(upper - lower) / middle` per position.
    pub fn bandwidth(&self) -> Vec<f64> {
        self.upper
            .iter()
            .zip(&self.lower)
            .zip(&self.middle)
            .map(|((u, l), m)| (u - l) / m)
            .collect()
    }

    /// %B `(price - lower) / (upper - lower)` per position.
    pub fn percent_b(&self, prices: &[f64]) -> Vec<f64> {
        prices
            .iter()
            .zip(self.upper.iter().zip(&self.lower))
            .map(|(p, (u, l))| (p - l) / (u - l))
            .collect()
    }
}

/// Bollinger Bands.
///
/// Consists of a middle band (SMA) with upper and lower bands
/// at a specified number of standard deviations.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    period: usize,
    std_dev_multiplier: f64,
}

impl BollingerBands {
    /// Create new Bollinger Bands with default parameters (20, 2.0).
    pub fn new() -> Self {
        Self::with_params(20, 2.0)
    }

    /// Create Bollinger Bands with custom parameters.
    pub fn with_params(period: usize, std_dev_multiplier: f64) -> Self {
        assert!(period > 1, "Period must be greater than 1");
        assert!(
            std_dev_multiplier > 0.0,
            "Std dev multiplier must be positive"
        );
        Self {
            period,
            std_dev_multiplier,
        }
    }
}

impl Default for BollingerBands {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiOutputIndicator for BollingerBands {
    type Outputs = BollingerSeries;

    fn calculate(&self, data: &[f64]) -> BollingerSeries {
        let middle = Sma::new(self.period).calculate(data);
        let std_dev = StdDev::new(self.period).calculate(data);

        let width: Vec<f64> = std_dev.iter().map(|s| s * self.std_dev_multiplier).collect();
        let upper = middle.iter().zip(&width).map(|(m, w)| m + w).collect();
        let lower = middle.iter().zip(&width).map(|(m, w)| m - w).collect();

        BollingerSeries {
            upper,
            middle,
            lower,
        }
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "Bollinger Bands"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(high: f64, low: f64, close: f64) -> Bar {
        Bar::new(0, close, high, low, close, 1.0)
    }

    #[test]
    fn test_std_dev_sample() {
        let result = StdDev::new(3).calculate(&[2.0, 4.0, 6.0, 8.0, 10.0]);

        assert_eq!(result.len(), 5);
        assert!(result[0].is_nan() && result[1].is_nan());
        // [2, 4, 6]: mean 4, sample variance (4 + 0 + 4) / 2 = 4
        assert!((result[2] - 2.0).abs() < 1e-12);
        assert!((result[4] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_std_dev_nan_propagates() {
        let result = StdDev::new(2).calculate(&[1.0, f64::NAN, 3.0, 5.0]);
        assert!(result[1].is_nan() && result[2].is_nan());
        assert!(!result[3].is_nan());
    }

    #[test]
    fn test_true_range_first_bar() {
        let bars = vec![bar(10.0, 8.0, 9.0), bar(12.0, 11.0, 11.5), bar(11.0, 7.0, 8.0)];
        let tr = true_range(&bars);
        assert_eq!(tr, vec![2.0, 3.0, 4.5]);
    }

    #[test]
    fn test_atr() {
        let bars = vec![
            bar(10.0, 8.0, 9.0),
            bar(11.0, 9.0, 10.0),
            bar(12.0, 10.0, 11.0),
            bar(11.0, 9.0, 10.0),
        ];
        let result = Atr::new(3).calculate(&bars);

        assert_eq!(result.len(), 4);
        assert!(result[1].is_nan());
        assert!((result[2] - 2.0).abs() < 1e-12);
        assert!((result[3] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_bollinger_bands() {
        let data: Vec<f64> = (0..30)
            .map(|i| 100.0 + (i as f64 * 0.1).sin() * 5.0)
            .collect();

        let result = BollingerBands::new().calculate(&data);
        assert_eq!(result.upper.len(), 30);
        assert!(result.middle[18].is_nan());

        for i in 19..30 {
            assert!(result.upper[i] > result.middle[i]);
            assert!(result.middle[i] > result.lower[i]);
        }
        assert!(result.bandwidth()[29] > 0.0);
    }

    #[test]
    fn test_bollinger_known_values() {
        let result = BollingerBands::with_params(3, 2.0).calculate(&[2.0, 4.0, 6.0]);
        assert!((result.middle[2] - 4.0).abs() < 1e-12);
        assert!((result.upper[2] - 8.0).abs() < 1e-12);
        assert!((result.lower[2] - 0.0).abs() < 1e-12);

        let pb = result.percent_b(&[2.0, 4.0, 6.0]);
        assert!((pb[2] - 0.75).abs() < 1e-12);
        assert!((result.bandwidth()[2] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_bollinger_constant_price_collapses() {
        let result = BollingerBands::with_params(5, 2.0).calculate(&[100.0; 5]);
        assert_eq!(result.upper[4], result.lower[4]);
        assert!(result.percent_b(&[100.0; 5])[4].is_nan());
    }
}
