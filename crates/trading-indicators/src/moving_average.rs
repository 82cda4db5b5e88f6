//! Moving average indicators.

use trading_core::traits::Indicator;

/// Simple Moving Average (SMA).
///
/// Arithmetic mean of the last N values. A window containing NaN yields NaN.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
}

impl Sma {
    /// Create a new SMA with the specified period.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }
}

impl Indicator for Sma {
    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        let mut result = vec![f64::NAN; data.len()];
        let period_f64 = self.period as f64;
        let mut sum = 0.0;
        let mut nans = 0usize;

        // Sliding window
        for i in 0..data.len() {
            let incoming = data[i];
            if incoming.is_nan() {
                nans += 1;
            } else {
                sum += incoming;
            }

            if i >= self.period {
                let outgoing = data[i - self.period];
                if outgoing.is_nan() {
                    nans -= 1;
                } else {
                    sum -= outgoing;
                }
            }

            if i + 1 >= self.period && nans == 0 {
                result[i] = sum / period_f64;
            }
        }

        result
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "SMA"
    }
}

/// Exponential Moving Average (EMA).
///
/// Smoothing factor `2 / (period + 1)`, seeded with the first finite value so output is
/// defined from there on. Leading NaN inputs stay NaN; a NaN after the seed repeats the
/// previous average.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    multiplier: f64,
}

impl Ema {
    /// Create a new EMA with the specified period.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        let multiplier = 2.0 / (period as f64 + 1.0);
        Self { period, multiplier }
    }

    /// Span the smoothing factor was derived from.
    pub fn span(&self) -> usize {
        self.period
    }
}

impl Indicator for Ema {
    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        let mut result = Vec::with_capacity(data.len());
        let one_minus_mult = 1.0 - self.multiplier;
        let mut ema: Option<f64> = None;

        for &price in data {
            if !price.is_nan() {
                ema = Some(match ema {
                    None => price,
                    Some(prev) => price * self.multiplier + prev * one_minus_mult,
                });
            }
            result.push(ema.unwrap_or(f64::NAN));
        }

        result
    }

    fn period(&self) -> usize {
        1
    }

    fn name(&self) -> &str {
        "EMA"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma() {
        let sma = Sma::new(3);
        let result = sma.calculate(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        assert_eq!(result.len(), 5);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert!((result[2] - 2.0).abs() < 1e-10); // (1+2+3)/3
        assert!((result[3] - 3.0).abs() < 1e-10);
        assert!((result[4] - 4.0).abs() < 1e-10);
    }

    #[test]
    fn test_sma_insufficient_data() {
        let result = Sma::new(5).calculate(&[1.0, 2.0, 3.0]);
        assert_eq!(result.len(), 3);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_sma_nan_window() {
        let result = Sma::new(2).calculate(&[f64::NAN, 2.0, 4.0, 6.0]);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert!((result[2] - 3.0).abs() < 1e-10);
        assert!((result[3] - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_ema_seeded_with_first_value() {
        let ema = Ema::new(3);
        let result = ema.calculate(&[1.0, 2.0, 3.0, 4.0]);

        // multiplier = 0.5
        assert!((result[0] - 1.0).abs() < 1e-10);
        assert!((result[1] - 1.5).abs() < 1e-10);
        assert!((result[2] - 2.25).abs() < 1e-10);
        assert!((result[3] - 3.125).abs() < 1e-10);
    }

    #[test]
    fn test_ema_leading_nan() {
        let result = Ema::new(3).calculate(&[f64::NAN, f64::NAN, 4.0, 6.0]);
        assert!(result[0].is_nan() && result[1].is_nan());
        assert!((result[2] - 4.0).abs() < 1e-10);
        assert!((result[3] - 5.0).abs() < 1e-10);
    }
}
