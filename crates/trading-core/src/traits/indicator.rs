//! Indicator trait definitions.
//!
//! Every indicator returns output aligned with its input: one value per input
//! position, NaN where not enough history exists yet.

use crate::types::Bar;

/// Single-column indicator over a numeric sequence.
pub trait Indicator: Send + Sync {
    /// Calculate indicator values aligned with `data`.
    fn calculate(&self, data: &[f64]) -> Vec<f64>;

    /// Minimum number of inputs before the first defined value.
    fn period(&self) -> usize;

    /// Get the name of the indicator.
    fn name(&self) -> &str;

    /// Index of the first defined value for clean input.
    fn first_valid_index(&self) -> usize {
        self.period().saturating_sub(1)
    }
}

/// Indicator producing several aligned columns (e.g. Bollinger Bands, MACD).
pub trait MultiOutputIndicator: Send + Sync {
    /// Struct holding the output columns.
    type Outputs;

    fn calculate(&self, data: &[f64]) -> Self::Outputs;

    fn period(&self) -> usize;

    fn name(&self) -> &str;
}

/// Indicator that needs full bars rather than a single price column.
pub trait OhlcvIndicator: Send + Sync {
    type Output;

    fn calculate(&self, bars: &[Bar]) -> Self::Output;

    fn period(&self) -> usize;

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RollingSum {
        period: usize,
    }

    impl Indicator for RollingSum {
        fn calculate(&self, data: &[f64]) -> Vec<f64> {
            (0..data.len())
                .map(|i| {
                    if i + 1 < self.period {
                        f64::NAN
                    } else {
                        data[i + 1 - self.period..=i].iter().sum()
                    }
                })
                .collect()
        }

        fn period(&self) -> usize {
            self.period
        }

        fn name(&self) -> &str {
            "sum"
        }
    }

    #[test]
    fn test_output_is_aligned() {
        let indicator = RollingSum { period: 3 };
        let result = indicator.calculate(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        assert_eq!(result.len(), 5);
        assert!(result[0].is_nan() && result[1].is_nan());
        assert!((result[2] - 6.0).abs() < 1e-12);
        assert!((result[4] - 12.0).abs() < 1e-12);
        assert_eq!(indicator.first_valid_index(), 2);
    }
}
