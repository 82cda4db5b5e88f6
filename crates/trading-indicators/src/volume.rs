//! Volume-weighted indicators.

use trading_core::traits::OhlcvIndicator;
use trading_core::types::Bar;

/// On-Balance Volume.
///
/// Running sum of volume signed by the direction of the close; the first value is 0.
#[derive(Debug, Clone, Default)]
pub struct Obv;

impl OhlcvIndicator for Obv {
    type Output = Vec<f64>;

    fn calculate(&self, bars: &[Bar]) -> Vec<f64> {
        let mut result = Vec::with_capacity(bars.len());
        let mut total = 0.0;

        for (i, bar) in bars.iter().enumerate() {
            if i > 0 {
                let change = bar.close - bars[i - 1].close;
                if change > 0.0 {
                    total += bar.volume;
                } else if change < 0.0 {
                    total -= bar.volume;
                }
            }
            result.push(total);
        }

        result
    }

    fn period(&self) -> usize {
        1
    }

    fn name(&self) -> &str {
        "OBV"
    }
}

/// Cumulative volume-weighted average of the typical price.
#[derive(Debug, Clone, Default)]
pub struct Vwap;

impl OhlcvIndicator for Vwap {
    type Output = Vec<f64>;

    fn calculate(&self, bars: &[Bar]) -> Vec<f64> {
        let mut pv = 0.0;
        let mut volume = 0.0;

        bars.iter()
            .map(|bar| {
                pv += bar.typical_price() * bar.volume;
                volume += bar.volume;
                pv / volume
            })
            .collect()
    }

    fn period(&self) -> usize {
        1
    }

    fn name(&self) -> &str {
        "VWAP"
    }
}
