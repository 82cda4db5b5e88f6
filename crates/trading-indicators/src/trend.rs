//! Trend strength indicators.

use crate::moving_average::Sma;
use crate::volatility::Atr;
use trading_core::traits::{Indicator, OhlcvIndicator};
use trading_core::types::Bar;

/// Average Directional Index (ADX).
///
/// Directional movement is smoothed with a simple rolling mean and normalised by
/// [`Atr`] over the same period; ADX is the rolling mean of DX.
#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }

    /// Directional movement columns `(+DM, -DM)`.
    fn directional_movement(bars: &[Bar]) -> (Vec<f64>, Vec<f64>) {
        let mut plus_dm = vec![0.0; bars.len()];
        let mut minus_dm = vec![0.0; bars.len()];

        for i in 1..bars.len() {
            let up = bars[i].high - bars[i - 1].high;
            let down = bars[i - 1].low - bars[i].low;

            if up > down && up > 0.0 {
                plus_dm[i] = up;
            }
            if down > up && down > 0.0 {
                minus_dm[i] = down;
            }
        }

        (plus_dm, minus_dm)
    }
}

impl OhlcvIndicator for Adx {
    type Output = Vec<f64>;

    fn calculate(&self, bars: &[Bar]) -> Vec<f64> {
        let sma = Sma::new(self.period);
        let atr = Atr::new(self.period).calculate(bars);
        let (plus_dm, minus_dm) = Self::directional_movement(bars);

        let plus_di: Vec<f64> = sma
            .calculate(&plus_dm)
            .iter()
            .zip(&atr)
            .map(|(dm, tr)| 100.0 * dm / tr)
            .collect();
        let minus_di: Vec<f64> = sma
            .calculate(&minus_dm)
            .iter()
            .zip(&atr)
            .map(|(dm, tr)| 100.0 * dm / tr)
            .collect();

        let dx: Vec<f64> = plus_di
            .iter()
            .zip(&minus_di)
            .map(|(p, m)| 100.0 * (p - m).abs() / (p + m))
            .collect();

        sma.calculate(&dx)
    }

    fn period(&self) -> usize {
        2 * self.period - 1
    }

    fn name(&self) -> &str {
        "ADX"
    }
}
