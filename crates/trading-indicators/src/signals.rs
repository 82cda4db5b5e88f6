//! Helpers for turning indicator columns into boolean signal columns.
//!
//! Comparisons involving NaN are false, so warm-up positions never fire.

use trading_core::error::IndicatorError;

fn check_lengths(a: &[f64], b: &[f64]) -> Result<(), IndicatorError> {
    if a.len() != b.len() {
        return Err(IndicatorError::LengthMismatch(format!(
            "{} vs {}",
            a.len(),
            b.len()
        )));
    }
    Ok(())
}

/// `a[i] > b[i] && a[i-1] <= b[i-1]`; position 0 is always false.
pub fn cross_above(a: &[f64], b: &[f64]) -> Result<Vec<bool>, IndicatorError> {
    check_lengths(a, b)?;
    Ok((0..a.len())
        .map(|i| i > 0 && a[i] > b[i] && a[i - 1] <= b[i - 1])
        .collect())
}

/// `a[i] < b[i] && a[i-1] >= b[i-1]`; position 0 is always false.
pub fn cross_below(a: &[f64], b: &[f64]) -> Result<Vec<bool>, IndicatorError> {
    check_lengths(a, b)?;
    Ok((0..a.len())
        .map(|i| i > 0 && a[i] < b[i] && a[i - 1] >= b[i - 1])
        .collect())
}

/// Crossing of a constant level, e.g. a zero line.
pub fn cross_above_level(a: &[f64], level: f64) -> Vec<bool> {
    (0..a.len())
        .map(|i| i > 0 && a[i] > level && a[i - 1] <= level)
        .collect()
}

pub fn cross_below_level(a: &[f64], level: f64) -> Vec<bool> {
    (0..a.len())
        .map(|i| i > 0 && a[i] < level && a[i - 1] >= level)
        .collect()
}

/// `a[i] > a[i-1]`.
pub fn rising(a: &[f64]) -> Vec<bool> {
    (0..a.len()).map(|i| i > 0 && a[i] > a[i - 1]).collect()
}

/// `a[i] < a[i-1]`.
pub fn falling(a: &[f64]) -> Vec<bool> {
    (0..a.len()).map(|i| i > 0 && a[i] < a[i - 1]).collect()
}

/// Shift a column forward by `n` positions, filling the head with NaN.
pub fn lag(a: &[f64], n: usize) -> Vec<f64> {
    (0..a.len())
        .map(|i| if i < n { f64::NAN } else { a[i - n] })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_above() {
        let a = [1.0, 2.0, 3.0, 2.0, 4.0];
        let b = [2.0, 2.0, 2.0, 2.0, 2.0];
        let crosses = cross_above(&a, &b).unwrap();
        assert_eq!(crosses, vec![false, false, true, false, true]);
    }

    #[test]
    fn test_cross_below() {
        let a = [3.0, 2.0, 1.0, 3.0];
        let b = [2.0, 2.0, 2.0, 2.0];
        assert_eq!(cross_below(&a, &b).unwrap(), vec![false, false, true, false]);
    }

    #[test]
    fn test_cross_ignores_nan() {
        let a = [f64::NAN, 3.0, 1.0];
        let b = [2.0, 2.0, 2.0];
        assert_eq!(cross_above(&a, &b).unwrap(), vec![false, false, false]);
    }

    #[test]
    fn test_cross_length_mismatch() {
        assert!(cross_above(&[1.0], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_level_crosses() {
        let a = [-1.0, 0.0, 1.0, -0.5];
        assert_eq!(cross_above_level(&a, 0.0), vec![false, false, true, false]);
        assert_eq!(cross_below_level(&a, 0.0), vec![false, false, false, true]);
    }

    #[test]
    fn test_rising_falling() {
        let a = [1.0, 2.0, 2.0, 1.0];
        assert_eq!(rising(&a), vec![false, true, false, false]);
        assert_eq!(falling(&a), vec![false, false, false, true]);
    }

    #[test]
    fn test_lag() {
        let lagged = lag(&[1.0, 2.0, 3.0], 1);
        assert!(lagged[0].is_nan());
        assert_eq!(&lagged[1..], &[1.0, 2.0]);
    }
}
