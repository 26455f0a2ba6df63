//! Differencing and integration for the "I" part of ARIMA
//!
//! Differencing is applied `d` times with lag one. Integration reverses it for
//! values that continue past the end of the original series.

use crate::{MathError, Result};

/// Apply `d` rounds of first differencing.
///
/// Each round shortens the series by one, so the result has
/// `series.len() - d` values.
pub fn difference(series: &[f64], d: usize) -> Result<Vec<f64>> {
    if series.len() <= d {
        return Err(MathError::InsufficientData(format!(
            "Differencing {} times needs more than {} observations, got {}",
            d,
            d,
            series.len()
        )));
    }

    let mut result = series.to_vec();
    for _ in 0..d {
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    Ok(result)
}

/// Last value of the series at every differencing level `0..d`.
///
/// `tails[k]` is the final element of the series differenced `k` times.
/// These are the starting points needed to integrate forecasts back.
pub fn difference_tails(series: &[f64], d: usize) -> Result<Vec<f64>> {
    let mut tails = Vec::with_capacity(d);
    let mut level = series.to_vec();
    for k in 0..d {
        let last = level.last().copied().ok_or_else(|| {
            MathError::InsufficientData(format!("Series is empty at differencing level {}", k))
        })?;
        tails.push(last);
        level = level.windows(2).map(|w| w[1] - w[0]).collect();
    }
    Ok(tails)
}

/// Integrate values that extend a `d`-times differenced series.
///
/// `tails` must come from [`difference_tails`] on the original series.
/// The output continues the original (undifferenced) series.
pub fn integrate(differenced: &[f64], tails: &[f64]) -> Vec<f64> {
    let mut result = differenced.to_vec();
    for &start in tails.iter().rev() {
        let mut acc = start;
        for value in result.iter_mut() {
            acc += *value;
            *value = acc;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn first_difference_of_linear_trend_is_constant() {
        let series = vec![1.0, 3.0, 5.0, 7.0];
        assert_eq!(difference(&series, 1).unwrap(), vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn second_difference_of_quadratic_is_constant() {
        let series: Vec<f64> = (0..6).map(|i| (i * i) as f64).collect();
        assert_eq!(difference(&series, 2).unwrap(), vec![2.0; 4]);
    }

    #[test]
    fn zero_order_is_identity() {
        let series = vec![4.0, 2.0];
        assert_eq!(difference(&series, 0).unwrap(), series);
    }

    #[test]
    fn differencing_too_short_series_fails() {
        assert!(difference(&[1.0, 2.0], 2).is_err());
        assert!(difference(&[], 0).is_err());
    }

    #[test]
    fn integrate_continues_original_series() {
        let series: Vec<f64> = (0..6).map(|i| (i * i) as f64).collect();
        let tails = difference_tails(&series, 2).unwrap();
        // Next two second differences of i^2 are still 2
        let continued = integrate(&[2.0, 2.0], &tails);
        assert_relative_eq!(continued[0], 36.0);
        assert_relative_eq!(continued[1], 49.0);
    }

    #[test]
    fn integrate_without_differencing_is_identity() {
        assert_eq!(integrate(&[1.5, 2.5], &[]), vec![1.5, 2.5]);
    }
}
