//! Autocorrelation and partial autocorrelation for residual diagnostics
//!
//! Contains:
//! - Sample autocovariance (MLE or lag-adjusted denominators)
//! - ACF with Bartlett standard errors
//! - PACF via the Durbin-Levinson recursion (Yule-Walker estimates)
//! - Default lag counts used by correlograms

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Estimation method for the partial autocorrelation function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PacfMethod {
    /// Yule-Walker with lag-adjusted autocovariances (divides by `n - k`)
    #[default]
    #[serde(rename = "default", alias = "yw")]
    YuleWalker,
    /// Yule-Walker with MLE autocovariances (divides by `n`)
    #[serde(rename = "ywm")]
    Ywm,
}

/// Correlation values together with their per-lag standard errors
#[derive(Debug, Clone, PartialEq)]
pub struct Correlogram {
    /// Correlation at lags `0..=nlags`
    pub values: Vec<f64>,
    /// Standard error at lags `0..=nlags` (zero at lag 0)
    pub std_errors: Vec<f64>,
}

impl Correlogram {
    /// Largest lag covered
    pub fn nlags(&self) -> usize {
        self.values.len().saturating_sub(1)
    }
}

fn mean(series: &[f64]) -> f64 {
    series.iter().sum::<f64>() / series.len() as f64
}

/// Sample autocovariances for lags `0..=nlags`.
///
/// With `adjusted` the lag-`k` sum is divided by `n - k`, otherwise by `n`.
pub fn autocovariance(series: &[f64], nlags: usize, adjusted: bool) -> Result<Vec<f64>> {
    let n = series.len();
    if n <= nlags {
        return Err(MathError::InsufficientData(format!(
            "Need more than {} observations for {} lags, got {}",
            nlags, nlags, n
        )));
    }
    if series.iter().any(|x| !x.is_finite()) {
        return Err(MathError::InvalidInput(
            "Series contains non-finite values".to_string(),
        ));
    }

    let m = mean(series);
    let centered: Vec<f64> = series.iter().map(|x| x - m).collect();

    let acov = (0..=nlags)
        .map(|k| {
            let sum: f64 = centered[k..]
                .iter()
                .zip(centered.iter())
                .map(|(a, b)| a * b)
                .sum();
            let denom = if adjusted { (n - k) as f64 } else { n as f64 };
            sum / denom
        })
        .collect();

    Ok(acov)
}

/// Autocorrelation function with Bartlett standard errors.
pub fn acf(series: &[f64], nlags: usize) -> Result<Correlogram> {
    let acov = autocovariance(series, nlags, false)?;
    let var = acov[0];
    if var.abs() < 1e-12 {
        return Err(MathError::CalculationError(
            "Autocorrelation is undefined for a constant series".to_string(),
        ));
    }

    let values: Vec<f64> = acov.iter().map(|c| c / var).collect();
    let n = series.len() as f64;

    // Bartlett: var(r_k) = (1 + 2 * sum_{j<k} r_j^2) / n
    let mut std_errors = Vec::with_capacity(values.len());
    let mut cumulative = 0.0;
    for (k, r) in values.iter().enumerate() {
        if k == 0 {
            std_errors.push(0.0);
            continue;
        }
        std_errors.push(((1.0 + 2.0 * cumulative) / n).sqrt());
        cumulative += r * r;
    }

    Ok(Correlogram { values, std_errors })
}

/// Partial autocorrelations from autocovariances via Durbin-Levinson.
///
/// Returns lags `0..acov.len()` with lag 0 fixed at 1.
pub fn durbin_levinson(acov: &[f64]) -> Result<Vec<f64>> {
    let nlags = acov.len().saturating_sub(1);
    if acov.is_empty() || acov[0].abs() < 1e-12 {
        return Err(MathError::CalculationError(
            "Zero variance, partial autocorrelation is undefined".to_string(),
        ));
    }

    let mut pacf = vec![1.0; nlags + 1];
    let mut phi: Vec<f64> = Vec::with_capacity(nlags);
    let mut sigma = acov[0];

    for k in 1..=nlags {
        let num = acov[k] - phi.iter().enumerate().map(|(j, p)| p * acov[k - 1 - j]).sum::<f64>();
        if sigma.abs() < 1e-12 {
            return Err(MathError::CalculationError(format!(
                "Durbin-Levinson recursion degenerated at lag {}",
                k
            )));
        }
        let reflection = num / sigma;

        let previous = phi.clone();
        for j in 0..phi.len() {
            phi[j] = previous[j] - reflection * previous[previous.len() - 1 - j];
        }
        phi.push(reflection);

        sigma *= 1.0 - reflection * reflection;
        pacf[k] = reflection;
    }

    Ok(pacf)
}

/// Partial autocorrelation function with `1/sqrt(n)` standard errors.
pub fn pacf(series: &[f64], nlags: usize, method: PacfMethod) -> Result<Correlogram> {
    let adjusted = matches!(method, PacfMethod::YuleWalker);
    let acov = autocovariance(series, nlags, adjusted)?;
    let values = durbin_levinson(&acov)?;

    let se = 1.0 / (series.len() as f64).sqrt();
    let std_errors = (0..values.len())
        .map(|k| if k == 0 { 0.0 } else { se })
        .collect();

    Ok(Correlogram { values, std_errors })
}

/// Default number of ACF lags: `min(10 * log10(n), n - 1)`.
pub fn default_acf_lags(n: usize) -> usize {
    if n < 2 {
        return 0;
    }
    let by_log = (10.0 * (n as f64).log10()) as usize;
    by_log.min(n - 1)
}

/// Default number of PACF lags: `min(10 * log10(n), n / 2 - 1)`.
pub fn default_pacf_lags(n: usize) -> usize {
    if n < 4 {
        return 0;
    }
    let by_log = (10.0 * (n as f64).log10()) as usize;
    by_log.min(n / 2 - 1)
}
