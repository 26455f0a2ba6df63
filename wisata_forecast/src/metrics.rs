//! Metrics for evaluating forecast accuracy
//!
//! The overlap window compares the *trailing* `k` actual values with the
//! *leading* `k` forecast values, `k = min(len(actual), len(forecast))`.
//! This scores the forecast against the most recent known months rather
//! than held-out data, so the numbers measure in-sample agreement.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How MAPE treats actual values equal to zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroActualPolicy {
    /// Any zero actual fails with a division-by-zero error
    #[default]
    Fail,
    /// Zero actuals are left out of MAPE only
    Exclude,
}

impl fmt::Display for ZeroActualPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZeroActualPolicy::Fail => write!(f, "fail"),
            ZeroActualPolicy::Exclude => write!(f, "exclude"),
        }
    }
}

impl FromStr for ZeroActualPolicy {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(ZeroActualPolicy::Fail),
            "exclude" => Ok(ZeroActualPolicy::Exclude),
            other => Err(ForecastError::Validation(format!(
                "Unknown zero-actual policy '{}', expected 'fail' or 'exclude'",
                other
            ))),
        }
    }
}

/// Forecast accuracy over the overlap window
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
    /// Mean absolute percentage error, in percent
    pub mape: f64,
    /// Mean absolute error
    pub mae: f64,
    /// Mean squared error
    pub mse: f64,
    /// Root mean squared error
    pub rmse: f64,
    /// Number of aligned pairs
    pub overlap: usize,
    /// Pairs left out of MAPE because the actual value was zero
    pub excluded_zero_actuals: usize,
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MAPE: {:.2}%, MAE: {:.2}, MSE: {:.2}, RMSE: {:.2} over {} points",
            self.mape, self.mae, self.mse, self.rmse, self.overlap
        )
    }
}

/// Evaluate with the default policy, which fails on zero actuals
pub fn evaluate(actual: &[f64], forecast: &[f64]) -> Result<Metrics> {
    evaluate_with_policy(actual, forecast, ZeroActualPolicy::default())
}

/// Evaluate `forecast` against the tail of `actual`
pub fn evaluate_with_policy(
    actual: &[f64],
    forecast: &[f64],
    policy: ZeroActualPolicy,
) -> Result<Metrics> {
    let k = actual.len().min(forecast.len());
    if k == 0 {
        return Err(ForecastError::InsufficientData(
            "Actual and forecast values do not overlap".to_string(),
        ));
    }

    let window = &actual[actual.len() - k..];
    let head = &forecast[..k];
    if window.iter().chain(head).any(|v| !v.is_finite()) {
        return Err(ForecastError::Validation(
            "Metrics require finite actual and forecast values".to_string(),
        ));
    }

    let n = k as f64;
    let mut abs_sum = 0.0;
    let mut sq_sum = 0.0;
    let mut pct_sum = 0.0;
    let mut pct_count = 0usize;
    let mut excluded = 0usize;

    for (i, (a, f)) in window.iter().zip(head).enumerate() {
        let err = a - f;
        abs_sum += err.abs();
        sq_sum += err * err;

        if *a == 0.0 {
            match policy {
                ZeroActualPolicy::Fail => {
                    return Err(ForecastError::DivisionByZero(format!(
                        "MAPE is undefined: actual value at window position {} is zero",
                        i
                    )))
                }
                ZeroActualPolicy::Exclude => {
                    excluded += 1;
                    continue;
                }
            }
        }
        pct_sum += (err / a).abs();
        pct_count += 1;
    }

    if pct_count == 0 {
        return Err(ForecastError::DivisionByZero(
            "MAPE is undefined: every actual value in the window is zero".to_string(),
        ));
    }

    let mse = sq_sum / n;
    Ok(Metrics {
        mape: pct_sum / pct_count as f64 * 100.0,
        mae: abs_sum / n,
        mse,
        rmse: mse.sqrt(),
        overlap: k,
        excluded_zero_actuals: excluded,
    })
}
