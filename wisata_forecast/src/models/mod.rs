//! Forecasting models for monthly series

use crate::error::{ForecastError, Result};
use crate::period::YearMonth;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::str::FromStr;

/// ARIMA order triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelOrder {
    /// AR order
    pub p: usize,
    /// Differencing order
    pub d: usize,
    /// MA order
    pub q: usize,
}

impl ModelOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Number of lag coefficients to estimate
    pub fn num_coefficients(&self) -> usize {
        self.p + self.q
    }

    /// Whether a constant term is estimated; only for undifferenced models
    pub fn has_constant(&self) -> bool {
        self.d == 0
    }

    /// Fewest observations that leave more CSS terms than free parameters
    pub fn min_observations(&self) -> usize {
        self.d + self.p.max(self.q) + self.num_coefficients() + 1
    }
}

impl Default for ModelOrder {
    /// ARIMA(1,1,2), the order used for uploaded tables
    fn default() -> Self {
        Self::new(1, 1, 2)
    }
}

impl fmt::Display for ModelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.p, self.d, self.q)
    }
}

impl FromStr for ModelOrder {
    type Err = ForecastError;

    /// Parse `p,d,q`, optionally wrapped in parentheses
    fn from_str(s: &str) -> Result<Self> {
        let inner = s.trim().trim_start_matches('(').trim_end_matches(')');
        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(ForecastError::Validation(format!(
                "Order '{}' must have three parts p,d,q",
                s
            )));
        }
        let parse = |name: &str, raw: &str| {
            raw.parse::<usize>().map_err(|_| {
                ForecastError::Validation(format!(
                    "Order component {} = '{}' must be a non-negative integer",
                    name, raw
                ))
            })
        };
        Ok(Self::new(
            parse("p", parts[0])?,
            parse("d", parts[1])?,
            parse("q", parts[2])?,
        ))
    }
}

/// Where the fitted observations end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SeriesOrigin {
    /// Observations are dated; `last` is the final month
    Monthly { last: YearMonth, len: usize },
    /// Observations are only positions `0..len`
    Positional { len: usize },
}

impl SeriesOrigin {
    /// Number of observations
    pub fn len(&self) -> usize {
        match self {
            SeriesOrigin::Monthly { len, .. } | SeriesOrigin::Positional { len } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Last observed month, if known
    pub fn last_period(&self) -> Option<YearMonth> {
        match self {
            SeriesOrigin::Monthly { last, .. } => Some(*last),
            SeriesOrigin::Positional { .. } => None,
        }
    }
}

/// A fitted model that can extrapolate
pub trait FittedModel: Debug + Send + Sync {
    /// Point forecasts for the next `steps` observations
    fn predict(&self, steps: usize) -> Result<Vec<f64>>;

    /// Forecast error variance for horizons `1..=steps`
    fn forecast_variances(&self, steps: usize) -> Vec<f64>;

    /// In-sample one-step residuals
    fn residuals(&self) -> &[f64];

    /// End of the observations used for fitting
    fn origin(&self) -> SeriesOrigin;

    /// Name of the model
    fn name(&self) -> String;
}

/// A model specification that can be fitted to observations
pub trait ForecastModel: Debug {
    /// The type of fitted model produced
    type Fitted: FittedModel;

    /// Fit the model to observations in time order
    fn fit(&self, values: &[f64]) -> Result<Self::Fitted>;

    /// Get the name of the model
    fn name(&self) -> String;
}

pub mod arima;
