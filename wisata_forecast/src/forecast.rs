//! Future point forecasts with a monthly period index

use crate::error::{ForecastError, Result};
use crate::models::FittedModel;
use crate::period::YearMonth;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};

/// Prediction interval around a point forecast
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
    /// Coverage probability, e.g. 0.95
    pub level: f64,
}

/// A single forecast step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    /// Month of the forecast; `None` when the history is undated
    pub period: Option<YearMonth>,
    /// Position on the shared history/forecast axis (`n + i`)
    pub position: usize,
    /// Expected value
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<Interval>,
}

/// Ordered forecast for `horizon` consecutive months
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    model: String,
    points: Vec<ForecastPoint>,
}

impl Forecast {
    /// Name of the model that produced the forecast
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Forecast months, when the history was dated
    pub fn periods(&self) -> Option<Vec<YearMonth>> {
        self.points.iter().map(|p| p.period).collect()
    }

    pub fn horizon(&self) -> usize {
        self.points.len()
    }

    pub fn has_intervals(&self) -> bool {
        self.points.iter().all(|p| p.interval.is_some()) && !self.points.is_empty()
    }
}

fn validate_steps(steps: i64) -> Result<u32> {
    if steps <= 0 {
        return Err(ForecastError::Validation(format!(
            "Forecast horizon must be positive, got {}",
            steps
        )));
    }
    u32::try_from(steps)
        .map_err(|_| ForecastError::Validation(format!("Forecast horizon {} is too large", steps)))
}

/// Point forecasts for the `steps` months after the fitted history
pub fn forecast<M: FittedModel + ?Sized>(model: &M, steps: i64) -> Result<Forecast> {
    let steps = validate_steps(steps)?;
    let values = model.predict(steps as usize)?;
    let origin = model.origin();
    let periods = origin.last_period().map(|last| last.following(steps));

    let points = values
        .into_iter()
        .enumerate()
        .map(|(i, value)| ForecastPoint {
            period: periods.as_ref().map(|p| p[i]),
            position: origin.len() + i,
            value,
            interval: None,
        })
        .collect();

    Ok(Forecast {
        model: model.name(),
        points,
    })
}

/// Point forecasts with normal prediction intervals at `level`
pub fn forecast_with_intervals<M: FittedModel + ?Sized>(
    model: &M,
    steps: i64,
    level: f64,
) -> Result<Forecast> {
    if !(level > 0.0 && level < 1.0) {
        return Err(ForecastError::Validation(format!(
            "Confidence level must be between 0 and 1, got {}",
            level
        )));
    }

    let mut result = forecast(model, steps)?;
    let normal = Normal::new(0.0, 1.0).map_err(|e| ForecastError::Math(e.to_string()))?;
    let z = normal.inverse_cdf((1.0 + level) / 2.0);
    let variances = model.forecast_variances(result.horizon());

    for (point, variance) in result.points.iter_mut().zip(variances) {
        let half_width = z * variance.max(0.0).sqrt();
        point.interval = Some(Interval {
            lower: point.value - half_width,
            upper: point.value + half_width,
            level,
        });
    }

    Ok(result)
}
