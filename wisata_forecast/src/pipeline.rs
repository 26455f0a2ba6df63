//! End-to-end forecast runs
//!
//! Two flows share one tail (forecast, evaluation, diagnostics):
//! - manual: the stored dataset with a caller-chosen order. Every failure
//!   is returned.
//! - upload: an uploaded table with the configured default order. Failed
//!   evaluation or diagnostics become warnings on the report.

use crate::config::EngineConfig;
use crate::data::{DatasetStore, SeriesRepository};
use crate::error::{ForecastError, Result};
use crate::forecast::{forecast_with_intervals, Forecast};
use crate::metrics::{evaluate_with_policy, Metrics, ZeroActualPolicy};
use crate::models::arima::{ArimaModel, FittedArima};
use crate::models::{FittedModel, ForecastModel, ModelOrder, SeriesOrigin};
use crate::plots::{
    render_autocorrelation_with, render_forecast_plot_with, render_partial_autocorrelation_with,
    ImageArtifact,
};
use crate::upload::UploadedTable;
use serde::Serialize;
use tracing::{info, warn};
use wisata_math::PacfMethod;

/// Rendered diagnostics of one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagnosticPlots {
    pub forecast: Option<ImageArtifact>,
    pub acf: Option<ImageArtifact>,
    pub pacf: Option<ImageArtifact>,
}

impl DiagnosticPlots {
    /// Rendered plots with a short file stem each
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ImageArtifact)> + '_ {
        [
            ("forecast", self.forecast.as_ref()),
            ("acf_residual", self.acf.as_ref()),
            ("pacf_residual", self.pacf.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, artifact)| artifact.map(|a| (name, a)))
    }
}

/// Everything a caller shows after a forecast run
#[derive(Debug, Clone, Serialize)]
pub struct ForecastReport {
    pub model: String,
    pub order: ModelOrder,
    pub origin: SeriesOrigin,
    pub ar_coefficients: Vec<f64>,
    pub ma_coefficients: Vec<f64>,
    pub intercept: f64,
    pub sigma2: f64,
    pub aic: f64,
    pub bic: f64,
    pub forecast: Forecast,
    /// Accuracy over the overlap window; absent if evaluation failed in the upload flow
    pub metrics: Option<Metrics>,
    pub zero_actual_policy: ZeroActualPolicy,
    pub warnings: Vec<String>,
    #[serde(skip)]
    pub plots: DiagnosticPlots,
}

/// Runs the fitter, forecaster, evaluator and renderer with one configuration
#[derive(Debug, Clone, Default)]
pub struct ForecastPipeline {
    config: EngineConfig,
}

impl ForecastPipeline {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Forecast the stored dataset with `order`
    pub fn run_manual<R: SeriesRepository>(
        &self,
        store: &DatasetStore<R>,
        order: ModelOrder,
        steps: i64,
    ) -> Result<ForecastReport> {
        let series = store.load_required()?;
        info!(order = %order, steps, observations = series.len(), "manual forecast");

        let fitted = ArimaModel::new(order)
            .with_solver(self.config.solver)
            .fit_series(&series)?;
        self.report(&series.values(), &fitted, steps, true)
    }

    /// Forecast an uploaded table with the default order
    pub fn run_upload(&self, table: &UploadedTable, steps: i64) -> Result<ForecastReport> {
        let order = self.config.default_order;
        info!(order = %order, steps, observations = table.len(), "upload forecast");

        let fitted = ArimaModel::new(order)
            .with_solver(self.config.solver)
            .fit(table.values())?;
        let fitted = match table.last_period() {
            Some(last) => fitted.anchored_at(last),
            None => fitted,
        };
        self.report(table.values(), &fitted, steps, false)
    }

    fn report(
        &self,
        history: &[f64],
        fitted: &FittedArima,
        steps: i64,
        strict: bool,
    ) -> Result<ForecastReport> {
        let forecast = forecast_with_intervals(fitted, steps, self.config.confidence_level)?;
        let mut warnings = Vec::new();

        let metrics = tolerate(
            evaluate_with_policy(
                history,
                &forecast.values(),
                self.config.zero_actual_policy,
            ),
            strict,
            "evaluation",
            &mut warnings,
        )?;

        let plot = &self.config.plot;
        let residuals = fitted.residuals();
        let plots = DiagnosticPlots {
            forecast: tolerate(
                render_forecast_plot_with(history, &forecast, plot),
                strict,
                "forecast plot",
                &mut warnings,
            )?,
            acf: tolerate(
                render_autocorrelation_with(residuals, plot),
                strict,
                "residual ACF",
                &mut warnings,
            )?,
            pacf: tolerate(
                render_partial_autocorrelation_with(residuals, PacfMethod::Ywm, plot),
                strict,
                "residual PACF",
                &mut warnings,
            )?,
        };

        if let Some(m) = &metrics {
            info!(mape = m.mape, rmse = m.rmse, overlap = m.overlap, "forecast evaluated");
        }

        Ok(ForecastReport {
            model: fitted.name(),
            order: fitted.order(),
            origin: fitted.origin(),
            ar_coefficients: fitted.ar_coefficients().to_vec(),
            ma_coefficients: fitted.ma_coefficients().to_vec(),
            intercept: fitted.intercept(),
            sigma2: fitted.sigma2(),
            aic: fitted.aic(),
            bic: fitted.bic(),
            forecast,
            metrics,
            zero_actual_policy: self.config.zero_actual_policy,
            warnings,
            plots,
        })
    }
}

/// Return the error when `strict`, otherwise record it as a warning
fn tolerate<T>(
    result: Result<T>,
    strict: bool,
    stage: &str,
    warnings: &mut Vec<String>,
) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if strict => Err(err),
        Err(err) => {
            warn!(stage, error = %err, "skipped");
            warnings.push(format!("{} skipped: {}", stage, err));
            Ok(None)
        }
    }
}

impl ForecastReport {
    /// Metrics, or the reason they are missing
    pub fn require_metrics(&self) -> Result<&Metrics> {
        self.metrics.as_ref().ok_or_else(|| {
            ForecastError::InsufficientData(
                self.warnings
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "No metrics were computed".to_string()),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MemoryRepository, Record, Series};
    use crate::period::YearMonth;

    fn seasonal_series(n: usize) -> Series {
        let start = YearMonth::new(2019, 1).unwrap();
        let records = (0..n)
            .map(|i| {
                let wave = ((i as f64) * 0.9).sin() * 40.0 + ((i * 7 % 5) as f64) * 6.0;
                Record::new(start.add_months(i as u32), (1000.0 + 3.0 * i as f64 + wave) as u64)
            })
            .collect();
        Series::from_records(records).unwrap()
    }

    #[test]
    fn manual_run_fills_every_section() {
        let store = DatasetStore::new(MemoryRepository::with_series(seasonal_series(48)));
        let report = ForecastPipeline::default()
            .run_manual(&store, ModelOrder::new(1, 1, 1), 6)
            .unwrap();

        assert_eq!(report.forecast.horizon(), 6);
        assert_eq!(
            report.forecast.periods().unwrap()[0],
            YearMonth::new(2023, 1).unwrap()
        );
        assert!(report.metrics.is_some());
        assert_eq!(report.plots.iter().count(), 3);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn manual_run_needs_a_dataset() {
        let store = DatasetStore::new(MemoryRepository::new());
        let err = ForecastPipeline::default()
            .run_manual(&store, ModelOrder::default(), 3)
            .unwrap_err();
        assert!(matches!(err, ForecastError::NotFound(_)));
    }

    #[test]
    fn upload_run_tolerates_zero_actuals() {
        let mut csv = String::from("Jumlah\n");
        for (i, v) in seasonal_series(36).values().iter().enumerate() {
            let v = if i == 35 { 0.0 } else { *v };
            csv.push_str(&format!("{}\n", v));
        }
        let table = UploadedTable::from_bytes(csv.as_bytes()).unwrap();

        let report = ForecastPipeline::default().run_upload(&table, 4).unwrap();
        assert!(report.metrics.is_none());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.require_metrics().is_err());
        assert!(report.forecast.periods().is_none());
        assert!(report.plots.forecast.is_some());
    }

    #[test]
    fn report_serializes_without_plots() {
        let store = DatasetStore::new(MemoryRepository::with_series(seasonal_series(40)));
        let report = ForecastPipeline::default()
            .run_manual(&store, ModelOrder::new(1, 1, 0), 2)
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("plots").is_none());
        assert_eq!(json["forecast"]["points"].as_array().unwrap().len(), 2);
        assert_eq!(json["origin"]["kind"], "monthly");
    }
}
