//! ARIMA models for time series forecasting
//!
//! Parameters are estimated by conditional sum of squares (CSS): the series
//! is differenced `d` times, the first `p` differenced values condition the
//! AR recursion, and pre-sample shocks are zero. AR and MA coefficients are
//! searched in an unconstrained space and mapped through partial
//! autocorrelations, so every candidate is stationary and invertible.
//! A constant is estimated only when `d == 0`.

use crate::data::Series;
use crate::error::{ForecastError, Result};
use crate::models::{FittedModel, ForecastModel, ModelOrder, SeriesOrigin};
use crate::period::YearMonth;
use crate::utils::{ensure_finite, mean_variance};
use tracing::debug;
use wisata_math::correlation::{autocovariance, durbin_levinson};
use wisata_math::differencing::{difference, difference_tails, integrate};
use wisata_math::optimize::{nelder_mead, NelderMeadConfig};
use wisata_math::transform::{constrain_invertible, constrain_stationary, unconstrain_partial};

/// ARIMA model specification (AutoRegressive Integrated Moving Average)
#[derive(Debug, Clone)]
pub struct ArimaModel {
    order: ModelOrder,
    solver: NelderMeadConfig,
}

/// ARIMA model fitted to a series snapshot
#[derive(Debug, Clone)]
pub struct FittedArima {
    order: ModelOrder,
    /// Fitted AR coefficients
    ar_coefficients: Vec<f64>,
    /// Fitted MA coefficients
    ma_coefficients: Vec<f64>,
    /// Mean of the differenced series (zero when `d > 0`)
    intercept: f64,
    /// Differenced observations
    differenced: Vec<f64>,
    /// Last value at each differencing level, for integration
    tails: Vec<f64>,
    /// Residuals for differenced observations `p..`
    residuals: Vec<f64>,
    sigma2: f64,
    css: f64,
    log_likelihood: f64,
    aic: f64,
    bic: f64,
    iterations: usize,
    origin: SeriesOrigin,
}

/// Fit ARIMA(`order`) to `series` with the default solver settings
pub fn fit(series: &[f64], order: ModelOrder) -> Result<FittedArima> {
    ArimaModel::new(order).fit(series)
}

/// Fit ARIMA(`order`) to a dated series; forecasts continue from its last month
pub fn fit_series(series: &Series, order: ModelOrder) -> Result<FittedArima> {
    ArimaModel::new(order).fit_series(series)
}

/// CSS objective over a differenced series
struct CssProblem<'a> {
    w: &'a [f64],
    p: usize,
    q: usize,
    constant: bool,
}

impl CssProblem<'_> {
    fn unpack(&self, params: &[f64]) -> (f64, Vec<f64>, Vec<f64>) {
        let offset = usize::from(self.constant);
        let intercept = if self.constant { params[0] } else { 0.0 };
        let ar = constrain_stationary(&params[offset..offset + self.p]);
        let ma = constrain_invertible(&params[offset + self.p..offset + self.p + self.q]);
        (intercept, ar, ma)
    }

    /// One-step errors for every differenced observation.
    ///
    /// Deviations and shocks before the start of `w` are zero, so the first
    /// `p` errors lean on pre-sample values and are left out of the CSS.
    fn residuals(&self, intercept: f64, ar: &[f64], ma: &[f64]) -> Vec<f64> {
        let mut residuals: Vec<f64> = Vec::with_capacity(self.w.len());
        for t in 0..self.w.len() {
            let mut pred = intercept;
            for (i, phi) in ar.iter().enumerate() {
                if let Some(k) = t.checked_sub(i + 1) {
                    pred += phi * (self.w[k] - intercept);
                }
            }
            for (j, theta) in ma.iter().enumerate() {
                if let Some(k) = t.checked_sub(j + 1) {
                    pred += theta * residuals[k];
                }
            }
            residuals.push(self.w[t] - pred);
        }
        residuals
    }

    /// Errors that enter the conditional sum of squares
    fn conditioned<'r>(&self, residuals: &'r [f64]) -> &'r [f64] {
        &residuals[self.p.min(residuals.len())..]
    }

    fn css(&self, params: &[f64]) -> f64 {
        let (intercept, ar, ma) = self.unpack(params);
        let residuals = self.residuals(intercept, &ar, &ma);
        self.conditioned(&residuals).iter().map(|e| e * e).sum()
    }
}

impl ArimaModel {
    /// Create a new ARIMA model
    pub fn new(order: ModelOrder) -> Self {
        Self {
            order,
            solver: NelderMeadConfig::default(),
        }
    }

    /// Use specific optimiser settings
    pub fn with_solver(mut self, solver: NelderMeadConfig) -> Self {
        self.solver = solver;
        self
    }

    pub fn order(&self) -> ModelOrder {
        self.order
    }

    /// Fit to a dated series
    pub fn fit_series(&self, series: &Series) -> Result<FittedArima> {
        let fitted = self.fit(&series.values())?;
        Ok(match series.last_period() {
            Some(last) => fitted.anchored_at(last),
            None => fitted,
        })
    }

    /// Starting point: Yule-Walker partials for AR, zero for MA
    fn initial_params(&self, w: &[f64], mean: f64) -> Vec<f64> {
        let ModelOrder { p, q, .. } = self.order;
        let mut params = Vec::with_capacity(p + q + 1);
        if self.order.has_constant() {
            params.push(mean);
        }
        if p > 0 {
            let partials = autocovariance(w, p, false)
                .and_then(|acov| durbin_levinson(&acov))
                .unwrap_or_else(|_| vec![0.0; p + 1]);
            params.extend(partials[1..].iter().map(|r| unconstrain_partial(*r)));
        }
        params.extend(std::iter::repeat(0.0).take(q));
        params
    }
}

impl ForecastModel for ArimaModel {
    type Fitted = FittedArima;

    fn fit(&self, values: &[f64]) -> Result<FittedArima> {
        let order = self.order;
        ensure_finite(values, "Series")?;

        let needed = order.min_observations();
        if values.len() < needed {
            return Err(ForecastError::InsufficientData(format!(
                "ARIMA{} needs at least {} observations, got {}",
                order,
                needed,
                values.len()
            )));
        }

        let w = difference(values, order.d)?;
        let tails = difference_tails(values, order.d)?;

        let (mean, variance) = mean_variance(&w).ok_or_else(|| {
            ForecastError::InsufficientData("Differencing left no observations".to_string())
        })?;
        if variance <= f64::EPSILON * (1.0 + mean * mean) {
            return Err(ForecastError::Fit(format!(
                "Differenced series has zero variance; ARIMA{} cannot be estimated",
                order
            )));
        }

        let problem = CssProblem {
            w: &w,
            p: order.p,
            q: order.q,
            constant: order.has_constant(),
        };

        let (params, iterations) = if order.num_coefficients() == 0 {
            // Closed form: the constant is the mean
            (self.initial_params(&w, mean), 0)
        } else {
            let initial = self.initial_params(&w, mean);
            let result = nelder_mead(|x| problem.css(x), &initial, &self.solver)
                .map_err(|e| ForecastError::Fit(e.to_string()))?;
            if !result.converged {
                return Err(ForecastError::Fit(format!(
                    "CSS optimisation for ARIMA{} did not converge within {} iterations (best CSS {:.6e})",
                    order, result.iterations, result.value
                )));
            }
            (result.point, result.iterations)
        };

        let (intercept, ar_coefficients, ma_coefficients) = problem.unpack(&params);
        let residuals = problem.residuals(intercept, &ar_coefficients, &ma_coefficients);
        ensure_finite(&residuals, "Residuals")
            .map_err(|_| ForecastError::Fit("Estimation produced non-finite residuals".to_string()))?;

        let conditioned = problem.conditioned(&residuals);
        let n_eff = conditioned.len() as f64;
        let css: f64 = conditioned.iter().map(|e| e * e).sum();
        let sigma2 = css / n_eff;
        if !sigma2.is_finite() || sigma2 <= f64::EPSILON * variance {
            return Err(ForecastError::Fit(format!(
                "Residual variance of ARIMA{} collapsed to {:e}",
                order, sigma2
            )));
        }

        let log_likelihood =
            -0.5 * n_eff * ((2.0 * std::f64::consts::PI * sigma2).ln() + 1.0);
        let k = (order.num_coefficients() + usize::from(order.has_constant()) + 1) as f64;
        let aic = -2.0 * log_likelihood + 2.0 * k;
        let bic = -2.0 * log_likelihood + k * n_eff.ln();

        debug!(
            order = %order,
            iterations,
            css,
            sigma2,
            aic,
            "ARIMA fitted"
        );

        Ok(FittedArima {
            order,
            ar_coefficients,
            ma_coefficients,
            intercept,
            differenced: w,
            tails,
            residuals,
            sigma2,
            css,
            log_likelihood,
            aic,
            bic,
            iterations,
            origin: SeriesOrigin::Positional { len: values.len() },
        })
    }

    fn name(&self) -> String {
        format!("ARIMA{}", self.order)
    }
}

impl FittedArima {
    /// Attach the month of the last observation
    pub fn anchored_at(mut self, last: YearMonth) -> Self {
        self.origin = SeriesOrigin::Monthly {
            last,
            len: self.origin.len(),
        };
        self
    }

    pub fn order(&self) -> ModelOrder {
        self.order
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coefficients
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Residual variance
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn css(&self) -> f64 {
        self.css
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    pub fn aic(&self) -> f64 {
        self.aic
    }

    pub fn bic(&self) -> f64 {
        self.bic
    }

    /// Optimiser iterations used
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn differenced(&self) -> &[f64] {
        &self.differenced
    }

    /// Psi weights of the integrated process, `psi_0 = 1`
    fn psi_weights(&self, count: usize) -> Vec<f64> {
        // phi*(B) = phi(B) * (1 - B)^d
        let mut poly = Vec::with_capacity(self.order.p + self.order.d + 1);
        poly.push(1.0);
        poly.extend(self.ar_coefficients.iter().map(|a| -a));
        for _ in 0..self.order.d {
            let mut next = vec![0.0; poly.len() + 1];
            for (i, c) in poly.iter().enumerate() {
                next[i] += c;
                next[i + 1] -= c;
            }
            poly = next;
        }
        let phi_star: Vec<f64> = poly[1..].iter().map(|c| -c).collect();

        let mut psi = Vec::with_capacity(count);
        for j in 0..count {
            if j == 0 {
                psi.push(1.0);
                continue;
            }
            let mut value = self.ma_coefficients.get(j - 1).copied().unwrap_or(0.0);
            for (i, phi) in phi_star.iter().enumerate().take(j) {
                value += phi * psi[j - 1 - i];
            }
            psi.push(value);
        }
        psi
    }
}

impl FittedModel for FittedArima {
    fn predict(&self, steps: usize) -> Result<Vec<f64>> {
        let m = self.differenced.len();

        let mut extended = self.differenced.clone();
        let mut shocks = self.residuals.clone();

        for _ in 0..steps {
            let t = extended.len();
            let mut pred = self.intercept;
            for (i, phi) in self.ar_coefficients.iter().enumerate() {
                pred += phi * (extended[t - 1 - i] - self.intercept);
            }
            for (j, theta) in self.ma_coefficients.iter().enumerate() {
                pred += theta * shocks[t - 1 - j];
            }
            extended.push(pred);
            // Future shocks have zero expectation
            shocks.push(0.0);
        }

        let forecasts = integrate(&extended[m..], &self.tails);
        if forecasts.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::Fit(
                "Forecast recursion produced non-finite values".to_string(),
            ));
        }
        Ok(forecasts)
    }

    fn forecast_variances(&self, steps: usize) -> Vec<f64> {
        let psi = self.psi_weights(steps);
        let mut cumulative = 0.0;
        psi.iter()
            .map(|w| {
                cumulative += w * w;
                self.sigma2 * cumulative
            })
            .collect()
    }

    fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    fn origin(&self) -> SeriesOrigin {
        self.origin
    }

    fn name(&self) -> String {
        format!("ARIMA{}", self.order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn simulate_ar1(phi: f64, mean: f64, n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = Normal::new(0.0, 1.0).unwrap();
        let mut x = 0.0;
        (0..n)
            .map(|_| {
                x = phi * x + noise.sample(&mut rng);
                mean + x
            })
            .collect()
    }

    fn random_walk(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = Normal::new(0.0, 5.0).unwrap();
        let mut level = 1000.0;
        (0..n)
            .map(|_| {
                level += noise.sample(&mut rng);
                level
            })
            .collect()
    }

    #[test]
    fn recovers_ar1_coefficient() {
        let series = simulate_ar1(0.6, 50.0, 400, 7);
        let model = fit(&series, ModelOrder::new(1, 0, 0)).unwrap();

        assert!((model.ar_coefficients()[0] - 0.6).abs() < 0.12);
        assert!((model.intercept() - 50.0).abs() < 0.5);
        assert!(model.sigma2() > 0.5 && model.sigma2() < 1.5);
        assert_eq!(model.residuals().len(), 400);
    }

    #[test]
    fn residuals_cover_every_differenced_point() {
        let series = random_walk(60, 3);
        let model = fit(&series, ModelOrder::new(1, 1, 2)).unwrap();
        assert_eq!(model.residuals().len(), 60 - 1);
        assert_eq!(model.residuals().len(), model.differenced().len());
        assert!(model.residuals().iter().all(|e| e.is_finite()));
        assert_eq!(model.name(), "ARIMA(1,1,2)");
    }

    #[test]
    fn constant_series_fails_instead_of_returning_nan() {
        let series = vec![50.0; 24];
        let err = fit(&series, ModelOrder::new(1, 1, 2)).unwrap_err();
        assert!(matches!(err, ForecastError::Fit(_)));
    }

    #[test]
    fn linear_trend_has_degenerate_differences() {
        let series: Vec<f64> = (0..24).map(|i| 100.0 + 3.0 * i as f64).collect();
        assert!(matches!(
            fit(&series, ModelOrder::new(0, 1, 1)),
            Err(ForecastError::Fit(_))
        ));
    }

    #[test]
    fn too_few_observations_is_insufficient_data() {
        let err = fit(&[1.0, 2.0, 4.0, 3.0, 5.0], ModelOrder::new(1, 1, 2)).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientData(_)));
        assert!(err.to_string().contains("at least 7"));
    }

    #[test]
    fn differencing_must_leave_observations() {
        let err = fit(&[1.0, 2.0], ModelOrder::new(0, 2, 0)).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientData(_)));
    }

    #[test]
    fn non_finite_input_is_rejected() {
        let mut series = random_walk(30, 1);
        series[10] = f64::NAN;
        assert!(matches!(
            fit(&series, ModelOrder::new(1, 0, 0)),
            Err(ForecastError::Validation(_))
        ));
    }

    #[test]
    fn white_noise_model_forecasts_the_mean() {
        let series = vec![10.0, 12.0, 9.0, 11.0, 13.0, 8.0, 10.0, 11.0];
        let model = fit(&series, ModelOrder::new(0, 0, 0)).unwrap();
        let mean = series.iter().sum::<f64>() / series.len() as f64;

        assert_relative_eq!(model.intercept(), mean);
        for value in model.predict(3).unwrap() {
            assert_relative_eq!(value, mean);
        }
        assert_eq!(model.iterations(), 0);
    }

    #[test]
    fn random_walk_model_repeats_last_value_with_growing_variance() {
        let series = random_walk(40, 11);
        let model = fit(&series, ModelOrder::new(0, 1, 0)).unwrap();
        let last = *series.last().unwrap();

        for value in model.predict(4).unwrap() {
            assert_relative_eq!(value, last);
        }
        let variances = model.forecast_variances(4);
        for (h, v) in variances.iter().enumerate() {
            assert_relative_eq!(*v, model.sigma2() * (h + 1) as f64, epsilon = 1e-9);
        }
    }

    #[test]
    fn ar1_forecast_decays_toward_mean() {
        let series = simulate_ar1(0.7, 20.0, 300, 5);
        let model = fit(&series, ModelOrder::new(1, 0, 0)).unwrap();
        let forecast = model.predict(60).unwrap();
        let last_gap = (forecast[59] - model.intercept()).abs();
        assert!(last_gap < 1e-3);
    }

    #[test]
    fn exhausted_solver_budget_is_a_fit_error() {
        let series = simulate_ar1(0.5, 0.0, 100, 9);
        let solver = NelderMeadConfig {
            max_iterations: 1,
            tolerance: 0.0,
            ..NelderMeadConfig::default()
        };
        let err = ArimaModel::new(ModelOrder::new(1, 0, 1))
            .with_solver(solver)
            .fit(&series)
            .unwrap_err();
        assert!(matches!(err, ForecastError::Fit(ref msg) if msg.contains("did not converge")));
    }

    #[test]
    fn anchored_model_keeps_length() {
        let series = random_walk(30, 2);
        let model = fit(&series, ModelOrder::new(1, 1, 0))
            .unwrap()
            .anchored_at(YearMonth::new(2024, 6).unwrap());
        assert_eq!(
            model.origin(),
            SeriesOrigin::Monthly {
                last: YearMonth::new(2024, 6).unwrap(),
                len: 30
            }
        );
    }
}
