//! Derivative-free minimisation used for conditional sum-of-squares fitting

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Nelder-Mead tuning parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NelderMeadConfig {
    /// Maximum number of iterations
    pub max_iterations: usize,
    /// Convergence tolerance on the spread of objective values
    pub tolerance: f64,
    /// Reflection coefficient
    pub alpha: f64,
    /// Expansion coefficient
    pub gamma: f64,
    /// Contraction coefficient
    pub rho: f64,
    /// Shrink coefficient
    pub sigma: f64,
    /// Step used to build the initial simplex
    pub initial_step: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            tolerance: 1e-9,
            alpha: 1.0,
            gamma: 2.0,
            rho: 0.5,
            sigma: 0.5,
            initial_step: 0.1,
        }
    }
}

/// Outcome of a Nelder-Mead run
#[derive(Debug, Clone, PartialEq)]
pub struct NelderMeadResult {
    /// Best point found
    pub point: Vec<f64>,
    /// Objective value at `point`
    pub value: f64,
    /// Iterations performed
    pub iterations: usize,
    /// Whether the tolerance was reached before the iteration limit
    pub converged: bool,
}

/// Minimise `objective` starting from `initial`.
///
/// An empty starting point is evaluated once and reported as converged.
/// Returns an error if the objective is not finite at the starting point.
pub fn nelder_mead<F>(objective: F, initial: &[f64], config: &NelderMeadConfig) -> Result<NelderMeadResult>
where
    F: Fn(&[f64]) -> f64,
{
    let n = initial.len();
    let start_value = objective(initial);
    if !start_value.is_finite() {
        return Err(MathError::CalculationError(
            "Objective is not finite at the starting point".to_string(),
        ));
    }
    if n == 0 {
        return Ok(NelderMeadResult {
            point: Vec::new(),
            value: start_value,
            iterations: 0,
            converged: true,
        });
    }

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(initial.to_vec());
    for i in 0..n {
        let mut vertex = initial.to_vec();
        let step = if initial[i].abs() > 1e-8 {
            config.initial_step * initial[i].abs().max(1.0)
        } else {
            config.initial_step
        };
        vertex[i] += step;
        simplex.push(vertex);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| finite_or_max(objective(v))).collect();

    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        iterations += 1;

        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        let best = order[0];
        let worst = order[n];
        let second_worst = order[n - 1];

        let spread = values[worst] - values[best];
        let scale = values[best].abs().max(1.0);
        if spread <= config.tolerance * scale {
            converged = true;
            break;
        }

        let centroid = centroid_without(&simplex, worst);

        let reflected = along(&centroid, &simplex[worst], -config.alpha);
        let reflected_value = finite_or_max(objective(&reflected));

        if reflected_value < values[best] {
            let expanded = along(&centroid, &simplex[worst], -config.alpha * config.gamma);
            let expanded_value = finite_or_max(objective(&expanded));
            if expanded_value < reflected_value {
                simplex[worst] = expanded;
                values[worst] = expanded_value;
            } else {
                simplex[worst] = reflected;
                values[worst] = reflected_value;
            }
            continue;
        }

        if reflected_value < values[second_worst] {
            simplex[worst] = reflected;
            values[worst] = reflected_value;
            continue;
        }

        // Outside contraction if the reflection helped a little, inside otherwise
        let (contracted, threshold) = if reflected_value < values[worst] {
            (along(&centroid, &reflected, config.rho), reflected_value)
        } else {
            (along(&centroid, &simplex[worst], config.rho), values[worst])
        };
        let contracted_value = finite_or_max(objective(&contracted));
        if contracted_value < threshold {
            simplex[worst] = contracted;
            values[worst] = contracted_value;
            continue;
        }

        let anchor = simplex[best].clone();
        for i in 0..=n {
            if i == best {
                continue;
            }
            simplex[i] = along(&anchor, &simplex[i], config.sigma);
            values[i] = finite_or_max(objective(&simplex[i]));
        }
    }

    let best = (0..=n)
        .min_by(|&a, &b| values[a].total_cmp(&values[b]))
        .unwrap_or(0);

    Ok(NelderMeadResult {
        point: simplex[best].clone(),
        value: values[best],
        iterations,
        converged,
    })
}

fn finite_or_max(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        f64::MAX
    }
}

fn centroid_without(simplex: &[Vec<f64>], skip: usize) -> Vec<f64> {
    let dim = simplex[0].len();
    let mut centroid = vec![0.0; dim];
    for (i, vertex) in simplex.iter().enumerate() {
        if i == skip {
            continue;
        }
        for (c, v) in centroid.iter_mut().zip(vertex) {
            *c += v;
        }
    }
    let count = (simplex.len() - 1) as f64;
    centroid.iter_mut().for_each(|c| *c /= count);
    centroid
}

/// `from + t * (to - from)`
fn along(from: &[f64], to: &[f64], t: f64) -> Vec<f64> {
    from.iter().zip(to).map(|(f, x)| f + t * (x - f)).collect()
}
