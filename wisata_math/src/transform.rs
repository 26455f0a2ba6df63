//! Parameter transforms that keep ARMA polynomials well behaved
//!
//! An optimiser works on unconstrained reals. Each value is squashed with
//! `tanh` into a partial autocorrelation in (-1, 1), and the partial
//! autocorrelations are turned into lag coefficients with the
//! Durbin-Levinson step. Any input vector therefore maps to a stationary
//! AR polynomial (or an invertible MA polynomial after a sign flip).

/// Margin keeping partial autocorrelations strictly inside (-1, 1)
pub const UNIT_ROOT_MARGIN: f64 = 1e-6;

/// Map partial autocorrelations to AR coefficients of `1 - phi_1 B - ... - phi_p B^p`.
pub fn pacf_to_coefficients(partials: &[f64]) -> Vec<f64> {
    let mut phi: Vec<f64> = Vec::with_capacity(partials.len());
    for &r in partials {
        let previous = phi.clone();
        for j in 0..phi.len() {
            phi[j] = previous[j] - r * previous[previous.len() - 1 - j];
        }
        phi.push(r);
    }
    phi
}

/// Map unconstrained reals to stationary AR coefficients.
pub fn constrain_stationary(unconstrained: &[f64]) -> Vec<f64> {
    let partials: Vec<f64> = unconstrained
        .iter()
        .map(|x| x.tanh() * (1.0 - UNIT_ROOT_MARGIN))
        .collect();
    pacf_to_coefficients(&partials)
}

/// Map unconstrained reals to invertible MA coefficients of `1 + theta_1 B + ... + theta_q B^q`.
pub fn constrain_invertible(unconstrained: &[f64]) -> Vec<f64> {
    constrain_stationary(unconstrained)
        .into_iter()
        .map(|c| -c)
        .collect()
}

/// Inverse of the squashing step for a single partial autocorrelation.
pub fn unconstrain_partial(partial: f64) -> f64 {
    let bound = 1.0 - 1e-3;
    partial.clamp(-bound, bound).atanh()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn single_lag_is_squashed_partial() {
        let coeffs = constrain_stationary(&[0.5]);
        assert_relative_eq!(coeffs[0], 0.5f64.tanh() * (1.0 - UNIT_ROOT_MARGIN));
    }

    #[test]
    fn ar2_from_partials() {
        // phi2 equals the second partial, phi1 = r1 * (1 - r2)
        let coeffs = pacf_to_coefficients(&[0.6, 0.3]);
        assert_relative_eq!(coeffs[0], 0.6 * (1.0 - 0.3), epsilon = 1e-12);
        assert_relative_eq!(coeffs[1], 0.3, epsilon = 1e-12);
    }

    #[test]
    fn extreme_inputs_stay_stationary() {
        // Stationary AR(2) region: |phi2| < 1, phi2 + phi1 < 1, phi2 - phi1 < 1
        for &(a, b) in &[(50.0, 50.0), (-50.0, 50.0), (50.0, -50.0), (-3.0, -7.0)] {
            let c = constrain_stationary(&[a, b]);
            assert!(c[1].abs() < 1.0);
            assert!(c[1] + c[0] < 1.0);
            assert!(c[1] - c[0] < 1.0);
        }
    }

    #[test]
    fn invertible_is_sign_flipped_stationary() {
        let ar = constrain_stationary(&[0.2, -0.4]);
        let ma = constrain_invertible(&[0.2, -0.4]);
        for (a, m) in ar.iter().zip(&ma) {
            assert_relative_eq!(*a, -*m);
        }
    }

    #[test]
    fn unconstrain_partial_inverts_tanh() {
        assert_relative_eq!(unconstrain_partial(0.25f64.tanh()), 0.25, epsilon = 1e-12);
        assert!(unconstrain_partial(1.0).is_finite());
    }
}
