//! Closed-form Gaussian posterior over the latent coefficients.
//!
//! Model:
//! ```text
//! y | m ~ N(CC·m, γ²·I)
//! m     ~ N(m0, P0⁻¹)
//! ```
//! Posterior:
//! ```text
//! Sig   = (P0 + CCᵀ·GAI·CC)⁻¹         GAI = I/γ²
//! m_phi = Sig·(CCᵀ·GAI·y + P0·m0)
//! ```
//! `Sig` comes from a least-squares solve against the identity so a
//! near-singular precision sum degrades to the pseudo-inverse.

use crate::error::{InferenceError, InferenceResult};
use crate::statistics::lstsq;
use crate::types::{Matrix, Vector};

/// Posterior mean and covariance for one hyperparameter triple.
#[derive(Debug, Clone, PartialEq)]
pub struct Posterior {
    /// Posterior mean `m_phi` (length `M`).
    pub mean: Vector,
    /// Posterior covariance `Sig` (`M × M`).
    pub covariance: Matrix,
    /// Precision-weighted data projection `CCᵀ·GAI·y`.
    pub projection: Vector,
}

/// Evaluate the posterior.
///
/// `noise_precision` is the scalar `1/γ²` of the isotropic observation
/// precision `GAI`; `prior_precision` is the diagonal of `P0`.
///
/// # Errors
///
/// `ShapeMismatch` on inconsistent dimensions; `Numerical` only if the
/// solve cannot run at all (non-finite system).
pub fn evaluate_posterior(
    cc: &Matrix,
    y: &Vector,
    noise_precision: f64,
    prior_precision: &Vector,
    m0: &Vector,
) -> InferenceResult<Posterior> {
    let (n, m) = cc.shape();
    check_len("observations vs. design rows", n, y.len())?;
    check_len("prior precision vs. design columns", m, prior_precision.len())?;
    check_len("prior mean vs. design columns", m, m0.len())?;

    let cc_t = cc.transpose();
    let mut information = &cc_t * cc * noise_precision;
    for i in 0..m {
        information[(i, i)] += prior_precision[i];
    }

    let covariance = lstsq(&information, &Matrix::identity(m, m))?;
    let projection = &cc_t * y * noise_precision;
    let prior_term = prior_precision.component_mul(m0);
    let mean = &covariance * (&projection + prior_term);

    Ok(Posterior {
        mean,
        covariance,
        projection,
    })
}

fn check_len(context: &'static str, expected: usize, actual: usize) -> InferenceResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(InferenceError::ShapeMismatch {
            context,
            expected,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_system() -> (Matrix, Vector) {
        let cc = Matrix::from_fn(30, 3, |i, j| ((i + 1) as f64 * 0.1 * (j + 1) as f64).sin());
        let truth = Vector::from_vec(vec![1.0, -2.0, 0.5]);
        let y = &cc * &truth;
        (cc, y)
    }

    #[test]
    fn test_posterior_is_deterministic() {
        let (cc, y) = toy_system();
        let p0 = Vector::from_element(3, 0.3);
        let m0 = Vector::zeros(3);
        let a = evaluate_posterior(&cc, &y, 100.0, &p0, &m0).unwrap();
        let b = evaluate_posterior(&cc, &y, 100.0, &p0, &m0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_prior_mean_at_truth_is_a_fixed_point() {
        let (cc, y) = toy_system();
        let truth = Vector::from_vec(vec![1.0, -2.0, 0.5]);
        let p0 = Vector::from_vec(vec![0.1, 1.0, 10.0]);
        let post = evaluate_posterior(&cc, &y, 1e4, &p0, &truth).unwrap();
        assert!((&post.mean - &truth).amax() < 1e-9);
    }

    #[test]
    fn test_covariance_inverts_information() {
        let (cc, y) = toy_system();
        let p0 = Vector::from_vec(vec![1.0, 2.0, 3.0]);
        let post = evaluate_posterior(&cc, &y, 4.0, &p0, &Vector::zeros(3)).unwrap();
        let mut info = cc.transpose() * &cc * 4.0;
        for i in 0..3 {
            info[(i, i)] += p0[i];
        }
        let product = info * &post.covariance;
        assert!((product - Matrix::identity(3, 3)).amax() < 1e-10);
    }

    #[test]
    fn test_singular_information_degrades_gracefully() {
        // Duplicate columns and zero prior precision: rank-deficient system
        let cc = Matrix::from_fn(10, 2, |i, _| i as f64);
        let y = Vector::from_fn(10, |i, _| 2.0 * i as f64);
        let post = evaluate_posterior(&cc, &y, 1.0, &Vector::zeros(2), &Vector::zeros(2)).unwrap();
        assert!(post.covariance.iter().all(|v| v.is_finite()));
        // Minimum-norm solution splits the weight evenly
        assert!((post.mean[0] - 1.0).abs() < 1e-8);
        assert!((post.mean[1] - 1.0).abs() < 1e-8);
    }

    #[test]
    fn test_shape_mismatch() {
        let (cc, _) = toy_system();
        let short = Vector::zeros(5);
        let res = evaluate_posterior(&cc, &short, 1.0, &Vector::zeros(3), &Vector::zeros(3));
        assert!(matches!(
            res,
            Err(InferenceError::ShapeMismatch { expected: 30, actual: 5, .. })
        ));
    }
}
