//! Negative log marginal likelihood over `(σ, γ, φ)`.
//!
//! Up to additive constants:
//! ```text
//! NLML = N·log(γ²) + Σ log eig(Sig) + yᵀ·GAI·y − (Sig·CCᵀ·GAI·y)ᵀ·(CCᵀ·GAI·y)
//! ```
//! Candidates outside the phase interval `[-π, 0]` evaluate to `+∞`, as do
//! candidates whose posterior covariance has a non-positive eigenvalue or
//! whose value is not finite. The optimizer treats `+∞` as dominated.

use tracing::trace;

use crate::error::{InferenceError, InferenceResult};
use crate::model::WindowContext;
use crate::statistics::symmetrize;
use crate::types::{Hyperparameters, Matrix, Vector};

use super::posterior::{evaluate_posterior, Posterior};

/// Phase-dependent quantities and posterior for one candidate.
#[derive(Debug, Clone)]
pub struct FitState {
    /// Hyperparameters the state was computed for.
    pub hyperparameters: Hyperparameters,
    /// Force basis `B(φ)`.
    pub basis: Matrix,
    /// Design matrix `CC(φ)`.
    pub design: Matrix,
    /// Posterior at these hyperparameters.
    pub posterior: Posterior,
}

/// Marginal-likelihood objective bound to one window.
#[derive(Debug, Clone, Copy)]
pub struct MarginalLikelihood<'a> {
    context: &'a WindowContext,
    y: &'a Vector,
}

impl<'a> MarginalLikelihood<'a> {
    /// Bind the objective to a window and its observations.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if `y` does not have one entry per window sample.
    pub fn new(context: &'a WindowContext, y: &'a Vector) -> InferenceResult<Self> {
        if y.len() != context.len() {
            return Err(InferenceError::ShapeMismatch {
                context: "observations vs. window length",
                expected: context.len(),
                actual: y.len(),
            });
        }
        Ok(Self { context, y })
    }

    /// The window context.
    pub fn context(&self) -> &'a WindowContext {
        self.context
    }

    /// The observations.
    pub fn observations(&self) -> &'a Vector {
        self.y
    }

    /// Rebuild `P0`, `B`, `CC` for a candidate and evaluate the posterior.
    pub fn fit_state(&self, hyper: Hyperparameters) -> InferenceResult<FitState> {
        let (basis, design) = self.context.design(hyper.phi)?;
        let prior_precision = self.context.prior_precision(hyper.sigma);
        let noise_precision = 1.0 / (hyper.gamma * hyper.gamma);
        let posterior = evaluate_posterior(
            &design,
            self.y,
            noise_precision,
            &prior_precision,
            &self.context.m0,
        )?;

        Ok(FitState {
            hyperparameters: hyper,
            basis,
            design,
            posterior,
        })
    }

    /// Objective value; `+∞` for infeasible or degenerate candidates.
    pub fn evaluate(&self, hyper: Hyperparameters) -> f64 {
        if !hyper.phase_is_feasible() {
            return f64::INFINITY;
        }

        let state = match self.fit_state(hyper) {
            Ok(state) => state,
            Err(err) => {
                trace!(?hyper, %err, "objective rejected candidate");
                return f64::INFINITY;
            }
        };

        let value = self.value_at(&state);
        if value.is_finite() {
            value
        } else {
            trace!(?hyper, value, "objective not finite");
            f64::INFINITY
        }
    }

    /// Objective on the optimizer's `[σ, γ, φ]` vector.
    pub fn evaluate_vector(&self, p: &[f64; 3]) -> f64 {
        self.evaluate(Hyperparameters::from_array(*p))
    }

    fn value_at(&self, state: &FitState) -> f64 {
        let gamma_sq = state.hyperparameters.gamma.powi(2);
        let noise_precision = 1.0 / gamma_sq;
        let n = self.y.len() as f64;

        let Some(log_det) = log_det_covariance(&state.posterior.covariance) else {
            return f64::INFINITY;
        };

        let b = &state.posterior.projection;
        let data_fit = self.y.dot(self.y) * noise_precision;
        let explained = (&state.posterior.covariance * b).dot(b);

        n * gamma_sq.ln() + log_det + data_fit - explained
    }
}

/// `Σ log λᵢ` over the eigenvalues of a symmetric covariance.
///
/// Returns `None` when any eigenvalue is non-positive or non-finite.
pub fn log_det_covariance(covariance: &Matrix) -> Option<f64> {
    if covariance.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let eigenvalues = symmetrize(covariance).symmetric_eigenvalues();
    if eigenvalues.iter().any(|&l| !(l.is_finite() && l > 0.0)) {
        return None;
    }
    Some(eigenvalues.iter().map(|l| l.ln()).sum())
}
