//! Bayesian inference over the state-space model.
//!
//! This module implements the per-window pipeline:
//!
//! 1. **Posterior** ([`posterior`]): closed-form Gaussian posterior of the coefficients
//! 2. **Objective** ([`objective`]): negative log marginal likelihood with a phase wall
//! 3. **Optimizer** ([`optimizer`]): multi-start Nelder–Mead over `(σ, γ, φ)`
//! 4. **Summary** ([`summary`]): recovered force, residuals and fit quality

mod objective;
mod optimizer;
mod posterior;
mod summary;

pub use objective::{log_det_covariance, FitState, MarginalLikelihood};
pub use optimizer::{
    nelder_mead, HyperparameterOptimizer, OptimizationOutcome, SimplexOptions, SimplexResult,
    StartRecord, Termination,
};
pub use posterior::{evaluate_posterior, Posterior};
pub use summary::{summarize, summarize_state, SummaryInputs};
