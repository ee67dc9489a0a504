//! # kpfm-bayes
//!
//! Bayesian recovery of electrostatic force curves from heterodyne KPFM
//! cantilever displacement.
//!
//! The cantilever is modelled as a linear damped oscillator driven by a
//! force that is a polynomial in `sin(w·t + φ)`. For one measurement window
//! this crate:
//! - Builds the discretised state-space model (propagators, design matrix)
//! - Computes the closed-form Gaussian posterior over initial conditions and
//!   force coefficients
//! - Optimises the hyperparameters `(σ, γ, φ)` against the negative log
//!   marginal likelihood with seeded multi-start Nelder–Mead
//! - Summarises the recovered force, residuals and a quadratic
//!   force-vs-voltage fit
//!
//! ## Quick Start
//!
//! ```ignore
//! use kpfm_bayes::{BayesianInference, PhysicalParams};
//!
//! let fit = BayesianInference::new()
//!     .params(PhysicalParams::default())
//!     .process_pixel(&displacement, &force, 56e3)?;
//!
//! println!("phase {:.3} rad, R² {:.3}", fit.phase, fit.r_squared);
//! ```
//!
//! Batches of pixels go through [`BayesianInference::process_pixels`], which
//! runs pixels in parallel when the `parallel` feature is enabled.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
mod config;
mod engine;
mod error;
mod params;
mod result;
mod types;

// Functional modules
pub mod inference;
pub mod model;
pub mod output;
pub mod statistics;
pub mod thread_pool;

// Re-exports for public API
pub use config::Config;
pub use engine::{BayesianInference, PixelInput, WindowFit};
pub use error::{InferenceError, InferenceResult};
pub use params::PhysicalParams;
pub use result::{FitQuality, ForceFit, PosteriorSummary};
pub use types::{Hyperparameters, Matrix, Matrix2, Vector, STATE_DIM};

/// Convenience function for one pixel with the default configuration.
///
/// # Arguments
///
/// * `record` - Raw displacement record of the pixel
/// * `force` - Raw force record the measured segment is cut from
/// * `drive_hz` - AC drive frequency in Hz
/// * `params` - Physical parameters of the run
///
/// # Returns
///
/// A `ForceFit` with the recovered force, its quadratic fit and the
/// posterior at the optimum.
pub fn process_pixel(
    record: &[f64],
    force: &[f64],
    drive_hz: f64,
    params: &PhysicalParams,
) -> InferenceResult<ForceFit> {
    BayesianInference::new()
        .params(params.clone())
        .process_pixel(record, force, drive_hz)
}
