//! Numeric kernels shared by the inference pipeline.
//!
//! This module provides the dense routines the linear algebra crate does not
//! expose in the shape the pipeline needs:
//! - Least-squares solves with a numpy-style singular value cutoff
//! - Low-degree polynomial fitting and evaluation
//! - Goodness-of-fit statistics (relative RMSE, R²)
//! - Counter-based seeding for reproducible batch runs

mod linalg;
mod polyfit;
mod rng;

pub use linalg::{centered, lstsq, relative_residual_norm, symmetrize};
pub use polyfit::{polyfit, polyval, r_squared, PolyFit};
pub use rng::counter_rng_seed;
