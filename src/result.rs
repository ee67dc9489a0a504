//! Result types and related structures.

use serde::{Deserialize, Serialize};

use crate::inference::OptimizationOutcome;
use crate::types::Hyperparameters;

/// Complete result of one window's force-curve inference.
///
/// This is the record a storage or plotting layer consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForceFit {
    /// Fitted drive phase `φ` in radians.
    pub phase: f64,

    /// Configured drive phase shift used for the voltage abscissa.
    pub drive_phase_shift: f64,

    /// Configured signal-to-noise ratio (`Sim.snr`).
    pub snr: f64,

    /// Relative RMSE `‖y − CC·m_phi‖ / ‖y‖`.
    pub relative_rmse: f64,

    /// Recovered force at each window sample.
    pub recovered_force: Vec<f64>,

    /// One-sigma posterior band of the recovered force.
    pub force_band: Vec<f64>,

    /// Measured force segment from the raw force record.
    pub measured_force: Vec<f64>,

    /// Displacement residuals `y − CC·m_phi`.
    pub residuals: Vec<f64>,

    /// Drive voltage at each window sample (abscissa of the quadratic fit).
    pub drive_voltage: Vec<f64>,

    /// Quadratic fit of recovered force vs. drive voltage, highest degree first.
    pub quadratic: [f64; 3],

    /// Coefficient of determination of the quadratic fit. Never above 1.
    pub r_squared: f64,

    /// Posterior details at the optimum.
    pub posterior: PosteriorSummary,
}

/// Posterior diagnostics at the accepted optimum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosteriorSummary {
    /// Accepted hyperparameters.
    pub hyperparameters: Hyperparameters,

    /// Objective value at the optimum.
    pub objective: f64,

    /// Posterior mean `[x0, v0, c0..cn]`.
    pub mean: Vec<f64>,

    /// Posterior standard deviations of the force coefficients `c0..cn`.
    pub force_coefficient_std: Vec<f64>,

    /// Optimizer trace.
    pub optimizer: OptimizationOutcome,
}

impl ForceFit {
    /// Window length `N`.
    pub fn len(&self) -> usize {
        self.recovered_force.len()
    }

    /// Whether the fit covers no samples.
    pub fn is_empty(&self) -> bool {
        self.recovered_force.is_empty()
    }

    /// Force coefficients `c0..cn` of the posterior mean.
    pub fn force_coefficients(&self) -> &[f64] {
        &self.posterior.mean[crate::types::STATE_DIM..]
    }

    /// Qualitative grade of the displacement fit.
    pub fn quality(&self) -> FitQuality {
        FitQuality::from_relative_rmse(self.relative_rmse)
    }

    /// Check if the fit reproduces the displacement within `tolerance`
    /// relative RMSE.
    pub fn fits_within(&self, tolerance: f64) -> bool {
        self.relative_rmse <= tolerance
    }
}

/// Fit quality assessment based on the relative RMSE of the displacement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FitQuality {
    /// Relative RMSE below 1%.
    Excellent,
    /// Relative RMSE 1-5%.
    Good,
    /// Relative RMSE 5-20%.
    Poor,
    /// Relative RMSE above 20%, or not finite.
    Failed,
}

impl FitQuality {
    /// Determine quality from the relative RMSE.
    pub fn from_relative_rmse(rmse: f64) -> Self {
        if !rmse.is_finite() {
            return FitQuality::Failed;
        }

        if rmse < 0.01 {
            FitQuality::Excellent
        } else if rmse < 0.05 {
            FitQuality::Good
        } else if rmse < 0.2 {
            FitQuality::Poor
        } else {
            FitQuality::Failed
        }
    }
}
