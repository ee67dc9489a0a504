//! Type aliases and common types.

use nalgebra::{DMatrix, DVector, SMatrix};
use serde::{Deserialize, Serialize};

/// 2x2 block of the cantilever state transition (position, velocity).
pub type Matrix2 = SMatrix<f64, 2, 2>;

/// Dense dynamically sized matrix used for all window-level quantities.
pub type Matrix = DMatrix<f64>;

/// Dense dynamically sized column vector.
pub type Vector = DVector<f64>;

/// Number of latent initial-condition states (position, velocity).
pub const STATE_DIM: usize = 2;

/// Hyperparameter triple searched by the optimizer.
///
/// The parameter vector layout used by the simplex search is
/// `[sigma, gamma, phi]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    /// Prior scale of the force-basis coefficients.
    pub sigma: f64,
    /// Observation noise scale.
    pub gamma: f64,
    /// Drive phase in radians; feasible on `[-π, 0]`.
    pub phi: f64,
}

impl Hyperparameters {
    /// Create a triple.
    pub fn new(sigma: f64, gamma: f64, phi: f64) -> Self {
        Self { sigma, gamma, phi }
    }

    /// Whether the phase lies inside the feasible interval `[-π, 0]`.
    pub fn phase_is_feasible(&self) -> bool {
        (-std::f64::consts::PI..=0.0).contains(&self.phi)
    }

    /// Pack into the optimizer's parameter vector.
    pub fn to_array(self) -> [f64; 3] {
        [self.sigma, self.gamma, self.phi]
    }

    /// Unpack from the optimizer's parameter vector.
    pub fn from_array(p: [f64; 3]) -> Self {
        Self::new(p[0], p[1], p[2])
    }

    /// Same triple with non-negative scales.
    ///
    /// The objective depends on `σ` and `γ` only through their squares, so
    /// the sign carries no information.
    pub fn canonical(self) -> Self {
        Self::new(self.sigma.abs(), self.gamma.abs(), self.phi)
    }
}
