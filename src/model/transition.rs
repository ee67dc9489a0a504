//! State transition assembly for the damped harmonic oscillator.
//!
//! The cantilever is modelled in dimensionless time as
//! `ẋ = L·x + [0, f]ᵀ` with `L = [[0, 1], [-1, -1/Q]]`. Over `k` sample
//! intervals the homogeneous propagator is `exp(L·h·k)`. This module
//! evaluates those `N` matrix exponentials once per window and lays them out
//! as the discrete Green's function `AA` used to convolve the force basis.

use crate::error::{InferenceError, InferenceResult};
use crate::types::{Matrix, Matrix2, STATE_DIM};

/// Continuous-time generator `[[0, 1], [-1, -1/Q]]`.
pub fn oscillator_generator(quality_factor: f64) -> Matrix2 {
    Matrix2::new(0.0, 1.0, -1.0, -1.0 / quality_factor)
}

/// Propagators of one window, built once and shared by every optimizer trial.
#[derive(Debug, Clone)]
pub struct StateTransition {
    /// `blocks[i] = exp(L·h·(i+1))` for `i = 0..N`.
    pub blocks: Vec<Matrix2>,
    /// `2 × N`; column `i` is the first column of `blocks[i]`
    /// (response to a unit initial position).
    pub a1: Matrix,
    /// `2 × N`; column `i` is the second column of `blocks[i]`
    /// (response to a unit initial velocity).
    pub a2: Matrix,
    /// `2N × 2N` strictly block-lower-triangular Toeplitz matrix whose block
    /// `(j, k)`, `k < j`, is `blocks[j − k − 1]`.
    pub aa: Matrix,
}

impl StateTransition {
    /// Evaluate the propagators and assemble the banded matrices.
    ///
    /// # Errors
    ///
    /// `Numerical` if the generator or step produce non-finite blocks.
    pub fn assemble(generator: &Matrix2, h: f64, n: usize) -> InferenceResult<Self> {
        if !h.is_finite() || generator.iter().any(|v| !v.is_finite()) {
            return Err(InferenceError::Numerical(format!(
                "non-finite transition generator or step (h = {h})"
            )));
        }

        let blocks: Vec<Matrix2> = (0..n)
            .map(|i| (generator * (h * (i + 1) as f64)).exp())
            .collect();

        if blocks.iter().any(|b| b.iter().any(|v| !v.is_finite())) {
            return Err(InferenceError::Numerical(
                "matrix exponential overflowed".to_string(),
            ));
        }

        let a1 = Matrix::from_fn(STATE_DIM, n, |r, c| blocks[c][(r, 0)]);
        let a2 = Matrix::from_fn(STATE_DIM, n, |r, c| blocks[c][(r, 1)]);

        let mut aa = Matrix::zeros(STATE_DIM * n, STATE_DIM * n);
        for j in 1..n {
            for k in 0..j {
                aa.fixed_view_mut::<2, 2>(STATE_DIM * j, STATE_DIM * k)
                    .copy_from(&blocks[j - k - 1]);
            }
        }

        Ok(Self { blocks, a1, a2, aa })
    }

    /// Number of samples `N` in the window.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the window has no samples.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Block `(j, k)` of `AA`.
    pub fn block(&self, j: usize, k: usize) -> Matrix2 {
        self.aa
            .fixed_view::<2, 2>(STATE_DIM * j, STATE_DIM * k)
            .into_owned()
    }
}
