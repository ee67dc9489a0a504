//! Sinusoidal polynomial basis for the tip-sample force.
//!
//! The force is modelled as a polynomial in the drive voltage, which is
//! itself `sin(w·t + φ)`. The basis lives on the doubled (position, velocity)
//! grid: force enters the velocity equation, so only the velocity rows
//! (odd, 0-based) are populated.

use crate::types::{Matrix, STATE_DIM};

/// Build the `(2N) × (n+1)` basis `B(φ)`.
///
/// Row `2i + 1` holds `sin(w·tᵢ + φ)^k` for `k = 0..=n`; row `2i` is zero.
pub fn force_basis(phi: f64, w: f64, tt: &[f64], order: usize) -> Matrix {
    let n = tt.len();
    let mut basis = Matrix::zeros(STATE_DIM * n, order + 1);

    for (i, &t) in tt.iter().enumerate() {
        let s = (w * t + phi).sin();
        let mut power = 1.0;
        for k in 0..=order {
            basis[(STATE_DIM * i + 1, k)] = power;
            power *= s;
        }
    }

    basis
}

/// Extract the velocity rows of a basis, i.e. the force regressors evaluated
/// at each observation time (`N × (n+1)`).
pub fn observed_rows(basis: &Matrix) -> Matrix {
    let rows: Vec<usize> = (1..basis.nrows()).step_by(STATE_DIM).collect();
    basis.select_rows(rows.iter())
}
