//! Observation design matrix.
//!
//! Columns of `CC` are the displacement responses to each latent
//! coefficient: unit initial position, unit initial velocity, then each
//! force-basis function convolved through the oscillator.

use crate::error::{InferenceError, InferenceResult};
use crate::types::{Matrix, STATE_DIM};

use super::transition::StateTransition;

/// Build the `N × M` design matrix `CC` for one basis.
///
/// Computes `BB = AA·B·h`, stacks `[vec(a1), vec(a2), BB]` into the
/// `2N × M` state-level matrix and keeps the position (even) rows.
///
/// # Errors
///
/// `ShapeMismatch` if the basis was built for a different window length, or
/// if the subsampled matrix does not have one row per observation.
pub fn design_matrix(transition: &StateTransition, basis: &Matrix, h: f64) -> InferenceResult<Matrix> {
    let n = transition.len();
    let state_rows = STATE_DIM * n;

    if basis.nrows() != state_rows {
        return Err(InferenceError::ShapeMismatch {
            context: "force basis rows vs. state transition",
            expected: state_rows,
            actual: basis.nrows(),
        });
    }

    let forced = &transition.aa * basis * h;
    let m = STATE_DIM + basis.ncols();

    // Column-major storage of a1/a2 is exactly the stacked (position, velocity)
    // response per sample.
    let mut full = Matrix::zeros(state_rows, m);
    full.column_mut(0).copy_from_slice(transition.a1.as_slice());
    full.column_mut(1).copy_from_slice(transition.a2.as_slice());
    full.columns_mut(STATE_DIM, basis.ncols()).copy_from(&forced);

    let position_rows: Vec<usize> = (0..state_rows).step_by(STATE_DIM).collect();
    let cc = full.select_rows(position_rows.iter());

    if cc.nrows() != n {
        return Err(InferenceError::ShapeMismatch {
            context: "design matrix rows vs. observations",
            expected: n,
            actual: cc.nrows(),
        });
    }

    Ok(cc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::basis::force_basis;
    use crate::model::transition::oscillator_generator;

    fn setup(n: usize, h: f64) -> (StateTransition, Vec<f64>) {
        let st = StateTransition::assemble(&oscillator_generator(115.0), h, n).unwrap();
        let tt = (0..n).map(|i| i as f64 * h).collect();
        (st, tt)
    }

    #[test]
    fn test_design_shape() {
        let (st, tt) = setup(12, 0.1);
        let b = force_basis(-0.5, 0.96, &tt, 2);
        let cc = design_matrix(&st, &b, 0.1).unwrap();
        assert_eq!(cc.shape(), (12, 5));
    }

    #[test]
    fn test_initial_condition_columns() {
        let (st, tt) = setup(8, 0.2);
        let b = force_basis(-0.5, 0.96, &tt, 1);
        let cc = design_matrix(&st, &b, 0.2).unwrap();
        for i in 0..8 {
            assert_eq!(cc[(i, 0)], st.blocks[i][(0, 0)]);
            assert_eq!(cc[(i, 1)], st.blocks[i][(0, 1)]);
        }
    }

    #[test]
    fn test_forcing_columns_are_causal_convolution() {
        let h = 0.15;
        let (st, tt) = setup(6, h);
        let b = force_basis(-1.0, 0.9, &tt, 2);
        let cc = design_matrix(&st, &b, h).unwrap();

        // First sample sees no forcing yet
        for k in 0..3 {
            assert_eq!(cc[(0, 2 + k)], 0.0);
        }

        // Position at sample j accumulates velocity kicks from earlier samples
        for j in 0..6 {
            for k in 0..3 {
                let expected: f64 = (0..j)
                    .map(|i| st.blocks[j - i - 1][(0, 1)] * b[(2 * i + 1, k)] * h)
                    .sum();
                assert!((cc[(j, 2 + k)] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_basis_length_mismatch() {
        let (st, _) = setup(5, 0.1);
        let tt: Vec<f64> = (0..4).map(|i| i as f64).collect();
        let b = force_basis(0.0, 1.0, &tt, 2);
        assert!(matches!(
            design_matrix(&st, &b, 0.1),
            Err(InferenceError::ShapeMismatch { expected: 10, actual: 8, .. })
        ));
    }
}
