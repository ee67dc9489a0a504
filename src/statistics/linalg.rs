//! Least-squares solve and small vector helpers.

use nalgebra::SVD;

use crate::error::{InferenceError, InferenceResult};
use crate::types::{Matrix, Vector};

/// Solve `A·X = B` in the least-squares, minimum-norm sense.
///
/// Singular values below `ε · max(rows, cols) · s_max` are treated as zero,
/// which is numpy's default `rcond`. A rank-deficient `A` therefore yields the
/// pseudo-inverse solution instead of an error.
///
/// # Errors
///
/// Returns `Numerical` only if the SVD itself fails to converge or `A`
/// contains non-finite entries.
pub fn lstsq(a: &Matrix, b: &Matrix) -> InferenceResult<Matrix> {
    if a.nrows() != b.nrows() {
        return Err(InferenceError::ShapeMismatch {
            context: "least-squares right-hand side rows",
            expected: a.nrows(),
            actual: b.nrows(),
        });
    }
    if a.iter().any(|v| !v.is_finite()) {
        return Err(InferenceError::Numerical(
            "non-finite entry in least-squares system".to_string(),
        ));
    }

    let (rows, cols) = a.shape();
    let svd = SVD::try_new(a.clone(), true, true, f64::EPSILON, 0)
        .ok_or_else(|| InferenceError::Numerical("SVD did not converge".to_string()))?;

    let s_max = svd.singular_values.max();
    let cutoff = f64::EPSILON * rows.max(cols) as f64 * s_max;

    svd.solve(b, cutoff)
        .map_err(|e| InferenceError::Numerical(e.to_string()))
}

/// Return `(M + Mᵀ) / 2`.
pub fn symmetrize(m: &Matrix) -> Matrix {
    (m + m.transpose()) * 0.5
}

/// Subtract the mean from every element.
pub fn centered(data: &[f64]) -> Vec<f64> {
    if data.is_empty() {
        return Vec::new();
    }
    let mean = data.iter().sum::<f64>() / data.len() as f64;
    data.iter().map(|x| x - mean).collect()
}

/// `‖residual‖ / ‖reference‖`, or the bare residual norm when the reference
/// is identically zero.
pub fn relative_residual_norm(residual: &Vector, reference: &Vector) -> f64 {
    let denom = reference.norm();
    if denom > 0.0 {
        residual.norm() / denom
    } else {
        residual.norm()
    }
}
