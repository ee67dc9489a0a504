//! Low-degree polynomial regression.

use serde::{Deserialize, Serialize};

use crate::error::{InferenceError, InferenceResult};
use crate::types::Matrix;

use super::linalg::lstsq;

/// Least-squares polynomial fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolyFit {
    /// Coefficients, highest degree first.
    pub coefficients: Vec<f64>,
    /// Coefficient of determination of the fit.
    pub r_squared: f64,
}

/// Fit a polynomial of the given degree to `(x, y)`.
///
/// Solves the Vandermonde system `V·p = y` by least squares, so degenerate
/// abscissae (fewer distinct points than coefficients) yield the minimum-norm
/// coefficient vector instead of failing.
///
/// # Errors
///
/// `ShapeMismatch` if `x` and `y` differ in length, `InsufficientData` if
/// they are empty.
pub fn polyfit(x: &[f64], y: &[f64], degree: usize) -> InferenceResult<PolyFit> {
    if x.len() != y.len() {
        return Err(InferenceError::ShapeMismatch {
            context: "polynomial fit abscissa/ordinate",
            expected: x.len(),
            actual: y.len(),
        });
    }
    if x.is_empty() {
        return Err(InferenceError::InsufficientData { needed: 1, got: 0 });
    }

    let vandermonde = Matrix::from_fn(x.len(), degree + 1, |i, j| {
        x[i].powi((degree - j) as i32)
    });
    let rhs = Matrix::from_column_slice(y.len(), 1, y);
    let solution = lstsq(&vandermonde, &rhs)?;
    let coefficients: Vec<f64> = solution.column(0).iter().copied().collect();

    let fitted: Vec<f64> = x.iter().map(|&xi| polyval(&coefficients, xi)).collect();
    let r_squared = r_squared(y, &fitted);

    Ok(PolyFit {
        coefficients,
        r_squared,
    })
}

/// Evaluate a polynomial (highest degree first) with Horner's scheme.
pub fn polyval(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().fold(0.0, |acc, &c| acc * x + c)
}

/// Coefficient of determination `1 − SS_resid / SS_total`.
///
/// Never exceeds 1. A constant `observed` series has no variance to explain:
/// it scores 1 when reproduced exactly and 0 otherwise.
pub fn r_squared(observed: &[f64], fitted: &[f64]) -> f64 {
    let n = observed.len();
    if n == 0 {
        return 0.0;
    }
    let mean = observed.iter().sum::<f64>() / n as f64;
    let ss_total: f64 = observed.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_resid: f64 = observed
        .iter()
        .zip(fitted)
        .map(|(y, f)| (y - f).powi(2))
        .sum();

    // Relative to the data scale; exact zero is rare after a least-squares fit
    let scale = observed.iter().map(|y| y * y).sum::<f64>().max(f64::MIN_POSITIVE);
    if ss_total <= scale * 1e-24 {
        return if ss_resid <= scale * 1e-24 { 1.0 } else { 0.0 };
    }

    (1.0 - ss_resid / ss_total).min(1.0)
}
