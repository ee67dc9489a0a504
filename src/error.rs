//! Error types for the inference pipeline.

use thiserror::Error;

/// Errors that abort an inference run for a single window.
///
/// Numerical degeneracies inside the optimizer loop are not errors: they are
/// absorbed as rejected (`+∞`) candidates and show up as degraded fit quality.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    /// Arrays or matrices with inconsistent dimensions.
    #[error("shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Where the mismatch was detected.
        context: &'static str,
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },

    /// The measurement record is too short to form a window.
    #[error("insufficient data: need at least {needed} window samples, got {got}")]
    InsufficientData {
        /// Minimum window length.
        needed: usize,
        /// Window length derived from the record.
        got: usize,
    },

    /// A physical parameter has a value the model cannot use.
    #[error("invalid parameter {key}: {reason}")]
    InvalidParameter {
        /// Dotted parameter key.
        key: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A dotted key that is not part of the parameter set.
    #[error("unknown parameter key: {0}")]
    UnknownParameter(String),

    /// Every optimizer restart ended on an infeasible candidate.
    #[error("no feasible fit after {restarts} optimizer starts")]
    NoFeasibleFit {
        /// Number of starts that were evaluated.
        restarts: usize,
    },

    /// Unrecoverable numerical failure (e.g. SVD did not converge).
    #[error("numerical error: {0}")]
    Numerical(String),
}

/// Result alias used throughout the crate.
pub type InferenceResult<T> = Result<T, InferenceError>;
