//! Per-window fixed quantities.
//!
//! Everything in [`WindowContext`] is invariant across optimizer trials;
//! only the phase-dependent basis and design matrix are rebuilt per trial.

use std::f64::consts::PI;

use crate::error::{InferenceError, InferenceResult};
use crate::params::PhysicalParams;
use crate::types::{Matrix, Vector, STATE_DIM};

use super::basis::force_basis;
use super::design::design_matrix;
use super::transition::{oscillator_generator, StateTransition};

/// Minimum window length: the prior mean needs a first difference.
pub const MIN_WINDOW_LEN: usize = 2;

/// A mean-centred measurement window in nanometres.
#[derive(Debug, Clone)]
pub struct MeasurementWindow {
    /// Observations `y` (length `N`).
    pub y: Vector,
}

impl MeasurementWindow {
    /// Cut the window from a raw displacement record.
    ///
    /// The record is mean-centred over its full length, the leading
    /// `len / reduction` samples are kept and scaled by `scale`.
    pub fn from_record(record: &[f64], reduction: usize, scale: f64) -> InferenceResult<Self> {
        let n = record.len() / reduction.max(1);
        if n < MIN_WINDOW_LEN {
            return Err(InferenceError::InsufficientData {
                needed: MIN_WINDOW_LEN,
                got: n,
            });
        }

        let mean = record.iter().sum::<f64>() / record.len() as f64;
        let y = Vector::from_iterator(n, record[..n].iter().map(|x| (x - mean) * scale));
        Ok(Self { y })
    }

    /// Window length `N`.
    pub fn len(&self) -> usize {
        self.y.len()
    }

    /// Whether the window is empty.
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

/// Fixed inputs shared by every objective evaluation of one window.
#[derive(Debug, Clone)]
pub struct WindowContext {
    /// Propagators `AA`, `a1`, `a2`.
    pub transition: StateTransition,
    /// Drive frequency normalised by the resonance.
    pub w: f64,
    /// Dimensionless sample times.
    pub tt: Vec<f64>,
    /// Dimensionless step.
    pub h: f64,
    /// Prior mean over `[x0, v0, c0..cn]`.
    pub m0: Vector,
    /// Polynomial order `n`.
    pub order: usize,
    /// Prior standard deviation of the initial conditions.
    pub sigma_ic: f64,
    /// Power-law exponent of the basis-coefficient prior precision.
    pub decay: f64,
}

impl WindowContext {
    /// Build the context for a window from the physical parameters.
    ///
    /// `drive_hz` is the AC drive frequency of the pixel. The prior mean
    /// extrapolates the initial position and velocity from the first two
    /// observations.
    pub fn from_params(
        window: &MeasurementWindow,
        drive_hz: f64,
        params: &PhysicalParams,
        sigma_ic: f64,
    ) -> InferenceResult<Self> {
        params.validate()?;
        if !drive_hz.is_finite() || drive_hz <= 0.0 {
            return Err(InferenceError::InvalidParameter {
                key: "drive_hz".to_string(),
                reason: format!("must be positive and finite, got {drive_hz}"),
            });
        }

        let n = window.len();
        if n < MIN_WINDOW_LEN {
            return Err(InferenceError::InsufficientData {
                needed: MIN_WINDOW_LEN,
                got: n,
            });
        }

        let f0 = params.resonance_hz;
        let w = drive_hz / f0;
        let duration = params.t_max * f0 * 2.0 * PI / params.reduction_factor;
        let h = duration / n as f64;
        let tt: Vec<f64> = (0..n).map(|i| i as f64 * h).collect();

        let order = params.polynomial_order();
        let y = &window.y;
        let dy = y[1] - y[0];
        let mut m0 = Vector::zeros(STATE_DIM + order + 1);
        m0[0] = y[0] - dy;
        m0[1] = dy / h;

        let generator = oscillator_generator(params.quality_factor);
        let transition = StateTransition::assemble(&generator, h, n)?;

        Self::new(transition, w, tt, h, m0, order, sigma_ic, params.prior_decay)
    }

    /// Assemble a context from explicit parts.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if `tt`, `m0` and the transition disagree on sizes.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transition: StateTransition,
        w: f64,
        tt: Vec<f64>,
        h: f64,
        m0: Vector,
        order: usize,
        sigma_ic: f64,
        decay: f64,
    ) -> InferenceResult<Self> {
        if tt.len() != transition.len() {
            return Err(InferenceError::ShapeMismatch {
                context: "time vector vs. state transition",
                expected: transition.len(),
                actual: tt.len(),
            });
        }
        if m0.len() != STATE_DIM + order + 1 {
            return Err(InferenceError::ShapeMismatch {
                context: "prior mean length",
                expected: STATE_DIM + order + 1,
                actual: m0.len(),
            });
        }

        Ok(Self {
            transition,
            w,
            tt,
            h,
            m0,
            order,
            sigma_ic,
            decay,
        })
    }

    /// Window length `N`.
    pub fn len(&self) -> usize {
        self.tt.len()
    }

    /// Whether the window has no samples.
    pub fn is_empty(&self) -> bool {
        self.tt.is_empty()
    }

    /// Number of latent coefficients `M = 2 + n + 1`.
    pub fn num_coefficients(&self) -> usize {
        STATE_DIM + self.order + 1
    }

    /// Force basis `B(φ)` on this window's time grid.
    pub fn basis(&self, phi: f64) -> Matrix {
        force_basis(phi, self.w, &self.tt, self.order)
    }

    /// Basis and design matrix `CC(φ)`.
    pub fn design(&self, phi: f64) -> InferenceResult<(Matrix, Matrix)> {
        let basis = self.basis(phi);
        let cc = design_matrix(&self.transition, &basis, self.h)?;
        Ok((basis, cc))
    }

    /// Diagonal of the prior precision `P0` for basis scale `sigma`.
    ///
    /// `[1/σᵢ², 1/σᵢ², 1^aa/σ², 2^aa/σ², …, (n+1)^aa/σ²]`
    pub fn prior_precision(&self, sigma: f64) -> Vector {
        let ic = 1.0 / (self.sigma_ic * self.sigma_ic);
        let basis_scale = 1.0 / (sigma * sigma);
        Vector::from_iterator(
            self.num_coefficients(),
            [ic, ic].into_iter().chain(
                (1..=self.order + 1).map(|k| (k as f64).powf(self.decay) * basis_scale),
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_from_record() {
        let record: Vec<f64> = (0..40).map(|i| 1e-9 * i as f64).collect();
        let w = MeasurementWindow::from_record(&record, 4, 1e9).unwrap();
        assert_eq!(w.len(), 10);
        // Mean of 0..40 is 19.5 nm
        assert!((w.y[0] + 19.5).abs() < 1e-9);
        assert!((w.y[9] + 10.5).abs() < 1e-9);
    }

    #[test]
    fn test_window_too_short() {
        let res = MeasurementWindow::from_record(&[1.0; 100], 64, 1.0);
        assert!(matches!(
            res,
            Err(InferenceError::InsufficientData { needed: 2, got: 1 })
        ));
    }

    #[test]
    fn test_context_from_default_params() {
        let params = PhysicalParams::default();
        let record: Vec<f64> = (0..params.reduction() * 16)
            .map(|i| (0.01 * i as f64).sin() * 1e-9)
            .collect();
        let window = MeasurementWindow::from_record(&record, params.reduction(), 1e9).unwrap();
        let ctx = WindowContext::from_params(&window, 56e3, &params, 3.0).unwrap();

        assert_eq!(ctx.len(), 16);
        assert_eq!(ctx.num_coefficients(), 5);
        assert!((ctx.w - 56.0 / 58.0).abs() < 1e-15);
        let duration = 8.192e-3 * 58e3 * 2.0 * PI / 128.0;
        assert!((ctx.h - duration / 16.0).abs() < 1e-12);
        assert_eq!(ctx.transition.aa.shape(), (32, 32));

        let dy = window.y[1] - window.y[0];
        assert!((ctx.m0[0] - (window.y[0] - dy)).abs() < 1e-15);
        assert!((ctx.m0[1] - dy / ctx.h).abs() < 1e-12);
        assert!(ctx.m0.rows(2, 3).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_prior_precision_diagonal() {
        let st = StateTransition::assemble(&oscillator_generator(100.0), 0.1, 3).unwrap();
        let ctx = WindowContext::new(st, 1.0, vec![0.0, 0.1, 0.2], 0.1, Vector::zeros(5), 2, 3.0, 2.0)
            .unwrap();
        let p0 = ctx.prior_precision(0.5);
        let expected = [1.0 / 9.0, 1.0 / 9.0, 4.0, 16.0, 36.0];
        for (a, b) in p0.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_context_rejects_bad_prior_mean() {
        let st = StateTransition::assemble(&oscillator_generator(100.0), 0.1, 3).unwrap();
        let res = WindowContext::new(st, 1.0, vec![0.0, 0.1, 0.2], 0.1, Vector::zeros(4), 2, 3.0, 2.0);
        assert!(matches!(
            res,
            Err(InferenceError::ShapeMismatch { expected: 5, actual: 4, .. })
        ));
    }
}
