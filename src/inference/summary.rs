//! Result summarization at the accepted optimum.
//!
//! Recomputes the posterior for the winning hyperparameters and derives the
//! recovered force, residuals, a quadratic force-vs-voltage fit and
//! goodness-of-fit statistics. Nothing is rendered here.

use std::f64::consts::PI;

use crate::error::{InferenceError, InferenceResult};
use crate::model::observed_rows;
use crate::params::PhysicalParams;
use crate::result::{ForceFit, PosteriorSummary};
use crate::statistics::{centered, polyfit, relative_residual_norm};
use crate::types::{Vector, STATE_DIM};

use super::objective::{FitState, MarginalLikelihood};
use super::optimizer::OptimizationOutcome;

/// Inputs of the summarizer that come from the caller rather than the fit.
#[derive(Debug, Clone, Copy)]
pub struct SummaryInputs<'a> {
    /// Physical parameters of the run.
    pub params: &'a PhysicalParams,
    /// Drive frequency of the pixel in Hz.
    pub drive_hz: f64,
    /// Raw force record the measured segment is cut from.
    pub force_record: &'a [f64],
    /// Offset of the measured segment inside `force_record`.
    pub force_offset: usize,
    /// Scale applied to the measured segment.
    pub unit_scale: f64,
}

/// Recompute the posterior at the optimum and summarize the fit.
///
/// # Errors
///
/// `ShapeMismatch` if the force record is too short for the segment;
/// errors from recomputing the posterior propagate.
pub fn summarize(
    objective: &MarginalLikelihood<'_>,
    outcome: OptimizationOutcome,
    inputs: &SummaryInputs<'_>,
) -> InferenceResult<ForceFit> {
    let state = objective.fit_state(outcome.best)?;
    summarize_state(objective.observations(), &state, outcome, inputs)
}

/// Summarize an already computed fit state.
pub fn summarize_state(
    y: &Vector,
    state: &FitState,
    outcome: OptimizationOutcome,
    inputs: &SummaryInputs<'_>,
) -> InferenceResult<ForceFit> {
    let n = y.len();
    let m = state.design.ncols();
    let force_terms = m - STATE_DIM;

    let regressors = observed_rows(&state.basis);
    let coefficients = state.posterior.mean.rows(STATE_DIM, force_terms);
    let force_cov = state
        .posterior
        .covariance
        .view((STATE_DIM, STATE_DIM), (force_terms, force_terms));

    let recovered = &regressors * coefficients;
    let band_cov = &regressors * force_cov * regressors.transpose();
    let force_band: Vec<f64> = band_cov.diagonal().iter().map(|v| v.max(0.0).sqrt()).collect();
    let force_coefficient_std: Vec<f64> =
        force_cov.diagonal().iter().map(|v| v.max(0.0).sqrt()).collect();

    let residual = y - &state.design * &state.posterior.mean;
    let relative_rmse = relative_residual_norm(&residual, y);

    let measured_force = force_segment(inputs, n)?;

    let params = inputs.params;
    let step = params.t_max / params.reduction_factor / n as f64;
    let omega = 2.0 * PI * inputs.drive_hz;
    let drive_voltage: Vec<f64> = (0..n)
        .map(|i| params.drive_amplitude * (omega * i as f64 * step + params.phase_shift).sin())
        .collect();

    let recovered_force: Vec<f64> = recovered.iter().copied().collect();
    let fit = polyfit(&drive_voltage, &recovered_force, 2)?;
    let quadratic = [fit.coefficients[0], fit.coefficients[1], fit.coefficients[2]];

    Ok(ForceFit {
        phase: state.hyperparameters.phi,
        drive_phase_shift: params.phase_shift,
        snr: params.snr,
        relative_rmse,
        recovered_force,
        force_band,
        measured_force,
        residuals: residual.iter().copied().collect(),
        drive_voltage,
        quadratic,
        r_squared: fit.r_squared,
        posterior: PosteriorSummary {
            hyperparameters: state.hyperparameters,
            objective: outcome.value,
            mean: state.posterior.mean.iter().copied().collect(),
            force_coefficient_std,
            optimizer: outcome,
        },
    })
}

/// Mean-centred, scaled samples `[offset + 1, offset + n + 1)` of the force
/// record.
fn force_segment(inputs: &SummaryInputs<'_>, n: usize) -> InferenceResult<Vec<f64>> {
    let actual = inputs.force_record.len();
    let too_short = |expected| InferenceError::ShapeMismatch {
        context: "force record length for measured segment",
        expected,
        actual,
    };
    let start = inputs
        .force_offset
        .checked_add(1)
        .ok_or_else(|| too_short(usize::MAX))?;
    let end = start.checked_add(n).ok_or_else(|| too_short(usize::MAX))?;
    if actual < end {
        return Err(too_short(end));
    }

    Ok(centered(inputs.force_record)[start..end]
        .iter()
        .map(|f| f * inputs.unit_scale)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::optimizer::{StartRecord, Termination};
    use crate::model::{oscillator_generator, StateTransition, WindowContext};
    use crate::types::Hyperparameters;

    fn context(n: usize, m0: Vector) -> WindowContext {
        let h = 0.25;
        let st = StateTransition::assemble(&oscillator_generator(115.0), h, n).unwrap();
        let tt = (0..n).map(|i| i as f64 * h).collect();
        WindowContext::new(st, 0.96, tt, h, m0, 2, 3.0, 2.0).unwrap()
    }

    fn outcome_at(hyper: Hyperparameters) -> OptimizationOutcome {
        OptimizationOutcome {
            best: hyper,
            value: 0.0,
            starts: vec![StartRecord {
                start: hyper,
                end: hyper,
                value: 0.0,
                best_so_far: 0.0,
                iterations: 0,
                evaluations: 0,
                termination: Termination::Converged,
            }],
            budget_exhausted: false,
        }
    }

    #[test]
    fn test_summary_shapes_and_bounds() {
        let truth = Vector::from_vec(vec![0.5, -0.2, 1.0, 0.3, -0.4]);
        let ctx = context(30, truth.clone());
        let hyper = Hyperparameters::new(1.0, 0.1, -1.0);
        let (_, cc) = ctx.design(hyper.phi).unwrap();
        let y = cc * &truth;

        let params = PhysicalParams::default();
        let force: Vec<f64> = (0..1100).map(|i| (i as f64 * 0.01).cos()).collect();
        let inputs = SummaryInputs {
            params: &params,
            drive_hz: 56e3,
            force_record: &force,
            force_offset: 1000,
            unit_scale: 1.0,
        };

        let objective = MarginalLikelihood::new(&ctx, &y).unwrap();
        let fit = summarize(&objective, outcome_at(hyper), &inputs).unwrap();

        assert_eq!(fit.len(), 30);
        assert_eq!(fit.measured_force.len(), 30);
        assert_eq!(fit.residuals.len(), 30);
        assert_eq!(fit.force_band.len(), 30);
        assert_eq!(fit.posterior.force_coefficient_std.len(), 3);
        assert!(fit.r_squared <= 1.0);
        assert!(fit.relative_rmse < 1e-8, "rmse = {}", fit.relative_rmse);
        assert_eq!(fit.phase, -1.0);
        assert_eq!(fit.snr, 12.0);
        assert_eq!(fit.drive_phase_shift, 0.2);
    }

    #[test]
    fn test_recovered_force_is_basis_times_coefficients() {
        let truth = Vector::from_vec(vec![0.0, 0.0, 1.0, 0.3, -0.4]);
        let ctx = context(20, truth.clone());
        let hyper = Hyperparameters::new(1.0, 0.1, -0.5);
        let (_, cc) = ctx.design(hyper.phi).unwrap();
        let y = cc * &truth;
        let params = PhysicalParams::default();
        let force = vec![0.0; 1100];
        let inputs = SummaryInputs {
            params: &params,
            drive_hz: 56e3,
            force_record: &force,
            force_offset: 1000,
            unit_scale: 1e9,
        };
        let objective = MarginalLikelihood::new(&ctx, &y).unwrap();
        let fit = summarize(&objective, outcome_at(hyper), &inputs).unwrap();

        for (i, &t) in ctx.tt.iter().enumerate() {
            let s = (ctx.w * t + hyper.phi).sin();
            let expected = 1.0 + 0.3 * s - 0.4 * s * s;
            assert!((fit.recovered_force[i] - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_short_force_record() {
        let truth = Vector::from_vec(vec![0.5, -0.2, 1.0, 0.3, -0.4]);
        let ctx = context(10, truth.clone());
        let hyper = Hyperparameters::new(1.0, 0.1, -1.0);
        let (_, cc) = ctx.design(hyper.phi).unwrap();
        let y = cc * &truth;
        let params = PhysicalParams::default();
        let force = vec![0.0; 1005];
        let inputs = SummaryInputs {
            params: &params,
            drive_hz: 56e3,
            force_record: &force,
            force_offset: 1000,
            unit_scale: 1.0,
        };
        let objective = MarginalLikelihood::new(&ctx, &y).unwrap();
        assert!(matches!(
            summarize(&objective, outcome_at(hyper), &inputs),
            Err(InferenceError::ShapeMismatch { expected: 1011, actual: 1005, .. })
        ));
    }

    #[test]
    fn test_force_offset_overflow() {
        let truth = Vector::from_vec(vec![0.5, -0.2, 1.0, 0.3, -0.4]);
        let ctx = context(10, truth.clone());
        let hyper = Hyperparameters::new(1.0, 0.1, -1.0);
        let (_, cc) = ctx.design(hyper.phi).unwrap();
        let y = cc * &truth;
        let params = PhysicalParams::default();
        let force = vec![0.0; 1100];
        let objective = MarginalLikelihood::new(&ctx, &y).unwrap();
        for offset in [usize::MAX, usize::MAX - 5] {
            let inputs = SummaryInputs {
                params: &params,
                drive_hz: 56e3,
                force_record: &force,
                force_offset: offset,
                unit_scale: 1.0,
            };
            assert!(matches!(
                summarize(&objective, outcome_at(hyper), &inputs),
                Err(InferenceError::ShapeMismatch { expected: usize::MAX, actual: 1100, .. })
            ));
        }
    }
}
