//! Main `BayesianInference` entry point and builder.

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::Config;
use crate::error::InferenceResult;
use crate::inference::{
    summarize_state, FitState, HyperparameterOptimizer, MarginalLikelihood, OptimizationOutcome,
    SummaryInputs,
};
use crate::model::{MeasurementWindow, WindowContext};
use crate::params::PhysicalParams;
use crate::result::ForceFit;
use crate::statistics::counter_rng_seed;

/// Main entry point for force-curve inference.
///
/// Use the builder pattern to configure and run inference on one pixel or a
/// batch of pixels.
///
/// # Example
///
/// ```ignore
/// use kpfm_bayes::{BayesianInference, PhysicalParams};
///
/// let fit = BayesianInference::new()
///     .params(PhysicalParams::default())
///     .restarts(4)
///     .process_pixel(&displacement, &force, 56e3)?;
///
/// println!("phase {:.3} rad, R² {:.3}", fit.phase, fit.r_squared);
/// ```
#[derive(Debug, Clone)]
pub struct BayesianInference {
    config: Config,
    params: PhysicalParams,
}

/// Intermediate products of fitting one window.
#[derive(Debug, Clone)]
pub struct WindowFit {
    /// The measurement window.
    pub window: MeasurementWindow,
    /// Fixed per-window context.
    pub context: WindowContext,
    /// Optimizer outcome.
    pub outcome: OptimizationOutcome,
    /// Basis, design and posterior at the optimum.
    pub state: FitState,
}

/// Borrowed inputs of one pixel in a batch.
#[derive(Debug, Clone, Copy)]
pub struct PixelInput<'a> {
    /// Raw displacement record.
    pub record: &'a [f64],
    /// Raw force record the measured segment is cut from.
    pub force: &'a [f64],
    /// AC drive frequency in Hz.
    pub drive_hz: f64,
}

impl Default for BayesianInference {
    fn default() -> Self {
        Self::new()
    }
}

impl BayesianInference {
    /// Create with default configuration and default physical parameters.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            params: PhysicalParams::default(),
        }
    }

    /// Create with a fast configuration for exploration and tests.
    ///
    /// Settings:
    /// - 2 restarts (vs 10 default)
    /// - 200 iterations / evaluations per start (vs 600 default)
    /// - 1e-6 tolerances (vs 1e-8 default)
    pub fn quick() -> Self {
        Self {
            config: Config {
                restarts: 2,
                max_iterations: 200,
                max_evaluations: 200,
                f_tolerance: 1e-6,
                x_tolerance: 1e-6,
                ..Config::default()
            },
            params: PhysicalParams::default(),
        }
    }

    /// Create with a thorough configuration for final processing.
    ///
    /// Settings:
    /// - 20 restarts (vs 10 default)
    /// - 3,000 iterations / evaluations per start (vs 600 default)
    /// - 1e-12 tolerances (vs 1e-8 default)
    pub fn thorough() -> Self {
        Self {
            config: Config {
                restarts: 20,
                max_iterations: 3_000,
                max_evaluations: 3_000,
                f_tolerance: 1e-12,
                x_tolerance: 1e-12,
                ..Config::default()
            },
            params: PhysicalParams::default(),
        }
    }

    /// Replace the physical parameter set.
    pub fn params(mut self, params: PhysicalParams) -> Self {
        self.params = params;
        self
    }

    /// Set the number of random restarts after the seeded first start.
    pub fn restarts(mut self, n: usize) -> Self {
        self.config.restarts = n;
        self
    }

    /// Set the seed of the start-point generator.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Set the simplex iteration limit per start.
    pub fn max_iterations(mut self, n: usize) -> Self {
        self.config.max_iterations = n;
        self
    }

    /// Set the objective evaluation limit per start.
    pub fn max_evaluations(mut self, n: usize) -> Self {
        self.config.max_evaluations = n;
        self
    }

    /// Set the value and vertex tolerances of the simplex search.
    pub fn tolerances(mut self, f_tolerance: f64, x_tolerance: f64) -> Self {
        self.config.f_tolerance = f_tolerance;
        self.config.x_tolerance = x_tolerance;
        self
    }

    /// Set a wall-clock budget for the optimizer search of each pixel.
    pub fn max_duration_ms(mut self, ms: u64) -> Self {
        self.config.max_duration_ms = Some(ms);
        self
    }

    /// Set the prior standard deviation of the initial conditions.
    pub fn prior_ic_sigma(mut self, sigma: f64) -> Self {
        self.config.prior_ic_sigma = sigma;
        self
    }

    /// Set the offset of the measured force segment in the force record.
    pub fn force_offset(mut self, offset: usize) -> Self {
        self.config.force_offset = offset;
        self
    }

    /// Set the scale from record units to window units.
    pub fn unit_scale(mut self, scale: f64) -> Self {
        self.config.unit_scale = scale;
        self
    }

    /// Get the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the physical parameters.
    pub fn physical_params(&self) -> &PhysicalParams {
        &self.params
    }

    /// Cut the window and build its fixed context.
    pub fn prepare(
        &self,
        record: &[f64],
        drive_hz: f64,
    ) -> InferenceResult<(MeasurementWindow, WindowContext)> {
        self.params.validate()?;
        let window =
            MeasurementWindow::from_record(record, self.params.reduction(), self.config.unit_scale)?;
        let context =
            WindowContext::from_params(&window, drive_hz, &self.params, self.config.prior_ic_sigma)?;
        Ok((window, context))
    }

    /// Fit one window with the configured seed.
    pub fn fit_window(&self, record: &[f64], drive_hz: f64) -> InferenceResult<WindowFit> {
        self.fit_window_seeded(record, drive_hz, self.config.seed)
    }

    fn fit_window_seeded(
        &self,
        record: &[f64],
        drive_hz: f64,
        seed: u64,
    ) -> InferenceResult<WindowFit> {
        let (window, context) = self.prepare(record, drive_hz)?;
        debug!(
            samples = window.len(),
            coefficients = context.num_coefficients(),
            h = context.h,
            w = context.w,
            "window prepared"
        );

        let objective = MarginalLikelihood::new(&context, &window.y)?;
        let optimizer = HyperparameterOptimizer::from_config(&self.config);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let outcome = optimizer.optimize(&objective, &mut rng)?;
        let state = objective.fit_state(outcome.best)?;

        Ok(WindowFit {
            window,
            context,
            outcome,
            state,
        })
    }

    /// Run inference on one pixel and summarize the fit.
    ///
    /// `record` is the raw displacement, `force` the raw force record the
    /// measured segment is cut from, `drive_hz` the AC drive frequency.
    ///
    /// # Errors
    ///
    /// Shape and parameter errors abort the pixel; `NoFeasibleFit` if no
    /// optimizer start reached a feasible phase.
    pub fn process_pixel(
        &self,
        record: &[f64],
        force: &[f64],
        drive_hz: f64,
    ) -> InferenceResult<ForceFit> {
        self.process_pixel_seeded(record, force, drive_hz, self.config.seed)
    }

    fn process_pixel_seeded(
        &self,
        record: &[f64],
        force: &[f64],
        drive_hz: f64,
        seed: u64,
    ) -> InferenceResult<ForceFit> {
        let fit = self.fit_window_seeded(record, drive_hz, seed)?;
        let inputs = SummaryInputs {
            params: &self.params,
            drive_hz,
            force_record: force,
            force_offset: self.config.force_offset,
            unit_scale: self.config.unit_scale,
        };
        summarize_state(&fit.window.y, &fit.state, fit.outcome, &inputs)
    }

    /// Run inference on a batch of pixels.
    ///
    /// Pixels are independent; with the `parallel` feature they run on the
    /// shared thread pool. Pixel `k` uses a seed derived from the configured
    /// seed and `k`, so results do not depend on scheduling. Results are in
    /// input order.
    pub fn process_pixels(&self, pixels: &[PixelInput<'_>]) -> Vec<InferenceResult<ForceFit>> {
        let run = |(k, pixel): (usize, &PixelInput<'_>)| {
            let seed = counter_rng_seed(self.config.seed, k as u64);
            self.process_pixel_seeded(pixel.record, pixel.force, pixel.drive_hz, seed)
        };

        #[cfg(feature = "parallel")]
        {
            crate::thread_pool::install(|| pixels.par_iter().enumerate().map(run).collect())
        }

        #[cfg(not(feature = "parallel"))]
        {
            crate::thread_pool::install(|| pixels.iter().enumerate().map(run).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(BayesianInference::new().config().restarts, 10);
        assert_eq!(BayesianInference::quick().config().restarts, 2);
        assert_eq!(BayesianInference::thorough().config().max_iterations, 3_000);
    }

    #[test]
    fn test_builder_setters() {
        let engine = BayesianInference::new()
            .restarts(3)
            .seed(42)
            .max_iterations(50)
            .max_evaluations(80)
            .tolerances(1e-5, 1e-6)
            .max_duration_ms(250)
            .prior_ic_sigma(2.0)
            .force_offset(10)
            .unit_scale(1.0);
        let c = engine.config();
        assert_eq!(c.restarts, 3);
        assert_eq!(c.seed, 42);
        assert_eq!(c.max_iterations, 50);
        assert_eq!(c.max_evaluations, 80);
        assert_eq!((c.f_tolerance, c.x_tolerance), (1e-5, 1e-6));
        assert_eq!(c.max_duration_ms, Some(250));
        assert_eq!(c.prior_ic_sigma, 2.0);
        assert_eq!(c.force_offset, 10);
        assert_eq!(c.unit_scale, 1.0);
    }

    #[test]
    fn test_prepare_rejects_invalid_params() {
        let mut params = PhysicalParams::default();
        params.quality_factor = -1.0;
        let engine = BayesianInference::new().params(params);
        assert!(engine.prepare(&[0.0; 1024], 56e3).is_err());
    }
}
