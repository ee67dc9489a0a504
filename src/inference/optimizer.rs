//! Multi-start Nelder–Mead search over `(σ, γ, φ)`.
//!
//! The objective is periodic in `φ` with a hard feasibility wall and is
//! multi-modal in `(σ, γ)`, so a derivative-free simplex search is started
//! from several random points and the lowest final value is kept.
//!
//! Start points are drawn from an injected generator:
//! ```text
//! σ0, γ0 ~ N(0, 1)²      φ0 ~ −π·U(0, 1)
//! ```
//! The first start consumes the generator in its seeded state, every restart
//! continues the same stream.

use std::f64::consts::PI;
use std::time::{Duration, Instant};

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{InferenceError, InferenceResult};
use crate::types::Hyperparameters;

use super::objective::MarginalLikelihood;

/// Why a simplex run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// Both value and vertex spreads fell below tolerance.
    Converged,
    /// Iteration limit reached.
    MaxIterations,
    /// Objective evaluation limit reached.
    MaxEvaluations,
    /// Wall-clock budget exhausted.
    TimeBudget,
    /// Every vertex of the initial simplex was infeasible.
    Infeasible,
}

/// Stopping rules of the simplex search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimplexOptions {
    /// Maximum number of simplex iterations.
    pub max_iterations: usize,
    /// Maximum number of objective evaluations.
    pub max_evaluations: usize,
    /// Tolerance on `max |f(xᵢ) − f(x_best)|`.
    pub f_tolerance: f64,
    /// Tolerance on `max ‖xᵢ − x_best‖∞`.
    pub x_tolerance: f64,
}

impl Default for SimplexOptions {
    fn default() -> Self {
        Self {
            max_iterations: 600,
            max_evaluations: 600,
            f_tolerance: 1e-8,
            x_tolerance: 1e-8,
        }
    }
}

/// Result of one simplex run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimplexResult<const D: usize> {
    /// Best vertex.
    pub x: [f64; D],
    /// Objective at the best vertex.
    pub value: f64,
    /// Iterations performed.
    pub iterations: usize,
    /// Objective evaluations performed.
    pub evaluations: usize,
    /// Stopping reason.
    pub termination: Termination,
}

// Standard coefficients: reflection, expansion, contraction, shrink
const RHO: f64 = 1.0;
const CHI: f64 = 2.0;
const PSI: f64 = 0.5;
const SIGMA: f64 = 0.5;

// Initial simplex perturbations for non-zero and zero coordinates
const NONZERO_DELTA: f64 = 0.05;
const ZERO_DELTA: f64 = 0.00025;

/// Minimize `f` from `x0` with the Nelder–Mead simplex method.
///
/// Infinite objective values are valid and simply rank last. `deadline`
/// stops the search at the next iteration boundary once passed.
pub fn nelder_mead<const D: usize, F>(
    mut f: F,
    x0: [f64; D],
    options: &SimplexOptions,
    deadline: Option<Instant>,
) -> SimplexResult<D>
where
    F: FnMut(&[f64; D]) -> f64,
{
    let mut evaluations = 0usize;
    let mut eval = |x: &[f64; D], evaluations: &mut usize| {
        *evaluations += 1;
        let v = f(x);
        if v.is_nan() {
            f64::INFINITY
        } else {
            v
        }
    };

    let mut simplex: Vec<([f64; D], f64)> = Vec::with_capacity(D + 1);
    let v0 = eval(&x0, &mut evaluations);
    simplex.push((x0, v0));
    for i in 0..D {
        let mut x = x0;
        x[i] = if x[i] != 0.0 {
            (1.0 + NONZERO_DELTA) * x[i]
        } else {
            ZERO_DELTA
        };
        let v = eval(&x, &mut evaluations);
        simplex.push((x, v));
    }
    sort_simplex(&mut simplex);

    if simplex.iter().all(|(_, v)| v.is_infinite()) {
        return finish(simplex, 0, evaluations, Termination::Infeasible);
    }

    let mut iterations = 0usize;
    let termination = loop {
        if has_converged(&simplex, options) {
            break Termination::Converged;
        }
        if iterations >= options.max_iterations {
            break Termination::MaxIterations;
        }
        if evaluations >= options.max_evaluations {
            break Termination::MaxEvaluations;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break Termination::TimeBudget;
        }
        iterations += 1;

        let worst = simplex[D];
        let second_worst = simplex[D - 1].1;
        let best = simplex[0].1;

        let mut centroid = [0.0; D];
        for (x, _) in &simplex[..D] {
            for j in 0..D {
                centroid[j] += x[j] / D as f64;
            }
        }
        let along = |t: f64| -> [f64; D] {
            let mut p = [0.0; D];
            for j in 0..D {
                p[j] = centroid[j] + t * (worst.0[j] - centroid[j]);
            }
            p
        };

        let xr = along(-RHO);
        let fr = eval(&xr, &mut evaluations);

        if fr < best {
            let xe = along(-RHO * CHI);
            let fe = eval(&xe, &mut evaluations);
            simplex[D] = if fe < fr { (xe, fe) } else { (xr, fr) };
        } else if fr < second_worst {
            simplex[D] = (xr, fr);
        } else {
            let contracted = if fr < worst.1 {
                let xc = along(-RHO * PSI);
                let fc = eval(&xc, &mut evaluations);
                (fc <= fr).then_some((xc, fc))
            } else {
                let xcc = along(PSI);
                let fcc = eval(&xcc, &mut evaluations);
                (fcc < worst.1).then_some((xcc, fcc))
            };

            match contracted {
                Some(vertex) => simplex[D] = vertex,
                None => {
                    let anchor = simplex[0].0;
                    for vertex in simplex.iter_mut().skip(1) {
                        for j in 0..D {
                            vertex.0[j] = anchor[j] + SIGMA * (vertex.0[j] - anchor[j]);
                        }
                        vertex.1 = eval(&vertex.0, &mut evaluations);
                    }
                }
            }
        }

        sort_simplex(&mut simplex);
    };

    finish(simplex, iterations, evaluations, termination)
}

fn sort_simplex<const D: usize>(simplex: &mut [([f64; D], f64)]) {
    simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
}

fn has_converged<const D: usize>(simplex: &[([f64; D], f64)], options: &SimplexOptions) -> bool {
    let (x0, f0) = simplex[0];
    let f_spread = simplex[1..]
        .iter()
        .map(|(_, v)| (v - f0).abs())
        .fold(0.0, f64::max);
    let x_spread = simplex[1..]
        .iter()
        .flat_map(|(x, _)| x.iter().zip(x0.iter()).map(|(a, b)| (a - b).abs()))
        .fold(0.0, f64::max);
    // The best vertex is finite here, so any infinite vertex keeps f_spread infinite
    f_spread <= options.f_tolerance && x_spread <= options.x_tolerance
}

fn finish<const D: usize>(
    simplex: Vec<([f64; D], f64)>,
    iterations: usize,
    evaluations: usize,
    termination: Termination,
) -> SimplexResult<D> {
    let (x, value) = simplex[0];
    SimplexResult {
        x,
        value,
        iterations,
        evaluations,
        termination,
    }
}

/// Record of one optimizer start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartRecord {
    /// Random start point.
    pub start: Hyperparameters,
    /// Final simplex vertex.
    pub end: Hyperparameters,
    /// Objective at `end`.
    pub value: f64,
    /// Lowest objective over this and all earlier starts.
    pub best_so_far: f64,
    /// Simplex iterations.
    pub iterations: usize,
    /// Objective evaluations.
    pub evaluations: usize,
    /// Stopping reason.
    pub termination: Termination,
}

/// Outcome of the multi-start search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationOutcome {
    /// Best hyperparameters across all starts.
    pub best: Hyperparameters,
    /// Objective at `best`.
    pub value: f64,
    /// One record per start, seeded start first.
    pub starts: Vec<StartRecord>,
    /// Whether the wall-clock budget cut the search short.
    pub budget_exhausted: bool,
}

/// Multi-start hyperparameter optimizer.
#[derive(Debug, Clone, PartialEq)]
pub struct HyperparameterOptimizer {
    /// Random restarts after the first start.
    pub restarts: usize,
    /// Simplex stopping rules.
    pub simplex: SimplexOptions,
    /// Optional wall-clock budget for the whole search.
    pub max_duration: Option<Duration>,
}

impl Default for HyperparameterOptimizer {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl HyperparameterOptimizer {
    /// Build from the crate configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            restarts: config.restarts,
            simplex: SimplexOptions {
                max_iterations: config.max_iterations,
                max_evaluations: config.max_evaluations,
                f_tolerance: config.f_tolerance,
                x_tolerance: config.x_tolerance,
            },
            max_duration: config.max_duration_ms.map(Duration::from_millis),
        }
    }

    /// Draw a random start point.
    pub fn random_start<R: Rng + ?Sized>(rng: &mut R) -> Hyperparameters {
        let z_sigma: f64 = StandardNormal.sample(rng);
        let z_gamma: f64 = StandardNormal.sample(rng);
        let u: f64 = rng.random();
        Hyperparameters::new(z_sigma * z_sigma, z_gamma * z_gamma, -PI * u)
    }

    /// Run `1 + restarts` random starts and keep the lowest objective.
    ///
    /// # Errors
    ///
    /// `NoFeasibleFit` when every start ends at `+∞`.
    pub fn optimize<R: Rng + ?Sized>(
        &self,
        objective: &MarginalLikelihood<'_>,
        rng: &mut R,
    ) -> InferenceResult<OptimizationOutcome> {
        let mut starts = Vec::with_capacity(self.restarts + 1);
        for _ in 0..=self.restarts {
            starts.push(Self::random_start(rng));
        }
        self.optimize_from(objective, &starts)
    }

    /// Run the simplex search from each given start and keep the best.
    ///
    /// # Errors
    ///
    /// `NoFeasibleFit` when every start ends at `+∞` (or `starts` is empty).
    /// The first start always runs; the time budget only skips restarts.
    pub fn optimize_from(
        &self,
        objective: &MarginalLikelihood<'_>,
        starts: &[Hyperparameters],
    ) -> InferenceResult<OptimizationOutcome> {
        let deadline = self.max_duration.map(|d| Instant::now() + d);
        let mut records: Vec<StartRecord> = Vec::with_capacity(starts.len());
        let mut best: Option<(Hyperparameters, f64)> = None;
        let mut budget_exhausted = false;

        for (index, &start) in starts.iter().enumerate() {
            if index > 0 && deadline.is_some_and(|d| Instant::now() >= d) {
                warn!(
                    completed = index,
                    requested = starts.len(),
                    "time budget exhausted before all optimizer starts ran"
                );
                budget_exhausted = true;
                break;
            }

            let run = nelder_mead(
                |p: &[f64; 3]| objective.evaluate_vector(p),
                start.to_array(),
                &self.simplex,
                deadline,
            );
            let end = Hyperparameters::from_array(run.x).canonical();
            budget_exhausted |= run.termination == Termination::TimeBudget;

            let improved = match best {
                None => true,
                Some((_, best_value)) => run.value < best_value,
            };
            if improved {
                best = Some((end, run.value));
            }
            let best_so_far = best.map_or(f64::INFINITY, |(_, v)| v);

            debug!(
                start = index,
                ?start,
                ?end,
                value = run.value,
                iterations = run.iterations,
                evaluations = run.evaluations,
                termination = ?run.termination,
                "optimizer start finished"
            );

            records.push(StartRecord {
                start,
                end,
                value: run.value,
                best_so_far,
                iterations: run.iterations,
                evaluations: run.evaluations,
                termination: run.termination,
            });
        }

        match best {
            Some((hyper, value)) if value.is_finite() => {
                info!(
                    sigma = hyper.sigma,
                    gamma = hyper.gamma,
                    phi = hyper.phi,
                    value,
                    starts = records.len(),
                    "accepted optimum"
                );
                Ok(OptimizationOutcome {
                    best: hyper,
                    value,
                    starts: records,
                    budget_exhausted,
                })
            }
            _ => {
                warn!(starts = records.len(), "no feasible optimum found");
                Err(InferenceError::NoFeasibleFit {
                    restarts: records.len(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    use crate::model::{oscillator_generator, StateTransition, WindowContext};
    use crate::types::Vector;

    fn window(n: usize) -> (WindowContext, Vector) {
        let h = 0.25;
        let st = StateTransition::assemble(&oscillator_generator(115.0), h, n).unwrap();
        let tt = (0..n).map(|i| i as f64 * h).collect();
        let ctx = WindowContext::new(st, 0.96, tt, h, Vector::zeros(5), 2, 3.0, 2.0).unwrap();
        let (_, cc) = ctx.design(-1.0).unwrap();
        let truth = Vector::from_vec(vec![0.5, -0.2, 1.0, 0.3, -0.4]);
        // Deterministic pseudo-noise so the optimum sits at a finite γ
        let noise = Vector::from_fn(n, |i, _| 0.01 * ((i * 7919) % 13) as f64 - 0.06);
        let y = cc * truth + noise;
        (ctx, y)
    }

    fn quick_optimizer(restarts: usize) -> HyperparameterOptimizer {
        HyperparameterOptimizer {
            restarts,
            simplex: SimplexOptions {
                max_iterations: 150,
                max_evaluations: 300,
                ..SimplexOptions::default()
            },
            max_duration: None,
        }
    }

    fn rosenbrock(p: &[f64; 2]) -> f64 {
        (1.0 - p[0]).powi(2) + 100.0 * (p[1] - p[0] * p[0]).powi(2)
    }

    #[test]
    fn test_nelder_mead_rosenbrock() {
        let options = SimplexOptions {
            max_iterations: 5_000,
            max_evaluations: 10_000,
            f_tolerance: 1e-12,
            x_tolerance: 1e-10,
        };
        let res = nelder_mead(rosenbrock, [-1.2, 1.0], &options, None);
        assert_eq!(res.termination, Termination::Converged);
        assert!((res.x[0] - 1.0).abs() < 1e-4, "x = {:?}", res.x);
        assert!((res.x[1] - 1.0).abs() < 1e-4, "x = {:?}", res.x);
    }

    #[test]
    fn test_nelder_mead_respects_wall() {
        // Minimum of the unconstrained quadratic lies outside x <= 0
        let f = |p: &[f64; 1]| {
            if p[0] > 0.0 {
                f64::INFINITY
            } else {
                (p[0] - 1.0).powi(2)
            }
        };
        let res = nelder_mead(f, [-2.0], &SimplexOptions::default(), None);
        assert!(res.x[0] <= 0.0);
        assert!(res.value.is_finite());
    }

    #[test]
    fn test_nelder_mead_iteration_limit() {
        let options = SimplexOptions {
            max_iterations: 3,
            ..SimplexOptions::default()
        };
        let res = nelder_mead(rosenbrock, [-1.2, 1.0], &options, None);
        assert_eq!(res.termination, Termination::MaxIterations);
        assert_eq!(res.iterations, 3);
    }

    #[test]
    fn test_nelder_mead_all_infeasible() {
        let res = nelder_mead(|_: &[f64; 3]| f64::INFINITY, [1.0, 1.0, -1.0], &SimplexOptions::default(), None);
        assert_eq!(res.termination, Termination::Infeasible);
        assert_eq!(res.evaluations, 4);
    }

    #[test]
    fn test_random_start_domain() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        for _ in 0..200 {
            let h = HyperparameterOptimizer::random_start(&mut rng);
            assert!(h.sigma >= 0.0);
            assert!(h.gamma >= 0.0);
            assert!(h.phase_is_feasible());
        }
    }

    #[test]
    fn test_random_start_reproducible() {
        let mut a = Xoshiro256PlusPlus::seed_from_u64(7);
        let mut b = Xoshiro256PlusPlus::seed_from_u64(7);
        for _ in 0..5 {
            assert_eq!(
                HyperparameterOptimizer::random_start(&mut a),
                HyperparameterOptimizer::random_start(&mut b)
            );
        }
    }

    #[test]
    fn test_infeasible_starts_give_no_feasible_fit() {
        let (ctx, y) = window(30);
        let objective = MarginalLikelihood::new(&ctx, &y).unwrap();
        let starts = [
            Hyperparameters::new(1.0, 0.1, 1.0),
            Hyperparameters::new(1.0, 0.1, 2.0),
        ];
        let res = quick_optimizer(1).optimize_from(&objective, &starts);
        assert!(matches!(res, Err(InferenceError::NoFeasibleFit { restarts: 2 })));
    }

    #[test]
    fn test_expired_budget_still_runs_first_start() {
        let (ctx, y) = window(30);
        let objective = MarginalLikelihood::new(&ctx, &y).unwrap();
        let optimizer = HyperparameterOptimizer {
            max_duration: Some(Duration::from_nanos(1)),
            ..quick_optimizer(2)
        };
        let starts = [Hyperparameters::new(1.0, 0.1, -1.0); 3];
        let outcome = optimizer.optimize_from(&objective, &starts).unwrap();

        assert!(outcome.budget_exhausted);
        assert_eq!(outcome.starts.len(), 1);
        assert_eq!(outcome.starts[0].termination, Termination::TimeBudget);
        assert!(outcome.value.is_finite());
    }

    #[test]
    fn test_accepted_scales_are_non_negative() {
        let (ctx, y) = window(40);
        let objective = MarginalLikelihood::new(&ctx, &y).unwrap();
        for seed in 0..8 {
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
            let outcome = quick_optimizer(1).optimize(&objective, &mut rng).unwrap();
            assert!(outcome.best.sigma >= 0.0 && outcome.best.gamma >= 0.0, "{:?}", outcome.best);
            assert!(outcome
                .starts
                .iter()
                .all(|s| s.end.sigma >= 0.0 && s.end.gamma >= 0.0));
            let flipped = Hyperparameters::new(-outcome.best.sigma, -outcome.best.gamma, outcome.best.phi);
            assert_eq!(objective.evaluate(flipped), outcome.value);
        }
    }
}
