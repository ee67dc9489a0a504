//! Configuration for force-curve inference.

/// Configuration options for `BayesianInference`.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Random restarts after the seeded first start (default: 10).
    pub restarts: usize,

    /// Seed of the start-point generator (default: 1).
    ///
    /// In batch runs each pixel mixes its index into this seed.
    pub seed: u64,

    /// Simplex iteration limit per start (default: 600).
    pub max_iterations: usize,

    /// Objective evaluation limit per start (default: 600).
    pub max_evaluations: usize,

    /// Tolerance on the spread of simplex objective values (default: 1e-8).
    pub f_tolerance: f64,

    /// Tolerance on the spread of simplex vertices (default: 1e-8).
    pub x_tolerance: f64,

    /// Optional guardrail for the whole optimizer search in milliseconds.
    pub max_duration_ms: Option<u64>,

    /// Prior standard deviation of the initial position and velocity
    /// (default: 3.0).
    pub prior_ic_sigma: f64,

    /// Offset into the raw force record where the measured force segment
    /// starts (default: 1000).
    pub force_offset: usize,

    /// Scale from record units to window units (default: 1e9, m → nm).
    pub unit_scale: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            restarts: 10,
            seed: 1,
            max_iterations: 600,
            max_evaluations: 600,
            f_tolerance: 1e-8,
            x_tolerance: 1e-8,
            max_duration_ms: None,
            prior_ic_sigma: 3.0,
            force_offset: 1000,
            unit_scale: 1e9,
        }
    }
}
