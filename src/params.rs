//! Physical parameter set of a Kelvin-probe acquisition.
//!
//! Parameters are addressed by dotted keys (`"CL.f0"`, `"Bayes.Npoly"`, ...)
//! so configurations written for the acquisition software can be loaded
//! as-is. The set is read-only for the duration of an inference run.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{InferenceError, InferenceResult};

macro_rules! physical_params {
    ($( $(#[$doc:meta])* $field:ident = $key:literal => $default:expr; )+) => {
        /// Physical constants of the cantilever, tip, acquisition and prior.
        ///
        /// Field names are snake_case in Rust and serialize under their
        /// dotted keys.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct PhysicalParams {
            $(
                $(#[$doc])*
                #[serde(rename = $key)]
                pub $field: f64,
            )+
        }

        impl Default for PhysicalParams {
            fn default() -> Self {
                Self { $( $field: $default, )+ }
            }
        }

        impl PhysicalParams {
            /// All dotted keys, in table order.
            pub const KEYS: &'static [&'static str] = &[$( $key, )+];

            /// Look up a parameter by dotted key.
            pub fn get(&self, key: &str) -> Option<f64> {
                match key {
                    $( $key => Some(self.$field), )+
                    _ => None,
                }
            }

            /// Overwrite a parameter by dotted key.
            pub fn set(&mut self, key: &str, value: f64) -> InferenceResult<()> {
                match key {
                    $( $key => { self.$field = value; Ok(()) } )+
                    _ => Err(InferenceError::UnknownParameter(key.to_string())),
                }
            }
        }
    };
}

physical_params! {
    /// Detection system noise amplitude spectral density (m/√Hz).
    detection_noise_density = "SYS.dzds" => 81e-15;
    /// Detection system sensitivity (m/V).
    invols = "SYS.INVOLS" => 52.5e-9;
    /// Cantilever resonance frequency (Hz).
    resonance_hz = "CL.f0" => 58e3;
    /// Cantilever quality factor.
    quality_factor = "CL.Q" => 115.0;
    /// Cantilever stiffness (N/m).
    stiffness = "CL.k" => 2.8;
    /// Zero-peak amplitude (m).
    amplitude = "CL.A" => 1.0;
    /// Cantilever temperature (K).
    temperature = "CL.T" => 273.15 + 23.8;
    /// Second eigenmode resonance frequency (Hz).
    resonance2_hz = "CL.f1" => 350e3;
    /// Second eigenmode quality factor.
    quality_factor2 = "CL.Q1" => 350.0;
    /// Second eigenmode amplitude (m).
    amplitude2 = "CL.A1" => 0.0;
    /// Probe cone angle (rad).
    tip_cone_angle = "Tip.c_angle" => 32.0 * PI / 180.0;
    /// Probe apex radius (m).
    tip_radius = "TS.Rtip" => 20e-9;
    /// Distance from tip apex to cantilever (m).
    tip_height = "TS.Rheight" => 22e-6;
    /// Permittivity.
    permittivity = "TS.eps_z" => 8.85e-12;
    /// Tip-sample coefficient alpha (Hz/m).
    ts_alpha = "TS.alpha" => -12.3e9;
    /// Tip-sample coefficient beta (Hz/m).
    ts_beta = "TS.beta" => 12.3e9;
    /// Acquisition time per record (s).
    t_max = "Sim.Tmax" => 4.096e-3 * 2.0;
    /// Sampling rate (Hz).
    io_rate = "Sim.IOrate" => 4e6;
    /// AC drive frequency (Hz).
    drive_hz = "Sim.Vfreq" => 56e3;
    /// AC drive amplitude.
    drive_amplitude = "Sim.VAmp" => 3.0;
    /// Contact potential difference (V).
    v_cpd = "Sim.VCPD" => -1.0;
    /// DC bias (V).
    v_dc = "Sim.VDC" => 0.0;
    /// Drive phase shift used for the voltage abscissa (rad).
    phase_shift = "Sim.Phasshift" => 0.2;
    /// Noise amplitude.
    noise_amplitude = "Sim.NAmp" => 1e-6;
    /// Configured signal-to-noise ratio, reported with every fit.
    snr = "Sim.snr" => 12.0;
    /// Reduction factor from record length to window length.
    reduction_factor = "Bayes.fac" => 128.0;
    /// Polynomial order of the force basis.
    poly_order = "Bayes.Npoly" => 2.0;
    /// Power-law exponent of the prior precision over basis coefficients.
    prior_decay = "Bayes.aa" => 2.0;
}

impl PhysicalParams {
    /// Start from the defaults and overlay the given dotted-key map.
    pub fn from_map(map: &BTreeMap<String, f64>) -> InferenceResult<Self> {
        let mut params = Self::default();
        for (key, &value) in map {
            params.set(key, value)?;
        }
        Ok(params)
    }

    /// Export every parameter under its dotted key.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        Self::KEYS
            .iter()
            .filter_map(|&k| self.get(k).map(|v| (k.to_string(), v)))
            .collect()
    }

    /// Check the parameters the inference core depends on.
    pub fn validate(&self) -> InferenceResult<()> {
        positive("CL.f0", self.resonance_hz)?;
        positive("CL.Q", self.quality_factor)?;
        positive("Sim.Tmax", self.t_max)?;
        integral("Bayes.fac", self.reduction_factor)?;
        if self.reduction_factor < 1.0 {
            return Err(invalid("Bayes.fac", "must be at least 1"));
        }
        integral("Bayes.Npoly", self.poly_order)?;
        if self.poly_order < 0.0 {
            return Err(invalid("Bayes.Npoly", "must be non-negative"));
        }
        if !self.prior_decay.is_finite() {
            return Err(invalid("Bayes.aa", "must be finite"));
        }
        Ok(())
    }

    /// Polynomial order `n` of the force basis.
    pub fn polynomial_order(&self) -> usize {
        self.poly_order as usize
    }

    /// Record-to-window reduction factor.
    pub fn reduction(&self) -> usize {
        self.reduction_factor as usize
    }
}

fn invalid(key: &str, reason: &str) -> InferenceError {
    InferenceError::InvalidParameter {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn positive(key: &str, value: f64) -> InferenceResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(key, &format!("must be positive and finite, got {value}")))
    }
}

fn integral(key: &str, value: f64) -> InferenceResult<()> {
    if value.is_finite() && value.fract() == 0.0 {
        Ok(())
    } else {
        Err(invalid(key, &format!("must be an integer, got {value}")))
    }
}
