//! Linear-Gaussian state-space model of the driven cantilever.
//!
//! This module builds the quantities that map latent coefficients to
//! measured displacement:
//!
//! 1. **Basis** ([`basis`]): sinusoidal polynomial force regressors `B(φ)`
//! 2. **Transition** ([`transition`]): matrix-exponential propagators and the
//!    block-Toeplitz Green's function `AA`
//! 3. **Design** ([`design`]): observation design matrix `CC`
//! 4. **Window** ([`window`]): per-window context cached across optimizer trials

mod basis;
mod design;
mod transition;
mod window;

pub use basis::{force_basis, observed_rows};
pub use design::design_matrix;
pub use transition::{oscillator_generator, StateTransition};
pub use window::{MeasurementWindow, WindowContext, MIN_WINDOW_LEN};
