//! Time-varying discrete LQR gain for magnetorquer attitude control.
//!
//! Every control cycle the measured magnetic field defines a new input
//! matrix, the discrete algebraic Riccati equation is re-solved through a
//! Newton square-root iteration on a Hamiltonian-derived matrix, and the
//! resulting gain maps the attitude deviation to a dipole command.

use nalgebra::SMatrix;
use thiserror::Error;

pub mod config;
pub mod controller;
pub mod gain;
pub mod hardware;
pub mod input_matrix;
pub mod linalg;
pub mod newton;
pub mod riccati;
pub mod state_space;

pub use config::{ConfigErrors, ControllerConfig};
pub use controller::{Controller, ControllerState, FaultResponse};
pub use hardware::{AttitudeSensors, MagneticTorquers};

/// Hamiltonian-sized workspace matrix.
pub type Matrix12 = SMatrix<f64, 12, 12>;

#[derive(Debug, Error)]
pub enum LqrErrors {
    #[error("ConfigErrors: {0}")]
    Configuration(#[from] ConfigErrors),
    #[error("{matrix} is singular to working precision (pivot ratio {pivot_ratio:e})")]
    SingularMatrix {
        matrix: &'static str,
        pivot_ratio: f64,
    },
    #[error("newton iteration did not converge in {iterations} iterations (residual {residual:e})")]
    Convergence { iterations: usize, residual: f64 },
    #[error("magnetic field norm {norm:e} T does not define an input matrix")]
    DegenerateInput { norm: f64 },
}

impl LqrErrors {
    /// What the driver should actuate after this error, or `None` when it is
    /// not a per-cycle failure.
    pub fn response(&self) -> Option<FaultResponse> {
        match self {
            LqrErrors::Configuration(_) => None,
            LqrErrors::SingularMatrix { .. } => Some(FaultResponse::Idle),
            LqrErrors::Convergence { .. } => Some(FaultResponse::RetainGain),
            LqrErrors::DegenerateInput { .. } => Some(FaultResponse::HoldCommand),
        }
    }
}
