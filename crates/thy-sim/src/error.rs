//! Error types for simulation operations.

use thiserror::Error;

/// Errors encountered while driving a simulation.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("State length mismatch: expected {expected}, got {actual}")]
    StateLength { expected: usize, actual: usize },

    #[error("Invalid horizon: t_end ({t_end}) < t_start ({t_start})")]
    InvalidHorizon { t_start: i64, t_end: i64 },

    /// Integrator failure, including a non-finite state after a step.
    #[error("Integration failed on [{t0}, {t1}]: {message}")]
    Integration { t0: f64, t1: f64, message: String },

    #[error("Simulation cancelled at t = {t}")]
    Cancelled { t: f64 },

    #[error("Equilibrium search failed: {message}")]
    Equilibrium { message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] thy_model::ConfigError),
}

impl SimError {
    /// True for the caller-input class of errors (bad state length,
    /// horizon or options) as opposed to numerical failures.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            SimError::InvalidArg { .. } | SimError::StateLength { .. } | SimError::InvalidHorizon { .. }
        )
    }
}

pub type SimResult<T> = Result<T, SimError>;

impl From<thy_solver::SolverError> for SimError {
    fn from(e: thy_solver::SolverError) -> Self {
        SimError::Equilibrium {
            message: e.to_string(),
        }
    }
}

impl From<thy_core::ThyError> for SimError {
    fn from(e: thy_core::ThyError) -> Self {
        match e {
            thy_core::ThyError::StateLength { expected, actual } => {
                SimError::StateLength { expected, actual }
            }
            other => SimError::Integration {
                t0: f64::NAN,
                t1: f64::NAN,
                message: other.to_string(),
            },
        }
    }
}
