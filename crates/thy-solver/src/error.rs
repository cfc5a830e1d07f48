//! Error types for solver operations.

use thiserror::Error;
use thy_core::error::ThyError;

/// Errors that can occur during a nonlinear solve.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Problem setup error: {what}")]
    ProblemSetup { what: String },

    #[error("Convergence failed: {what}")]
    ConvergenceFailed { what: String },

    #[error("Numeric error: {what}")]
    Numeric { what: String },

    #[error("Model error: {0}")]
    Model(#[from] ThyError),
}

pub type SolverResult<T> = Result<T, SolverError>;
