use thiserror::Error;

pub type ThyResult<T> = Result<T, ThyError>;

#[derive(Error, Debug)]
pub enum ThyError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("State length mismatch: expected {expected}, got {actual}")]
    StateLength { expected: usize, actual: usize },
}
