//! Error types for the thy-app service layer.

use std::path::PathBuf;

/// Application error type that wraps errors from the backend crates and
/// gives frontends a single error interface.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Scenario error: {0}")]
    Scenario(String),

    #[error("Failed to read scenario file: {path}")]
    ScenarioFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write scenario file: {path}")]
    ScenarioFileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Scenario validation failed: {0}")]
    Validation(String),

    #[error("Unknown preset: {0}")]
    PresetNotFound(String),

    #[error("Parameter configuration error: {0}")]
    Config(String),

    #[error("Runtime compilation failed: {0}")]
    Compile(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for thy-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<thy_scenario::ScenarioError> for AppError {
    fn from(err: thy_scenario::ScenarioError) -> Self {
        match err {
            thy_scenario::ScenarioError::Validation(e) => AppError::Validation(e.to_string()),
            thy_scenario::ScenarioError::UnknownPreset { name } => AppError::PresetNotFound(name),
            other => AppError::Scenario(other.to_string()),
        }
    }
}

impl From<thy_scenario::ValidationError> for AppError {
    fn from(err: thy_scenario::ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<thy_model::ConfigError> for AppError {
    fn from(err: thy_model::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<thy_sim::SimError> for AppError {
    fn from(err: thy_sim::SimError) -> Self {
        match err {
            thy_sim::SimError::Config(e) => AppError::Config(e.to_string()),
            e if e.is_invalid_input() => AppError::InvalidInput(e.to_string()),
            e => AppError::Simulation(e.to_string()),
        }
    }
}
