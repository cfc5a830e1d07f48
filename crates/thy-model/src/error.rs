//! Error types for parameter loading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading a parameter source or building a
/// [`ParameterSet`](crate::ParameterSet).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing parameter: {key}")]
    MissingKey { key: String },

    #[error("Malformed parameter: {key} = {value:?}")]
    Malformed { key: String, value: String },

    #[error("Invalid {what}: {value} ({reason})")]
    InvalidValue {
        what: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("Malformed line {line} in {source_id}: {text}")]
    Syntax {
        source_id: String,
        line: usize,
        text: String,
    },

    #[error("Unknown parameter set: {id}")]
    UnknownParameterSet { id: String },

    #[error("Failed to read parameter file: {path}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
