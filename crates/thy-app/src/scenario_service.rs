//! Scenario loading, saving, validation, and introspection.

use std::path::Path;

use thy_core::ModelVariant;
use thy_scenario::{PRESET_NAMES, Scenario};

use crate::error::{AppError, AppResult};

/// Summary of a scenario for listing.
#[derive(Debug, Clone)]
pub struct ScenarioSummary {
    pub name: String,
    pub description: Option<String>,
    pub variant: ModelVariant,
    pub hours: i64,
    pub input_count: usize,
}

impl From<&Scenario> for ScenarioSummary {
    fn from(s: &Scenario) -> Self {
        Self {
            name: s.name.clone(),
            description: s.description.clone(),
            variant: s.variant,
            hours: s.duration_hours(),
            input_count: s.inputs.len(),
        }
    }
}

/// Load a scenario file (YAML, or JSON by extension), migrated and validated.
pub fn load_scenario(path: &Path) -> AppResult<Scenario> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::ScenarioFileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let scenario = if is_json {
        thy_scenario::from_json_str(&content)?
    } else {
        thy_scenario::from_yaml_str(&content)?
    };
    Ok(scenario)
}

/// Save a scenario as YAML.
pub fn save_scenario(path: &Path, scenario: &Scenario) -> AppResult<()> {
    validate_scenario(scenario)?;
    let content = serde_yaml::to_string(scenario)
        .map_err(|e| AppError::Scenario(format!("Failed to serialize scenario: {}", e)))?;

    std::fs::write(path, content).map_err(|e| AppError::ScenarioFileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

pub fn validate_scenario(scenario: &Scenario) -> AppResult<()> {
    thy_scenario::validate_scenario(scenario)?;
    Ok(())
}

pub fn load_preset(name: &str) -> AppResult<Scenario> {
    Ok(thy_scenario::load_preset(name)?)
}

/// Summaries of every built-in preset.
pub fn list_presets() -> Vec<ScenarioSummary> {
    PRESET_NAMES
        .iter()
        .filter_map(|name| thy_scenario::preset(name))
        .map(|s| ScenarioSummary::from(&s))
        .collect()
}
