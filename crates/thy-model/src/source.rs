//! Parameter sources: properties files, YAML, JSON and the embedded
//! reference set.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::params::{Dials, Infusions, ParameterSet};

/// Identifier of the embedded reference parameter set.
pub const BUILTIN_ID: &str = "thyrosim";

const BUILTIN_PARAMS: &str = include_str!("../config/thyrosim.params");

/// A named, flat key → text mapping of model constants.
///
/// Values are kept as text until [`ParameterSource::parameter_set`] so that
/// a malformed entry is reported against its key.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterSource {
    id: String,
    entries: BTreeMap<String, String>,
}

impl ParameterSource {
    pub fn new(id: impl Into<String>, entries: BTreeMap<String, String>) -> Self {
        Self {
            id: id.into(),
            entries,
        }
    }

    /// The reference parameter set shipped with the crate.
    pub fn builtin() -> ConfigResult<Self> {
        Self::from_properties_str(BUILTIN_ID, BUILTIN_PARAMS)
    }

    /// Resolve a parameter-set identifier. `thyrosim` (any case) selects the
    /// embedded set; anything else is read from `<config_dir>/<id>.params`.
    pub fn resolve(id: &str, config_dir: Option<&Path>) -> ConfigResult<Self> {
        if id.eq_ignore_ascii_case(BUILTIN_ID) {
            return Self::builtin();
        }
        let dir = config_dir.ok_or_else(|| ConfigError::UnknownParameterSet { id: id.to_string() })?;
        let path = dir.join(format!("{id}.params"));
        if !path.is_file() {
            return Err(ConfigError::UnknownParameterSet { id: id.to_string() });
        }
        Self::from_path(&path)
    }

    /// Load a file, picking the format from its extension
    /// (`.yaml`/`.yml`, `.json`, anything else as properties).
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(BUILTIN_ID)
            .to_string();
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(id, &content),
            Some("json") => Self::from_json_str(id, &content),
            _ => Self::from_properties_str(id, &content),
        }
    }

    /// Parse `key = value` / `key: value` / `key value` lines. `#` and `!`
    /// start comment lines and a trailing backslash continues a value.
    pub fn from_properties_str(id: impl Into<String>, text: &str) -> ConfigResult<Self> {
        let id = id.into();
        let mut entries = BTreeMap::new();
        let mut pending = String::new();
        let mut pending_line = 0;

        for (n, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if pending.is_empty() {
                if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                    continue;
                }
                pending_line = n + 1;
            }
            if let Some(head) = line.strip_suffix('\\') {
                pending.push_str(head);
                continue;
            }
            pending.push_str(line);

            let (key, value) = split_property(&pending).ok_or_else(|| ConfigError::Syntax {
                source_id: id.clone(),
                line: pending_line,
                text: pending.clone(),
            })?;
            entries.insert(key.to_string(), value.to_string());
            pending.clear();
        }

        if !pending.is_empty() {
            return Err(ConfigError::Syntax {
                source_id: id,
                line: pending_line,
                text: pending,
            });
        }
        Ok(Self { id, entries })
    }

    /// Parse a YAML mapping whose values are numbers or numeric strings.
    pub fn from_yaml_str(id: impl Into<String>, text: &str) -> ConfigResult<Self> {
        let raw: BTreeMap<String, serde_yaml::Value> = serde_yaml::from_str(text)?;
        let mut entries = BTreeMap::new();
        for (key, value) in raw {
            let text = match value {
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::String(s) => s,
                other => {
                    return Err(ConfigError::Malformed {
                        key,
                        value: format!("{other:?}"),
                    });
                }
            };
            entries.insert(key, text);
        }
        Ok(Self::new(id, entries))
    }

    /// Parse a JSON object whose values are numbers or numeric strings.
    pub fn from_json_str(id: impl Into<String>, text: &str) -> ConfigResult<Self> {
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(text)?;
        let mut entries = BTreeMap::new();
        for (key, value) in raw {
            let text = match value {
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::String(s) => s,
                other => {
                    return Err(ConfigError::Malformed {
                        key,
                        value: other.to_string(),
                    });
                }
            };
            entries.insert(key, text);
        }
        Ok(Self::new(id, entries))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Override (or add) one entry.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Build the immutable parameter set for one run.
    pub fn parameter_set(&self, dials: Dials, infusions: Infusions) -> ConfigResult<ParameterSet> {
        let params = ParameterSet::build(dials, infusions, &self.entries)?;
        tracing::debug!(source = %self.id, ?dials, "built parameter set");
        Ok(params)
    }
}

fn split_property(line: &str) -> Option<(&str, &str)> {
    let split_at = line.find(|c: char| c == '=' || c == ':' || c.is_whitespace())?;
    let key = line[..split_at].trim();
    let mut rest = line[split_at..].trim_start();
    if let Some(stripped) = rest.strip_prefix('=').or_else(|| rest.strip_prefix(':')) {
        rest = stripped.trim_start();
    }
    if key.is_empty() {
        return None;
    }
    Some((key, rest.trim_end()))
}
