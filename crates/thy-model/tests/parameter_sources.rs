//! Integration tests: resolving parameter sets from disk.

use std::fs;
use std::path::PathBuf;

use thy_model::{ConfigError, Dials, Infusions, PARAMETER_KEYS, ParameterSource};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("thy_model_{name}_{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn builtin_as_properties() -> String {
    let source = ParameterSource::builtin().unwrap();
    source
        .entries()
        .iter()
        .map(|(k, v)| format!("{k}={v}\n"))
        .collect()
}

#[test]
fn named_set_is_loaded_from_config_dir() {
    let dir = scratch_dir("named");
    let text = builtin_as_properties().replace("p30=1166", "p30=900");
    fs::write(dir.join("hypo.params"), text).unwrap();

    let source = ParameterSource::resolve("hypo", Some(&dir)).unwrap();
    assert_eq!(source.id(), "hypo");
    let params = source
        .parameter_set(Dials::default(), Infusions::default())
        .unwrap();
    assert_eq!(params.tsh().b_zero, 900.0);
}

#[test]
fn unknown_set_in_config_dir() {
    let dir = scratch_dir("unknown");
    let err = ParameterSource::resolve("nope", Some(&dir)).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownParameterSet { .. }));
}

#[test]
fn yaml_file_matches_builtin() {
    let dir = scratch_dir("yaml");
    let builtin = ParameterSource::builtin().unwrap();
    let yaml: String = builtin
        .entries()
        .iter()
        .map(|(k, v)| format!("{k}: {v}\n"))
        .collect();
    let path = dir.join("reference.yaml");
    fs::write(&path, yaml).unwrap();

    let loaded = ParameterSource::from_path(&path).unwrap();
    let a = loaded
        .parameter_set(Dials::default(), Infusions::default())
        .unwrap();
    let b = builtin
        .parameter_set(Dials::default(), Infusions::default())
        .unwrap();
    for key in PARAMETER_KEYS {
        assert_eq!(a.value(key), b.value(key), "{key}");
    }
}

#[test]
fn unreadable_file_is_a_config_error() {
    let err = ParameterSource::from_path(&scratch_dir("missing").join("absent.params")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn reference_dials_scale_oral_excretion() {
    let params = ParameterSource::builtin()
        .unwrap()
        .parameter_set(Dials::new(1.0, 0.88, 1.0, 0.88), Infusions::default())
        .unwrap();
    assert!((params.value("p44").unwrap() - 0.12 * 0.88).abs() < 1e-15);
    assert!((params.value("p46").unwrap() - 0.12 * 0.88).abs() < 1e-15);
}
