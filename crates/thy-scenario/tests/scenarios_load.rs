//! Integration tests: the scenario files shipped under `scenarios/`.

use std::path::PathBuf;

use thy_core::ModelVariant;
use thy_scenario::{IntegratorDef, InputDef, load, preset};

fn scenarios_dir() -> PathBuf {
    let crate_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    crate_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .join("scenarios")
}

#[test]
fn shipped_scenarios_validate() {
    let files = [
        "default.yaml",
        "dijo19-1.yaml",
        "iv_pulse_extended.yaml",
        "t3_infusion.json",
    ];
    for rel in files {
        let path = scenarios_dir().join(rel);
        let result = load(&path);
        assert!(
            result.is_ok(),
            "scenario failed validation: {} => {:?}",
            path.display(),
            result.err()
        );
    }
}

#[test]
fn preset_files_match_builtin_presets() {
    for name in thy_scenario::PRESET_NAMES {
        let loaded = load(&scenarios_dir().join(format!("{name}.yaml"))).unwrap();
        assert_eq!(loaded, preset(name).unwrap(), "{name}");
    }
}

#[test]
fn defaults_fill_omitted_fields() {
    let s = load(&scenarios_dir().join("iv_pulse_extended.yaml")).unwrap();
    assert_eq!(s.parameter_set, "thyrosim");
    assert_eq!(s.variant, ModelVariant::Extended);
    assert_eq!(s.dials, thy_model::Dials::default());
    assert!(matches!(s.inputs[0], InputDef::IvPulse { start_day, .. } if start_day == 2.0));

    let s = load(&scenarios_dir().join("t3_infusion.json")).unwrap();
    assert_eq!(s.solver.method, IntegratorDef::Rk4 { step_h: 0.02 });
    assert_eq!(s.solver.abs_tol, None);
}
