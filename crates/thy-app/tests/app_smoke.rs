//! Smoke test for the thy-app scenario service.

use std::path::PathBuf;

use thy_app::{AppError, list_presets, load_scenario, save_scenario, validate_scenario};

fn scenarios_dir() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.pop(); // go to crates
    path.pop(); // go to repo root
    path.push("scenarios");
    path
}

#[test]
fn load_every_bundled_scenario() {
    let mut count = 0;
    for entry in std::fs::read_dir(scenarios_dir()).expect("scenarios directory") {
        let path = entry.unwrap().path();
        let scenario = load_scenario(&path).unwrap_or_else(|e| panic!("{}: {e}", path.display()));
        validate_scenario(&scenario).expect("bundled scenario should validate");
        println!("Scenario: {} ({} h)", scenario.name, scenario.duration_hours());
        count += 1;
    }
    assert!(count >= 4);
}

#[test]
fn presets_are_listed() {
    let presets = list_presets();
    let names: Vec<&str> = presets.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["default", "dijo19-1"]);
    assert_eq!(presets[0].hours, 120);
    assert_eq!(presets[1].hours, 720);
    assert_eq!(presets[1].input_count, 2);
}

#[test]
fn save_and_reload() {
    let scenario = load_scenario(&scenarios_dir().join("t3_infusion.json")).unwrap();
    let path = std::env::temp_dir().join(format!("thy-app-smoke-{}.yaml", std::process::id()));
    save_scenario(&path, &scenario).unwrap();
    let reloaded = load_scenario(&path).unwrap();
    let _ = std::fs::remove_file(&path);
    assert_eq!(reloaded, scenario);
}

#[test]
fn missing_file_reports_path() {
    let path = scenarios_dir().join("does-not-exist.yaml");
    match load_scenario(&path) {
        Err(AppError::ScenarioFileRead { path: p, .. }) => assert_eq!(p, path),
        other => panic!("unexpected result: {other:?}"),
    }
}
