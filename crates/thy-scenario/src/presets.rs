//! Built-in experiments.

use thy_model::{BUILTIN_ID, Dials, Infusions};

use crate::migrate::LATEST_VERSION;
use crate::schema::{HormoneDef, InitialDef, InputDef, Scenario, SolverDef};

pub const PRESET_NAMES: [&str; 2] = ["default", "dijo19-1"];

fn days(n: i64) -> i64 {
    24 * n
}

/// Euthyroid subject for 5 days with nominal absorption.
fn default_experiment() -> Scenario {
    Scenario {
        version: LATEST_VERSION,
        name: "default".to_string(),
        description: Some("Euthyroid subject, no treatment".to_string()),
        parameter_set: BUILTIN_ID.to_string(),
        variant: Default::default(),
        initial: InitialDef::Reference,
        start_hour: 0,
        end_hour: days(5),
        dials: Dials::new(1.0, 0.88, 1.0, 0.88),
        infusions: Infusions::default(),
        inputs: Vec::new(),
        solver: SolverDef::default(),
    }
}

/// Hypothyroid subject (25% secretion) on daily oral T4 + T3 for 30 days.
fn dijo19_1() -> Scenario {
    let daily = |hormone, dose_ug| InputDef::Oral {
        hormone,
        dose_ug,
        start_day: 1.0,
        end_day: Some(30.0),
        interval_days: Some(1.0),
    };
    Scenario {
        version: LATEST_VERSION,
        name: "dijo19-1".to_string(),
        description: Some("Hypothyroid subject on combined T4/T3 replacement".to_string()),
        parameter_set: BUILTIN_ID.to_string(),
        variant: Default::default(),
        initial: InitialDef::Equilibrium {
            settle_hours: days(30) as f64,
        },
        start_hour: 0,
        end_hour: days(30),
        dials: Dials::new(0.25, 0.88, 0.25, 0.88),
        infusions: Infusions::default(),
        inputs: vec![daily(HormoneDef::T4, 123.0), daily(HormoneDef::T3, 6.5)],
        solver: SolverDef::default(),
    }
}

/// Look up a preset by name (case-insensitive).
pub fn preset(name: &str) -> Option<Scenario> {
    match name.to_ascii_lowercase().as_str() {
        "default" => Some(default_experiment()),
        "dijo19-1" => Some(dijo19_1()),
        _ => None,
    }
}
