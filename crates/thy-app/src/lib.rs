//! Shared application service layer for thyrosim.
//!
//! Frontends go through this crate to load scenarios, compile them into a
//! rate model and dosing protocol, run them, and query the results.

pub mod error;
pub mod progress;
pub mod query;
pub mod run_service;
pub mod runtime_compile;
pub mod scenario_service;

// Re-export key types for convenience
pub use error::{AppError, AppResult};
pub use progress::{RunProgressEvent, RunStage, SimulationProgress};
pub use query::{
    Extrema, RunSummary, clinical_readout, clinical_series, extract_series, field_extrema,
    get_run_summary,
};
pub use run_service::{
    BatchItem, RunMode, RunOptions, RunOutput, RunRequest, RunResponse, RunTimingSummary,
    ScenarioSource, execute_batch, execute_run, execute_run_with_progress, resolve_initial_state,
};
pub use runtime_compile::{ScenarioRuntime, build_protocol, build_sim_options, compile_scenario};
pub use scenario_service::{
    ScenarioSummary, list_presets, load_preset, load_scenario, save_scenario, validate_scenario,
};
