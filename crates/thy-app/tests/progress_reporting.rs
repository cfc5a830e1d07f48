//! Integration tests for shared run progress and timing reporting.

use thy_app::{
    RunMode, RunOptions, RunProgressEvent, RunRequest, RunResponse, RunStage, ScenarioSource,
    execute_run_with_progress,
};

fn collect_events(request: &RunRequest) -> (RunResponse, Vec<RunProgressEvent>) {
    let mut events = Vec::new();
    let response = execute_run_with_progress(request, Some(&mut |event| events.push(event)))
        .expect("run with progress should succeed");
    (response, events)
}

fn preset_request(mode: RunMode) -> RunRequest {
    RunRequest {
        source: ScenarioSource::Preset("default".to_string()),
        mode,
        options: RunOptions::default(),
    }
}

#[test]
fn series_progress_and_timing_are_reported() {
    let (response, events) = collect_events(&preset_request(RunMode::Series));

    let stages: Vec<RunStage> = events.iter().map(|e| e.stage).collect();
    assert_eq!(stages.first(), Some(&RunStage::LoadingScenario));
    assert_eq!(stages.last(), Some(&RunStage::Completed));
    assert!(stages.contains(&RunStage::CompilingRuntime));
    assert!(stages.contains(&RunStage::ResolvingInitialState));

    let sim: Vec<_> = events.iter().filter_map(|e| e.simulation.as_ref()).collect();
    // One event per simulated hour.
    assert_eq!(sim.len(), 120);
    assert!(sim.windows(2).all(|w| w[1].fraction_complete > w[0].fraction_complete));
    assert_eq!(sim.last().map(|s| s.fraction_complete), Some(1.0));
    assert_eq!(sim.last().map(|s| s.t_end_h), Some(120.0));

    assert!(events.iter().all(|e| e.mode == RunMode::Series));
    assert!(
        events
            .windows(2)
            .all(|w| w[1].elapsed_wall_s >= w[0].elapsed_wall_s)
    );

    assert!(response.timing.total_time_s > 0.0);
    assert!(response.timing.simulate_time_s > 0.0);
    assert!(response.timing.accepted_steps > 0);
    assert_eq!(response.timing.samples, 121);
}

#[test]
fn equilibrium_runs_skip_the_simulation_stage() {
    let (response, events) = collect_events(&preset_request(RunMode::Equilibrium));

    assert!(events.iter().all(|e| e.stage != RunStage::Simulating));
    assert!(events.iter().all(|e| e.simulation.is_none()));
    assert!(response.timing.equilibrium_iterations.is_some());
    assert!(RunStage::Completed.label().contains("done"));
}
