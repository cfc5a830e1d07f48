//! Run execution service.

use std::path::PathBuf;
use std::time::Instant;

use thy_model::{RateModel, reference_initial_state};
use thy_scenario::{InitialDef, Scenario};
use thy_sim::{
    CancelToken, Equilibrium, EquilibriumOptions, OutputSeries, PointResult, RunHooks, SeriesJob,
    SimOptions, SimProgress, StepStats, find_equilibrium, run_batch, run_series_with,
    run_to_point_with,
};

use crate::error::{AppError, AppResult};
use crate::progress::{RunProgressEvent, RunStage, SimulationProgress};
use crate::runtime_compile::{self, ScenarioRuntime};
use crate::scenario_service;

/// What a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Hourly samples over the scenario horizon.
    Series,
    /// Terminal state only.
    Point,
    /// Circadian-neutral steady state for the scenario's dials.
    Equilibrium,
}

/// Options for running simulations.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Directory searched for `<id>.params` parameter sets.
    pub config_dir: Option<PathBuf>,
    pub cancel: Option<CancelToken>,
}

/// Where the scenario of a run comes from.
#[derive(Debug, Clone)]
pub enum ScenarioSource {
    File(PathBuf),
    Preset(String),
    Inline(Box<Scenario>),
}

impl ScenarioSource {
    pub fn load(&self) -> AppResult<Scenario> {
        match self {
            ScenarioSource::File(path) => scenario_service::load_scenario(path),
            ScenarioSource::Preset(name) => scenario_service::load_preset(name),
            ScenarioSource::Inline(scenario) => {
                scenario_service::validate_scenario(scenario)?;
                Ok((**scenario).clone())
            }
        }
    }
}

/// Request to execute a run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub source: ScenarioSource,
    pub mode: RunMode,
    pub options: RunOptions,
}

#[derive(Debug, Clone)]
pub enum RunOutput {
    Series(OutputSeries),
    Point(PointResult),
    Equilibrium(Equilibrium),
}

impl RunOutput {
    /// State at the end of the run (the solved state for equilibrium runs).
    pub fn final_state(&self) -> Option<Vec<f64>> {
        match self {
            RunOutput::Series(series) => series.final_state(),
            RunOutput::Point(point) => Some(point.state.clone()),
            RunOutput::Equilibrium(eq) => Some(eq.state.clone()),
        }
    }
}

/// Concise timing and execution summary for a run.
#[derive(Debug, Clone, Default)]
pub struct RunTimingSummary {
    pub load_time_s: f64,
    pub compile_time_s: f64,
    pub initial_state_time_s: f64,
    pub simulate_time_s: f64,
    pub total_time_s: f64,
    pub evaluations: usize,
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub samples: usize,
    pub equilibrium_iterations: Option<usize>,
}

impl RunTimingSummary {
    fn record_stats(&mut self, stats: StepStats) {
        self.evaluations += stats.evaluations;
        self.accepted_steps += stats.accepted;
        self.rejected_steps += stats.rejected;
    }
}

/// Response from a run execution.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub scenario: Scenario,
    pub model: RateModel,
    pub initial_state: Vec<f64>,
    pub output: RunOutput,
    pub timing: RunTimingSummary,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    mode: RunMode,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent::stage(
            mode,
            stage,
            started.elapsed().as_secs_f64(),
            message,
        ));
    }
}

/// Execute a run.
pub fn execute_run(request: &RunRequest) -> AppResult<RunResponse> {
    execute_run_with_progress(request, None)
}

/// Execute a run and stream progress events.
pub fn execute_run_with_progress(
    request: &RunRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    let mode = request.mode;
    let mut timing = RunTimingSummary::default();

    emit_progress(
        &mut progress_cb,
        mode,
        RunStage::LoadingScenario,
        started,
        Some("Loading scenario".to_string()),
    );
    let load_start = Instant::now();
    let scenario = request.source.load()?;
    timing.load_time_s = load_start.elapsed().as_secs_f64();

    emit_progress(
        &mut progress_cb,
        mode,
        RunStage::CompilingRuntime,
        started,
        Some(format!("Compiling scenario '{}'", scenario.name)),
    );
    let compile_start = Instant::now();
    let runtime = runtime_compile::compile_scenario(&scenario, request.options.config_dir.as_deref())?;
    timing.compile_time_s = compile_start.elapsed().as_secs_f64();

    tracing::info!(
        scenario = %scenario.name,
        mode = ?mode,
        start_hour = runtime.start_hour,
        end_hour = runtime.end_hour,
        "run started"
    );

    emit_progress(
        &mut progress_cb,
        mode,
        RunStage::ResolvingInitialState,
        started,
        Some("Resolving initial state".to_string()),
    );
    let initial_start = Instant::now();
    let (initial_state, solved) = match mode {
        // The equilibrium itself is the output; solve it once.
        RunMode::Equilibrium => {
            let guess = initial_guess(&runtime)?;
            let eq = find_equilibrium(&runtime.model, &guess, &equilibrium_options(&runtime))?;
            (guess, Some(eq))
        }
        _ => (resolve_initial_state(&runtime)?, None),
    };
    timing.initial_state_time_s = initial_start.elapsed().as_secs_f64();

    let sim_start = Instant::now();
    let output = match solved {
        Some(eq) => {
            timing.equilibrium_iterations = Some(eq.iterations);
            RunOutput::Equilibrium(eq)
        }
        None => {
            emit_progress(
                &mut progress_cb,
                mode,
                RunStage::Simulating,
                started,
                Some(format!(
                    "Simulating {} h to {} h",
                    runtime.start_hour, runtime.end_hour
                )),
            );
            let mut forward = |p: SimProgress| {
                if let Some(cb) = progress_cb.as_deref_mut() {
                    cb(RunProgressEvent {
                        mode,
                        stage: RunStage::Simulating,
                        elapsed_wall_s: started.elapsed().as_secs_f64(),
                        message: None,
                        simulation: Some(SimulationProgress {
                            sim_time_h: p.t,
                            t_end_h: p.t_end,
                            fraction_complete: p.fraction_complete(),
                            evaluations: p.stats.evaluations,
                        }),
                    });
                }
            };
            let hooks = RunHooks {
                protocol: Some(&runtime.protocol),
                cancel: request.options.cancel.as_ref(),
                progress: Some(&mut forward),
            };
            if mode == RunMode::Point {
                let point = run_to_point_with(
                    &runtime.model,
                    &initial_state,
                    runtime.start_hour as f64,
                    runtime.end_hour as f64,
                    &runtime.options,
                    hooks,
                )?;
                timing.record_stats(point.stats);
                timing.samples = 1;
                RunOutput::Point(point)
            } else {
                let series = run_series_with(
                    &runtime.model,
                    &initial_state,
                    runtime.start_hour,
                    runtime.end_hour,
                    &runtime.options,
                    hooks,
                )?;
                timing.record_stats(series.stats());
                timing.samples = series.len();
                RunOutput::Series(series)
            }
        }
    };
    timing.simulate_time_s = sim_start.elapsed().as_secs_f64();
    timing.total_time_s = started.elapsed().as_secs_f64();

    emit_progress(
        &mut progress_cb,
        mode,
        RunStage::Completed,
        started,
        Some("Run complete".to_string()),
    );
    tracing::info!(
        scenario = %scenario.name,
        total_s = timing.total_time_s,
        evaluations = timing.evaluations,
        "run finished"
    );

    Ok(RunResponse {
        scenario,
        model: runtime.model,
        initial_state,
        output,
        timing,
    })
}

/// Starting point before any equilibrium search: the explicit values or
/// the reference state, sized for the model variant.
fn initial_guess(runtime: &ScenarioRuntime) -> AppResult<Vec<f64>> {
    let variant = runtime.model.variant();
    match &runtime.initial {
        InitialDef::Explicit { values } => Ok(variant.widen_initial(values)),
        InitialDef::Reference | InitialDef::Equilibrium { .. } => {
            Ok(reference_initial_state(variant))
        }
    }
}

fn equilibrium_options(runtime: &ScenarioRuntime) -> EquilibriumOptions {
    let settle_hours = match runtime.initial {
        InitialDef::Equilibrium { settle_hours } => settle_hours,
        _ => 0.0,
    };
    EquilibriumOptions {
        settle_hours,
        sim: runtime.options.clone(),
        ..EquilibriumOptions::default()
    }
}

/// Initial state the scenario asks for.
pub fn resolve_initial_state(runtime: &ScenarioRuntime) -> AppResult<Vec<f64>> {
    let guess = initial_guess(runtime)?;
    match runtime.initial {
        InitialDef::Equilibrium { .. } => {
            let eq = find_equilibrium(&runtime.model, &guess, &equilibrium_options(runtime))?;
            Ok(eq.state)
        }
        _ => Ok(guess),
    }
}

/// Outcome of one scenario of a batch.
#[derive(Debug)]
pub struct BatchItem {
    pub name: String,
    pub result: AppResult<OutputSeries>,
}

/// Run several scenarios as hourly series in parallel.
///
/// Scenarios are loaded and their initial states resolved up front; any
/// failure there aborts the batch. Simulation failures are reported per
/// scenario. All scenarios must share the same solver settings.
pub fn execute_batch(sources: &[ScenarioSource], options: &RunOptions) -> AppResult<Vec<BatchItem>> {
    let mut jobs = Vec::with_capacity(sources.len());
    let mut shared: Option<SimOptions> = None;

    for source in sources {
        let scenario = source.load()?;
        let runtime = runtime_compile::compile_scenario(&scenario, options.config_dir.as_deref())?;
        match &shared {
            Some(opts) if *opts != runtime.options => {
                return Err(AppError::InvalidInput(format!(
                    "scenario '{}' uses different solver settings from the rest of the batch",
                    scenario.name
                )));
            }
            Some(_) => {}
            None => shared = Some(runtime.options.clone()),
        }
        let initial = resolve_initial_state(&runtime)?;
        jobs.push(SeriesJob {
            label: scenario.name,
            model: runtime.model,
            initial,
            t_start: runtime.start_hour,
            t_end: runtime.end_hour,
            protocol: (!runtime.protocol.is_empty()).then_some(runtime.protocol),
        });
    }

    let opts = shared.unwrap_or_default();
    let results = run_batch(&jobs, &opts, options.cancel.as_ref());
    Ok(jobs
        .into_iter()
        .zip(results)
        .map(|(job, result)| BatchItem {
            name: job.label,
            result: result.map_err(AppError::from),
        })
        .collect())
}
