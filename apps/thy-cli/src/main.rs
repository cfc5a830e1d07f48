use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thy_app::{
    AppError, AppResult, RunMode, RunOptions, RunOutput, RunProgressEvent, RunRequest,
    RunResponse, RunStage, ScenarioSource, query, run_service, scenario_service,
};
use thy_core::ModelVariant;
use thy_model::{Dials, Infusions, ParameterSource};
use thy_scenario::Scenario;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "thy-cli")]
#[command(about = "Thyrosim CLI - HPT axis hormone kinetics simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a scenario file
    Validate {
        /// Path to the scenario YAML/JSON file
        scenario_path: PathBuf,
    },
    /// List built-in experiment presets
    Presets,
    /// Write a preset as a scenario YAML file
    Preset {
        /// Preset name (see `presets`)
        name: String,
        /// Output file (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the effective constants of a parameter set
    Params {
        /// Parameter set id
        #[arg(long, default_value = thy_model::BUILTIN_ID)]
        parameter_set: String,
        /// Directory holding `<id>.params` files
        #[arg(long)]
        config_dir: Option<PathBuf>,
        /// Dials d1,d2,d3,d4
        #[arg(long, value_delimiter = ',')]
        dials: Option<Vec<f64>>,
    },
    /// Run a simulation
    #[command(subcommand)]
    Run(RunCommands),
    /// Run several scenarios in parallel as hourly series
    Batch {
        /// Scenario files
        #[arg(required = true)]
        scenarios: Vec<PathBuf>,
        /// Directory for one CSV per scenario
        #[arg(short, long)]
        output_dir: PathBuf,
        /// Directory holding `<id>.params` files
        #[arg(long)]
        config_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum RunCommands {
    /// Hourly samples over the scenario horizon
    Series {
        #[command(flatten)]
        scenario: ScenarioArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Terminal state only
    Point {
        #[command(flatten)]
        scenario: ScenarioArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Circadian-neutral steady state for the scenario's dials
    Equilibrium {
        #[command(flatten)]
        scenario: ScenarioArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args)]
struct ScenarioArgs {
    /// Path to the scenario YAML/JSON file
    #[arg(required_unless_present = "preset", conflicts_with = "preset")]
    scenario_path: Option<PathBuf>,
    /// Use a built-in preset instead of a file
    #[arg(long)]
    preset: Option<String>,
    /// Directory holding `<id>.params` files
    #[arg(long)]
    config_dir: Option<PathBuf>,
    /// Override the parameter set id
    #[arg(long)]
    parameter_set: Option<String>,
    /// Override the model variant (baseline or extended)
    #[arg(long, value_parser = parse_variant)]
    variant: Option<ModelVariant>,
    /// Override the start hour
    #[arg(long, allow_hyphen_values = true)]
    start: Option<i64>,
    /// Override the end hour
    #[arg(long, allow_hyphen_values = true)]
    end: Option<i64>,
    /// Override dials d1,d2,d3,d4
    #[arg(long, value_delimiter = ',')]
    dials: Option<Vec<f64>>,
    /// Override constant infusions u1,u4 (µmol/h)
    #[arg(long, value_delimiter = ',')]
    infusions: Option<Vec<f64>>,
    /// Hide the progress line
    #[arg(long)]
    quiet: bool,
}

#[derive(Args)]
struct OutputArgs {
    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,
    /// Output file (optional, defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Fields shown by the table format
    #[arg(long, value_delimiter = ',', default_value = "t,t4_plasma,t3_plasma,tsh_plasma,ft4,ft3")]
    fields: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Json,
    Csv,
}

fn parse_variant(s: &str) -> Result<ModelVariant, String> {
    match s.to_ascii_lowercase().as_str() {
        "baseline" => Ok(ModelVariant::Baseline),
        "extended" => Ok(ModelVariant::Extended),
        other => Err(format!("unknown variant '{}' (baseline, extended)", other)),
    }
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { scenario_path } => cmd_validate(&scenario_path),
        Commands::Presets => cmd_presets(),
        Commands::Preset { name, output } => cmd_preset(&name, output.as_deref()),
        Commands::Params {
            parameter_set,
            config_dir,
            dials,
        } => cmd_params(&parameter_set, config_dir.as_deref(), dials.as_deref()),
        Commands::Run(run_cmd) => match run_cmd {
            RunCommands::Series { scenario, output } => cmd_run(RunMode::Series, &scenario, &output),
            RunCommands::Point { scenario, output } => cmd_run(RunMode::Point, &scenario, &output),
            RunCommands::Equilibrium { scenario, output } => {
                cmd_run(RunMode::Equilibrium, &scenario, &output)
            }
        },
        Commands::Batch {
            scenarios,
            output_dir,
            config_dir,
        } => cmd_batch(&scenarios, &output_dir, config_dir),
    }
}

fn cmd_validate(scenario_path: &Path) -> AppResult<()> {
    println!("Validating scenario: {}", scenario_path.display());
    let scenario = scenario_service::load_scenario(scenario_path)?;
    scenario_service::validate_scenario(&scenario)?;
    println!("✓ Scenario '{}' is valid", scenario.name);
    Ok(())
}

fn cmd_presets() -> AppResult<()> {
    println!("Presets:");
    for preset in scenario_service::list_presets() {
        println!(
            "  {} - {} ({} h, {} inputs)",
            preset.name,
            preset.description.as_deref().unwrap_or(""),
            preset.hours,
            preset.input_count
        );
    }
    Ok(())
}

fn cmd_preset(name: &str, output: Option<&Path>) -> AppResult<()> {
    let scenario = scenario_service::load_preset(name)?;
    match output {
        Some(path) => {
            scenario_service::save_scenario(path, &scenario)?;
            println!("✓ Wrote preset '{}' to {}", scenario.name, path.display());
        }
        None => {
            let yaml = serde_yaml::to_string(&scenario)
                .map_err(|e| AppError::Scenario(format!("Failed to serialize scenario: {}", e)))?;
            print!("{}", yaml);
        }
    }
    Ok(())
}

fn cmd_params(parameter_set: &str, config_dir: Option<&Path>, dials: Option<&[f64]>) -> AppResult<()> {
    let dials = match dials {
        Some(&[d1, d2, d3, d4]) => Dials::new(d1, d2, d3, d4),
        Some(_) => return Err(AppError::InvalidInput("--dials takes four values".to_string())),
        None => Dials::default(),
    };
    let source = ParameterSource::resolve(parameter_set, config_dir)?;
    let params = source.parameter_set(dials, Infusions::default())?;

    println!("Parameter set: {}", source.id());
    for (key, value) in params.effective_constants() {
        println!("  {:<8} {:>14.6e}", key, value);
    }
    Ok(())
}

fn build_source(args: &ScenarioArgs) -> AppResult<ScenarioSource> {
    let base = match (&args.scenario_path, &args.preset) {
        (Some(path), _) => ScenarioSource::File(path.clone()),
        (None, Some(name)) => ScenarioSource::Preset(name.clone()),
        (None, None) => {
            return Err(AppError::InvalidInput(
                "give a scenario file or --preset".to_string(),
            ));
        }
    };
    let has_overrides = args.parameter_set.is_some()
        || args.variant.is_some()
        || args.start.is_some()
        || args.end.is_some()
        || args.dials.is_some()
        || args.infusions.is_some();
    if !has_overrides {
        return Ok(base);
    }

    let mut scenario = base.load()?;
    apply_overrides(&mut scenario, args)?;
    tracing::debug!(scenario = %scenario.name, "applied command-line overrides");
    Ok(ScenarioSource::Inline(Box::new(scenario)))
}

fn apply_overrides(scenario: &mut Scenario, args: &ScenarioArgs) -> AppResult<()> {
    if let Some(id) = &args.parameter_set {
        scenario.parameter_set = id.clone();
    }
    if let Some(variant) = args.variant {
        scenario.variant = variant;
    }
    if let Some(start) = args.start {
        scenario.start_hour = start;
    }
    if let Some(end) = args.end {
        scenario.end_hour = end;
    }
    match args.dials.as_deref() {
        Some(&[d1, d2, d3, d4]) => scenario.dials = Dials::new(d1, d2, d3, d4),
        Some(_) => return Err(AppError::InvalidInput("--dials takes four values".to_string())),
        None => {}
    }
    match args.infusions.as_deref() {
        Some(&[u1, u4]) => scenario.infusions = Infusions::new(u1, u4),
        Some(_) => {
            return Err(AppError::InvalidInput(
                "--infusions takes two values".to_string(),
            ));
        }
        None => {}
    }
    Ok(())
}

fn cmd_run(mode: RunMode, args: &ScenarioArgs, output: &OutputArgs) -> AppResult<()> {
    let request = RunRequest {
        source: build_source(args)?,
        mode,
        options: RunOptions {
            config_dir: args.config_dir.clone(),
            cancel: None,
        },
    };

    let mut last_emit = Instant::now();
    let mut last_fraction = -1.0f64;
    let mut last_stage: Option<RunStage> = None;
    let response = if args.quiet {
        run_service::execute_run(&request)?
    } else {
        let response = run_service::execute_run_with_progress(
            &request,
            Some(&mut |event| {
                let fraction = event
                    .simulation
                    .as_ref()
                    .map(|s| s.fraction_complete)
                    .unwrap_or(-1.0);
                let emit_now = last_stage != Some(event.stage)
                    || (fraction >= 0.0 && (fraction - last_fraction).abs() >= 0.005)
                    || last_emit.elapsed().as_millis() >= 100;
                if emit_now {
                    render_cli_progress(&event);
                    if fraction >= 0.0 {
                        last_fraction = fraction;
                    }
                    last_stage = Some(event.stage);
                    last_emit = Instant::now();
                }
            }),
        )?;
        clear_progress_line();
        response
    };

    eprintln!("✓ Run completed: {}", response.scenario.name);
    if !args.quiet {
        print_timing_summary(mode, &response.timing);
    }

    write_output(&response, output)
}

fn write_output(response: &RunResponse, output: &OutputArgs) -> AppResult<()> {
    let mut text = Vec::new();
    match (&response.output, output.format) {
        (RunOutput::Series(series), Format::Json) => write_json(&mut text, series)?,
        (RunOutput::Series(series), Format::Csv) => series.write_csv(&mut text)?,
        (RunOutput::Series(series), Format::Table) => {
            let columns = output
                .fields
                .iter()
                .map(|f| query::extract_series(series, f).map(|s| (f.as_str(), s)))
                .collect::<AppResult<Vec<_>>>()?;
            write_series_table(&mut text, &columns)?;
        }
        (RunOutput::Point(point), Format::Json) => write_json(&mut text, point)?,
        (RunOutput::Point(point), _) => {
            write_state(&mut text, output.format, point.t, point.variant, &point.state)?
        }
        (RunOutput::Equilibrium(eq), _) => {
            write_state(&mut text, output.format, eq.t, response.model.variant(), &eq.state)?;
            if output.format == Format::Table {
                writeln!(text, "  residual    {:.3e}", eq.residual)?;
                writeln!(text, "  iterations  {}", eq.iterations)?;
            }
        }
    }

    if output.format == Format::Table {
        if let Some(state) = response.output.final_state() {
            let readout = query::clinical_readout(response.model.params(), &state)?;
            writeln!(text, "\nClinical readout at end:")?;
            writeln!(text, "  T4   {:>8.2} µg/L", readout.t4_ug_per_l)?;
            writeln!(text, "  T3   {:>8.3} µg/L", readout.t3_ug_per_l)?;
            writeln!(text, "  TSH  {:>8.3} mU/L", readout.tsh_mu_per_l)?;
            writeln!(text, "  FT4  {:>8.3} ng/L", readout.ft4_ng_per_l)?;
            writeln!(text, "  FT3  {:>8.3} ng/L", readout.ft3_ng_per_l)?;
            writeln!(
                text,
                "  {}",
                if readout.is_euthyroid() {
                    "euthyroid"
                } else {
                    "outside reference ranges"
                }
            )?;
        }
    }

    match &output.output {
        Some(path) => {
            std::fs::write(path, &text)?;
            eprintln!("✓ Wrote {}", path.display());
        }
        None => io::stdout().write_all(&text)?,
    }
    Ok(())
}

fn write_json<T: serde::Serialize>(out: &mut Vec<u8>, value: &T) -> AppResult<()> {
    serde_json::to_writer_pretty(&mut *out, value)
        .map_err(|e| AppError::InvalidInput(format!("Failed to serialize output: {}", e)))?;
    writeln!(out)?;
    Ok(())
}

fn write_series_table(out: &mut Vec<u8>, columns: &[(&str, Vec<(f64, f64)>)]) -> io::Result<()> {
    let header: Vec<String> = columns.iter().map(|(name, _)| format!("{:>14}", name)).collect();
    writeln!(out, "{}", header.join(""))?;
    let rows = columns.first().map_or(0, |(_, s)| s.len());
    for i in 0..rows {
        let row: Vec<String> = columns
            .iter()
            .map(|(name, s)| {
                if *name == thy_sim::TIME_FIELD {
                    format!("{:>14}", s[i].1)
                } else {
                    format!("{:>14.6e}", s[i].1)
                }
            })
            .collect();
        writeln!(out, "{}", row.join(""))?;
    }
    Ok(())
}

fn write_state(
    out: &mut Vec<u8>,
    format: Format,
    t: f64,
    variant: ModelVariant,
    state: &[f64],
) -> AppResult<()> {
    let names = variant.compartments().iter().map(|c| c.name());
    match format {
        Format::Csv => {
            writeln!(out, "field,value")?;
            writeln!(out, "{},{:e}", thy_sim::TIME_FIELD, t)?;
            for (name, v) in names.zip(state) {
                writeln!(out, "{},{:e}", name, v)?;
            }
        }
        Format::Json => {
            let mut map = serde_json::Map::new();
            map.insert(thy_sim::TIME_FIELD.to_string(), serde_json::json!(t));
            for (name, v) in names.zip(state) {
                map.insert(name.to_string(), serde_json::json!(v));
            }
            write_json(out, &map)?;
        }
        Format::Table => {
            writeln!(out, "State at t = {} h:", t)?;
            for (name, v) in names.zip(state) {
                writeln!(out, "  {:<14} {:>14.6e}", name, v)?;
            }
        }
    }
    Ok(())
}

fn cmd_batch(scenarios: &[PathBuf], output_dir: &Path, config_dir: Option<PathBuf>) -> AppResult<()> {
    println!("Running {} scenarios", scenarios.len());
    let started = Instant::now();
    let sources: Vec<ScenarioSource> = scenarios
        .iter()
        .map(|p| ScenarioSource::File(p.clone()))
        .collect();
    let options = RunOptions {
        config_dir,
        cancel: None,
    };
    let items = run_service::execute_batch(&sources, &options)?;

    std::fs::create_dir_all(output_dir)?;
    let mut failures = 0usize;
    for item in items {
        match item.result {
            Ok(series) => {
                let path = output_dir.join(format!("{}.csv", item.name));
                let mut file = std::fs::File::create(&path)?;
                series.write_csv(&mut file)?;
                println!("✓ {} ({} samples) -> {}", item.name, series.len(), path.display());
            }
            Err(e) => {
                failures += 1;
                println!("✗ {}: {}", item.name, e);
            }
        }
    }
    println!("\nBatch finished in {:.3}s", started.elapsed().as_secs_f64());

    if failures > 0 {
        return Err(AppError::Simulation(format!(
            "{} of {} scenarios failed",
            failures,
            scenarios.len()
        )));
    }
    Ok(())
}

fn clear_progress_line() {
    eprint!("\r{}\r", " ".repeat(120));
    let _ = io::stderr().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    match (&event.stage, &event.simulation) {
        (RunStage::Simulating, Some(s)) => {
            let width = 28usize;
            let filled = ((s.fraction_complete * width as f64).round() as usize).min(width);
            let bar = format!(
                "{}{}",
                "#".repeat(filled),
                "-".repeat(width.saturating_sub(filled))
            );
            eprint!(
                "\r[{}] {:>6.2}%  t={:.0}/{:.0} h  evals={}  elapsed={:.1}s",
                bar,
                s.fraction_complete * 100.0,
                s.sim_time_h,
                s.t_end_h,
                s.evaluations,
                event.elapsed_wall_s
            );
        }
        _ => {
            let spinner = ['|', '/', '-', '\\'];
            let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
            let mut line = format!(
                "\r{} {}  elapsed={:.2}s",
                spinner[spin_idx],
                event.stage.label(),
                event.elapsed_wall_s
            );
            if let Some(msg) = &event.message {
                line.push_str(&format!("  {}", msg));
            }
            eprint!("{}", line);
        }
    }
    let _ = io::stderr().flush();
}

fn print_timing_summary(mode: RunMode, timing: &thy_app::RunTimingSummary) {
    let total = timing.total_time_s.max(1.0e-12);
    let pct = |t: f64| 100.0 * t / total;

    eprintln!("\nTiming summary:");
    eprintln!("  Load:     {:.3}s ({:.1}%)", timing.load_time_s, pct(timing.load_time_s));
    eprintln!(
        "  Compile:  {:.3}s ({:.1}%)",
        timing.compile_time_s,
        pct(timing.compile_time_s)
    );
    eprintln!(
        "  Initial:  {:.3}s ({:.1}%)",
        timing.initial_state_time_s,
        pct(timing.initial_state_time_s)
    );
    eprintln!(
        "  Simulate: {:.3}s ({:.1}%)",
        timing.simulate_time_s,
        pct(timing.simulate_time_s)
    );
    eprintln!("  Total:    {:.3}s", timing.total_time_s);

    match mode {
        RunMode::Series | RunMode::Point => {
            eprintln!("  Samples:     {}", timing.samples);
            eprintln!("  Evaluations: {}", timing.evaluations);
            eprintln!(
                "  Steps:       {} accepted, {} rejected",
                timing.accepted_steps, timing.rejected_steps
            );
        }
        RunMode::Equilibrium => {
            if let Some(iterations) = timing.equilibrium_iterations {
                eprintln!("  Newton iterations: {}", iterations);
            }
        }
    }
}
