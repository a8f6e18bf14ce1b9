//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "01-bootstrap"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Trace generator for scripted bus transfer runs."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use protlab_calc::TransferOutcome;
use protlab_common::version::VersionInfo;
use protlab_common::{init_tracing, LabConfig};
use protlab_sim::{
    BreakerStatus, BusTransferOptions, BusTransferSimulator, BusTransferSnapshot, EventLogEntry,
    OperationalPhase, PresetCatalog,
};
use serde::Serialize;
use tracing::info;

const DEFAULT_CONFIG_CANDIDATES: [&str; 2] = ["config/protlab.toml", "protlab.toml"];

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    about = "Record a scripted fast bus transfer as a CSV or JSON trace",
    long_about = None
)]
struct Cli {
    /// Configuration file (defaults to config/protlab.toml or protlab.toml when present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Additional preset catalog (YAML or JSON)
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Scenario preset; defaults to simulation.default_preset from the config
    #[arg(long)]
    preset: Option<String>,

    /// List available presets and exit
    #[arg(long, action = ArgAction::SetTrue)]
    list_presets: bool,

    /// Standby breaker closing time in milliseconds
    #[arg(long)]
    breaker_delay_ms: Option<u64>,

    /// Seconds into the run at which the main breaker trips
    #[arg(long, default_value_t = 0.1)]
    trip_at: f64,

    /// Seconds into the run at which the operator initiates the transfer
    #[arg(long, conflicts_with = "auto")]
    transfer_at: Option<f64>,

    /// Let the controller initiate on the first safe prediction
    #[arg(long, action = ArgAction::SetTrue)]
    auto: bool,

    /// Length of the recorded run in seconds
    #[arg(long, default_value_t = 2.0)]
    duration_secs: f64,

    /// Frames per second of simulated time
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Output file path. Use '-' for stdout.
    #[arg(long, default_value = "transfer.csv")]
    output: PathBuf,

    /// Explicit output format when extension is ambiguous
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Print extended version information and exit
    #[arg(short = 'V', long = "version", action = ArgAction::SetTrue)]
    version: bool,
}

/// How the transfer command is issued during a scripted run.
#[derive(Debug, Clone, Copy, PartialEq)]
enum TransferMode {
    Manual(f64),
    Auto,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ScenarioPlan {
    dt: f64,
    frames: u64,
    trip_at: f64,
    transfer: TransferMode,
}

/// One frame of a trace, flattened for CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
struct TraceRow {
    tick: u64,
    time_secs: f64,
    phase: OperationalPhase,
    clock_secs: f64,
    voltage_pu: f64,
    frequency_hz: f64,
    phase_angle_deg: f64,
    slip_hz: f64,
    delta_v_pu: f64,
    live_outcome: TransferOutcome,
    predicted_angle_deg: f64,
    predicted_outcome: TransferOutcome,
    sync_ready: bool,
    source1: BreakerStatus,
    source2: BreakerStatus,
}

impl From<&BusTransferSnapshot> for TraceRow {
    fn from(snapshot: &BusTransferSnapshot) -> Self {
        Self {
            tick: snapshot.tick,
            time_secs: snapshot.sim_time_secs,
            phase: snapshot.phase,
            clock_secs: snapshot.clock_secs,
            voltage_pu: snapshot.state.voltage_pu,
            frequency_hz: snapshot.state.frequency_hz,
            phase_angle_deg: snapshot.state.phase_angle_deg,
            slip_hz: snapshot.slip_hz,
            delta_v_pu: snapshot.live.delta_v_pu,
            live_outcome: snapshot.live.outcome,
            predicted_angle_deg: snapshot.prediction.state.phase_angle_deg,
            predicted_outcome: snapshot.prediction.verdict.outcome,
            sync_ready: snapshot.sync_ready,
            source1: snapshot.source1,
            source2: snapshot.source2,
        }
    }
}

#[derive(Debug, Serialize)]
struct TraceDocument {
    preset: String,
    frames: Vec<TraceRow>,
    events: Vec<EventLogEntry>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("{}", VersionInfo::current().extended());
        return Ok(());
    }

    let config = load_config(&cli)?;
    init_tracing("protlab-simgen", &config.logging)?;
    let catalog = build_catalog(&cli, &config)?;

    if cli.list_presets {
        for preset in catalog.iter() {
            println!("{:<16} {}", preset.name, preset.description);
        }
        return Ok(());
    }

    let plan = build_plan(&cli)?;
    let mut simulator = build_simulator(&cli, &config, &catalog)?;
    let format = determine_format(&cli.output, cli.format)?;
    let frames = run_plan(&plan, &mut simulator);

    match format {
        OutputFormat::Csv => write_csv(&cli.output, &frames)?,
        OutputFormat::Json => {
            let document = TraceDocument {
                preset: simulator.preset().name.clone(),
                frames,
                events: simulator.events().to_vec(),
            };
            write_json(&cli.output, &document)?;
        }
    }

    if let Some(verdict) = simulator.last_outcome() {
        info!(outcome = %verdict.outcome, "{}", verdict.detail());
    }
    if cli.output.as_os_str() != "-" {
        eprintln!(
            "recorded {} frames of '{}' -> {}",
            plan.frames,
            simulator.preset().name,
            cli.output.display()
        );
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<LabConfig> {
    let loaded = match &cli.config {
        Some(path) => LabConfig::load_with_source(&[path])?,
        None => LabConfig::load_or_default(&DEFAULT_CONFIG_CANDIDATES)?,
    };
    Ok(loaded.config)
}

fn build_catalog(cli: &Cli, config: &LabConfig) -> Result<PresetCatalog> {
    let mut catalog = PresetCatalog::from_config(&config.presets)
        .context("failed to build preset catalog")?;
    if let Some(path) = &cli.catalog {
        let extra = PresetCatalog::from_path(path)
            .with_context(|| format!("failed to load preset catalog {}", path.display()))?;
        catalog.extend(extra);
    }
    Ok(catalog)
}

fn build_plan(cli: &Cli) -> Result<ScenarioPlan> {
    if cli.fps == 0 {
        return Err(anyhow!("fps must be greater than zero"));
    }
    if !(cli.duration_secs.is_finite() && cli.duration_secs > 0.0) {
        return Err(anyhow!("duration-secs must be a positive number of seconds"));
    }
    if !(cli.trip_at.is_finite() && cli.trip_at >= 0.0) {
        return Err(anyhow!("trip-at must not be negative"));
    }
    let transfer = match (cli.transfer_at, cli.auto) {
        (Some(at), _) if !(at.is_finite() && at >= 0.0) => {
            return Err(anyhow!("transfer-at must not be negative"))
        }
        (Some(at), _) => TransferMode::Manual(at),
        (None, true) => TransferMode::Auto,
        (None, false) => TransferMode::Never,
    };
    let frames = (cli.duration_secs * f64::from(cli.fps)).round().max(1.0) as u64;
    Ok(ScenarioPlan {
        dt: 1.0 / f64::from(cli.fps),
        frames,
        trip_at: cli.trip_at,
        transfer,
    })
}

fn build_simulator(
    cli: &Cli,
    config: &LabConfig,
    catalog: &PresetCatalog,
) -> Result<BusTransferSimulator> {
    let mut options = BusTransferOptions::from_config(config, catalog)?;
    if let Some(name) = &cli.preset {
        options.preset = catalog.get(name)?.clone();
    }
    if let Some(delay_ms) = cli.breaker_delay_ms {
        options.breaker_delay = Duration::from_millis(delay_ms);
    }
    Ok(BusTransferSimulator::new(options))
}

/// Step the simulator through `plan`, issuing the scripted commands at the
/// start of the frame in which they fall due. The plan's transfer mode
/// overrides `bus_transfer.auto_transfer` from the config.
fn run_plan(plan: &ScenarioPlan, simulator: &mut BusTransferSimulator) -> Vec<TraceRow> {
    simulator.arm_auto_transfer(plan.transfer == TransferMode::Auto);
    let mut tripped = false;
    let mut initiated = false;
    let mut rows = Vec::with_capacity(plan.frames as usize);
    for frame in 0..plan.frames {
        let now = frame as f64 * plan.dt;
        if !tripped && now + 1e-9 >= plan.trip_at {
            tripped = simulator.trip_main();
        }
        if let TransferMode::Manual(at) = plan.transfer {
            if !initiated && now + 1e-9 >= at {
                initiated = simulator.initiate_transfer();
            }
        }
        simulator.tick(plan.dt);
        rows.push(TraceRow::from(&simulator.snapshot()));
    }
    rows
}

fn determine_format(path: &Path, override_format: Option<OutputFormat>) -> Result<OutputFormat> {
    if let Some(format) = override_format {
        return Ok(format);
    }
    if path.as_os_str() == "-" {
        return Ok(OutputFormat::Json);
    }
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(OutputFormat::Json),
        _ => Ok(OutputFormat::Csv),
    }
}

fn open_output(path: &Path) -> Result<Box<dyn Write>> {
    if path.as_os_str() == "-" {
        Ok(Box::new(io::stdout()))
    } else {
        Ok(Box::new(File::create(path).with_context(|| {
            format!("failed to create output file {}", path.display())
        })?))
    }
}

fn write_csv(path: &Path, rows: &[TraceRow]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(open_output(path)?);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_json(path: &Path, document: &TraceDocument) -> Result<()> {
    let mut writer = open_output(path)?;
    serde_json::to_writer_pretty(&mut writer, document)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
