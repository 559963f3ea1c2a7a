//! Parts Conference
//!
//! Run with: cargo run -p conference-session --bin conference
//!
//! Examples:
//!   conference run --seed 7 --ticks 1200 --record session.json
//!   conference replay session.json --bundle mismatch.json
//!   conference default-config > conference.toml

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use conference_core::events::TraceLog;
use conference_core::{
    demo_scenario, ConfigError, DualRng, RecorderError, Scenario, ScenarioError, Simulator,
};
use conference_session::{PlaybackController, PlaybackError, SessionConfig, SessionController};
use session_events::{RecordedSession, SessionFormatError};

/// Parts conference session engine
#[derive(Parser, Debug)]
#[command(name = "conference")]
#[command(about = "Headless parts-conference sessions with record and replay")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a scenario script through the input layer
    Run {
        /// Scenario file (.toml or .json); the built-in demo if omitted
        #[arg(long)]
        scenario: Option<PathBuf>,

        /// Random seed; drawn from entropy if omitted
        #[arg(long)]
        seed: Option<u64>,

        /// Number of ticks to run
        #[arg(long, default_value_t = 1200)]
        ticks: u64,

        /// Write the recorded session to this file
        #[arg(long)]
        record: Option<PathBuf>,

        /// Session settings (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write one JSON line per transaction to this file
        #[arg(long)]
        trace: Option<PathBuf>,
    },

    /// Replay a recorded session and verify it
    Replay {
        /// Recorded session (JSON)
        session: PathBuf,

        /// Override the settings stored in the recording
        #[arg(long)]
        config: Option<PathBuf>,

        /// Where to write the diagnostic bundle on mismatch
        #[arg(long, default_value = "replay-mismatch.json")]
        bundle: PathBuf,
    },

    /// Print the default settings as TOML
    DefaultConfig,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    #[error(transparent)]
    Recorder(#[from] RecorderError),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
    #[error(transparent)]
    Session(#[from] SessionFormatError),
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let outcome = match args.command {
        Command::Run {
            scenario,
            seed,
            ticks,
            record,
            config,
            trace,
        } => run(scenario, seed, ticks, record, config, trace),
        Command::Replay {
            session,
            config,
            bundle,
        } => replay(&session, config, &bundle),
        Command::DefaultConfig => default_config(),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<SessionConfig, ConfigError> {
    match path {
        Some(path) => SessionConfig::load(path),
        None => Ok(SessionConfig::default()),
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), CliError> {
    fs::write(path, content).map_err(|source| CliError::Write {
        path: path.display().to_string(),
        source,
    })
}

fn run(
    scenario: Option<PathBuf>,
    seed: Option<u64>,
    ticks: u64,
    record: Option<PathBuf>,
    config: Option<PathBuf>,
    trace: Option<PathBuf>,
) -> Result<ExitCode, CliError> {
    let config = load_config(config.as_deref())?;
    let scenario = match scenario {
        Some(path) => Scenario::load(path)?,
        None => demo_scenario(),
    };
    let model = scenario.build_model()?;
    let rng = seed.map_or_else(DualRng::unseeded, DualRng::seeded);

    let mut simulator = Simulator::with_rng(model, config.tuning.clone(), rng);
    if let Some(path) = &trace {
        let log = TraceLog::new(path).map_err(|source| CliError::Write {
            path: path.display().to_string(),
            source,
        })?;
        simulator = simulator.with_trace_log(log);
    }
    let mut session = SessionController::from_simulator(simulator, config);

    println!("Parts Conference");
    println!("================");
    println!("Scenario: {} ({} parts)", scenario.name, scenario.parts.len());
    println!("Ticks: {}", ticks);

    if record.is_some() {
        session.start_recording()?;
    }

    for _ in 0..ticks {
        let outcome = session.tick();
        if outcome.report.victory {
            println!("[tick {}] victory", outcome.report.tick);
        }
        let tick = session.model().tick();
        let due: Vec<_> = scenario.steps_at(tick).map(|s| s.request.clone()).collect();
        for request in due {
            let result = session.perform_via_input(&request);
            let status = if result.success { "ok" } else { "failed" };
            println!("[tick {}] {} {}: {}", tick, request, status, result.message);
        }
    }

    let model = session.model();
    let names = |ids: &[session_events::PartId]| {
        ids.iter().map(|id| id.as_str()).collect::<Vec<_>>().join(", ")
    };
    println!();
    println!("Targets: [{}]", names(model.targets()));
    let blended: Vec<_> = model.blended().keys().cloned().collect();
    println!("Blended: [{}]", names(&blended));
    println!("Victory: {}", model.victory());

    if let Some(path) = record {
        let recorded = session.stop_recording()?;
        write_file(&path, &recorded.to_json()?)?;
        println!(
            "Recorded {} actions to {} (seed {})",
            recorded.actions.len(),
            path.display(),
            recorded.seed
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn replay(path: &Path, config: Option<PathBuf>, bundle: &Path) -> Result<ExitCode, CliError> {
    let content = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let recording = RecordedSession::from_json(&content)?;
    let config = match config {
        Some(path) => Some(SessionConfig::load(path)?),
        None => None,
    };

    let mut playback = PlaybackController::new(recording, config)?;
    match playback.run_to_end() {
        Ok(report) => {
            println!(
                "Replay in sync: {} actions verified, {} ticks, final state {}",
                report.actions_verified,
                report.ticks,
                if report.final_state_verified {
                    "verified"
                } else {
                    "not recorded"
                }
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(PlaybackError::Mismatch(mismatch)) => {
            eprintln!("Replay diverged {}", mismatch);
            let diagnostics = playback.diagnostic_bundle(&mismatch);
            diagnostics
                .write(bundle)
                .map_err(|source| CliError::Write {
                    path: bundle.display().to_string(),
                    source,
                })?;
            eprintln!("Diagnostic bundle written to {}", bundle.display());
            Ok(ExitCode::from(1))
        }
        Err(e) => Err(e.into()),
    }
}

fn default_config() -> Result<ExitCode, CliError> {
    print!("{}", SessionConfig::default().to_toml()?);
    Ok(ExitCode::SUCCESS)
}
