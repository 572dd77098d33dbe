//! # Flight Recorder
//!
//! Record flight simulator telemetry sessions and export them as CSV.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use flight_recorder::config::{Config, LoggingConfig};
use flight_recorder::recorder::{Command, RecordingLoop, StatusSink};
use flight_recorder::schema::SessionId;
use flight_recorder::source::ReplaySource;
use flight_recorder::storage::Exporter;

/// Configuration file picked up from the working directory when `--config` is not given
const DEFAULT_CONFIG_PATH: &str = "flight-recorder.toml";

/// Prefix of the daily rolling log files
const LOG_FILE_PREFIX: &str = "flight-recorder.log";

/// Queued commands from stdin before the loop picks them up
const COMMAND_BUFFER: usize = 16;

#[derive(Parser, Debug)]
#[command(name = "flight-recorder", version)]
#[command(about = "Record flight simulator telemetry sessions", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, short)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Record flights.
    ///
    /// Control the recorder on stdin with pause, resume or stop. Act on the
    /// aircraft with systems on, systems off, repair or travel <lat> <lon> [agl_ft].
    Record {
        /// JSON-lines file of simulator frames to play back
        #[arg(long)]
        replay: PathBuf,

        /// Start paused; `start` or `resume` begins recording
        #[arg(long)]
        paused: bool,
    },

    /// List sessions not yet exported to CSV
    Pending,

    /// Export sessions to CSV, skipping ones already exported
    Export {
        /// Export only this session (e.g. f3)
        #[arg(long)]
        session: Option<SessionId>,

        /// Export headers only
        #[arg(long, conflicts_with = "flights_only")]
        headers_only: bool,

        /// Export sample series only
        #[arg(long)]
        flights_only: bool,
    },
}

/// Main entry point for the flight recorder
///
/// # Control Flow
///
/// 1. Load configuration (`--config`, else `flight-recorder.toml` if present, else defaults)
/// 2. Set up logging to stderr and, when configured, a daily log file
/// 3. Run the selected command
///
/// # Errors
///
/// Returns error if:
/// - Configuration cannot be loaded or is invalid
/// - The replay file cannot be read
/// - The recording loop halts (telemetry source lost, storage failure)
/// - Export fails
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let _log_guard = init_logging(&config.logging)?;

    info!("Flight Recorder v{} starting...", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Record { replay, paused } => record(&config, &replay, paused).await,
        Commands::Pending => pending(&config),
        Commands::Export {
            session,
            headers_only,
            flights_only,
        } => export(&config, session, !flights_only, !headers_only),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None if Path::new(DEFAULT_CONFIG_PATH).is_file() => Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("Failed to load configuration from {}", DEFAULT_CONFIG_PATH)),
        None => Ok(Config::default()),
    }
}

/// Console logging, plus a daily rolling file when `log_dir` is set.
///
/// The returned guard flushes the file writer on drop and must be kept
/// alive until exit.
fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = || EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let console_layer = tracing_subscriber::fmt::layer().with_writer(io::stderr);

    let Some(log_dir) = &config.log_dir else {
        tracing_subscriber::registry()
            .with(env_filter())
            .with(console_layer)
            .init();
        return Ok(None);
    };

    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(console_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .init();

    Ok(Some(guard))
}

/// Run the recording loop against a replay file until stopped, cancelled
/// or the replay runs out.
async fn record(config: &Config, replay: &Path, paused: bool) -> Result<()> {
    let source = ReplaySource::load(replay)
        .with_context(|| format!("Failed to load replay {}", replay.display()))?;

    let (status, mut status_rx) = StatusSink::channel();
    let mut recorder = RecordingLoop::from_config(config, Box::new(source), status)?;

    if let Some(removed) = recorder.store().validate_and_repair()? {
        warn!("Discarded incomplete session {} left by a previous run", removed);
    }
    if paused {
        recorder.pause();
    }

    // Presentation side: print every status as it arrives
    let printer = tokio::spawn(async move {
        while let Some(status) = status_rx.recv().await {
            println!("{}\n", status);
        }
    });

    let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
    spawn_stdin_reader(command_tx);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down...");
            ctrl_c.cancel();
        }
    });

    info!("Press Ctrl+C or type stop to exit");
    let result = recorder.run(command_rx, cancel).await;

    // The loop owned the only sender, so the printer drains and exits
    printer.await?;
    result?;

    info!("Recorder stopped");
    Ok(())
}

/// Forward stdin lines to the loop as commands.
///
/// Runs on a plain thread so a blocked read never holds up runtime shutdown.
fn spawn_stdin_reader(commands: mpsc::Sender<Command>) {
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<Command>() {
                Ok(command) => {
                    if commands.blocking_send(command).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("{}", e),
            }
        }
    });
}

fn pending(config: &Config) -> Result<()> {
    let exporter = Exporter::new(config.storage.open_store()?);
    let pending = exporter.pending()?;

    if pending.is_empty() {
        println!("Nothing to export");
        return Ok(());
    }
    println!("Flights: {}", join_ids(&pending.flights));
    println!("Headers: {}", join_ids(&pending.headers));
    Ok(())
}

fn export(config: &Config, session: Option<SessionId>, flights: bool, headers: bool) -> Result<()> {
    let exporter = Exporter::new(config.storage.open_store()?);

    let (exported_flights, exported_headers) = match session {
        Some(id) => {
            let flight = flights && exporter.export_flight(id)?;
            let header = headers && exporter.export_header(id)?;
            (
                if flight { vec![id] } else { Vec::new() },
                if header { vec![id] } else { Vec::new() },
            )
        }
        None => (
            if flights { exporter.export_all_flights()? } else { Vec::new() },
            if headers { exporter.export_all_headers()? } else { Vec::new() },
        ),
    };

    println!("Exported flights: {}", join_ids(&exported_flights));
    println!("Exported headers: {}", join_ids(&exported_headers));
    Ok(())
}

fn join_ids(ids: &[SessionId]) -> String {
    if ids.is_empty() {
        return "none".to_string();
    }
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_record() {
        let cli = Cli::try_parse_from(["flight-recorder", "record", "--replay", "flight.jsonl"]).unwrap();
        match cli.command {
            Commands::Record { replay, paused } => {
                assert_eq!(replay, PathBuf::from("flight.jsonl"));
                assert!(!paused);
            }
            other => panic!("Expected record, got: {:?}", other),
        }
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_export_session() {
        let cli = Cli::try_parse_from([
            "flight-recorder",
            "--config",
            "recorder.toml",
            "export",
            "--session",
            "f12",
            "--headers-only",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("recorder.toml")));
        match cli.command {
            Commands::Export { session, headers_only, flights_only } => {
                assert_eq!(session, Some(SessionId::new(12)));
                assert!(headers_only);
                assert!(!flights_only);
            }
            other => panic!("Expected export, got: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_bad_session_id() {
        assert!(Cli::try_parse_from(["flight-recorder", "export", "--session", "12"]).is_err());
    }

    #[test]
    fn test_parse_rejects_conflicting_export_flags() {
        assert!(Cli::try_parse_from(["flight-recorder", "export", "--headers-only", "--flights-only"]).is_err());
    }

    #[test]
    fn test_stdin_lines_parse_as_commands() {
        use flight_recorder::source::aircraft::AircraftCommand;

        assert_eq!("stop".parse::<Command>().unwrap(), Command::Stop);
        assert_eq!(
            "travel 47.45 -122.31 1500".parse::<Command>().unwrap(),
            Command::Aircraft(AircraftCommand::Travel { lat: 47.45, lon: -122.31, agl_ft: Some(1500.0) })
        );
    }

    #[test]
    fn test_join_ids() {
        assert_eq!(join_ids(&[]), "none");
        assert_eq!(join_ids(&[SessionId::new(0), SessionId::new(3)]), "f0, f3");
    }

    #[test]
    fn test_load_config_explicit_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("recorder.toml");
        fs::write(&path, "[recorder]\nload_delay_ticks = 5\n").unwrap();

        let config = load_config(Some(path.as_path())).unwrap();
        assert_eq!(config.recorder.load_delay_ticks, 5);
        assert!(load_config(Some(dir.path().join("missing.toml").as_path())).is_err());
    }

    #[test]
    fn test_export_end_to_end() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.data_dir = dir.path().join("data");
        config.storage.export_dir = dir.path().join("data_csv");

        // Empty store: nothing pending, nothing exported
        pending(&config).unwrap();
        export(&config, None, true, true).unwrap();
        assert!(!config.storage.export_dir.join("flight_data").exists());
    }
}
