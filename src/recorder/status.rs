//! Worker ↔ presentation plumbing: status strings out, commands in.

use std::path::Path;
use std::str::FromStr;
use tokio::sync::mpsc;
use tracing::debug;

use crate::schema::Header;
use crate::source::aircraft::AircraftCommand;

/// Status while recording is paused
pub const PAUSED: &str = "RECORD PAUSED.";

/// Status while no flight is loaded
pub const WAITING: &str = "WAITING FOR FLIGHT...";

/// Status while a new session's header is being captured
pub const CREATING_HEADER: &str = "Creating Flight Header...";

/// External control of the recording loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Begin recording; same as `Resume` once the loop is running
    Start,
    Pause,
    Resume,
    /// Exit the loop after the current tick
    Stop,
    /// Act on the aircraft at the start of the next unpaused tick
    Aircraft(AircraftCommand),
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(Command::Start),
            "pause" => Ok(Command::Pause),
            "resume" => Ok(Command::Resume),
            "stop" | "quit" => Ok(Command::Stop),
            other if other.starts_with("systems") || other.starts_with("travel") || other == "repair" => {
                other.parse().map(Command::Aircraft)
            }
            other => Err(format!(
                "unknown command {:?} (expected start, pause, resume, stop, systems on|off, repair or travel <lat> <lon> [agl_ft])",
                other
            )),
        }
    }
}

/// Fire-and-forget status channel to the presentation side.
///
/// Sends never block and a closed receiver is ignored.
#[derive(Debug, Clone, Default)]
pub struct StatusSink {
    tx: Option<mpsc::UnboundedSender<String>>,
}

impl StatusSink {
    /// Sink plus the receiver the presentation task reads from
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Sink that drops everything
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn emit(&self, status: impl Into<String>) {
        if let Some(tx) = &self.tx {
            if tx.send(status.into()).is_err() {
                debug!("Status receiver closed, dropping status");
            }
        }
    }
}

pub fn loading_status(remaining: u32) -> String {
    format!("Loading: {}", remaining)
}

/// Header summary shown while recording.
///
/// ```text
/// RECORDING:
/// --FLIGHT HEADER--
/// LOCAL_TIME : 2024-05-06 11:49:55
/// ANG_FLIGHT_NUMBER : f4
/// ...
///
/// Recording in Directory ./data/f4/f4_Flight_Header.json
/// ```
pub fn header_status(header: &Header, location: &Path) -> String {
    let mut status = String::from("RECORDING:\n--FLIGHT HEADER--\n");
    for (key, value) in header.rows() {
        status.push_str(&format!("{} : {}\n", key, value));
    }
    status.push_str(&format!("\nRecording in Directory {}", location.display()));
    status
}
