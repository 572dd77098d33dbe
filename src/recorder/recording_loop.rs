//! # Recording Loop
//!
//! Fixed-period worker that ties detection, capture and storage together.
//!
//! Each tick:
//!
//! 1. Paused: emit `RECORD PAUSED.` and do nothing else
//! 2. Latch a fresh frame, apply queued aircraft commands, then poll the
//!    flight state detector
//! 3. `NO_FLIGHT`: end the active session, emit `WAITING FOR FLIGHT...`
//! 4. `IN_FLIGHT`, no session: count down the load delay, then repair the
//!    store, allocate an id, persist the header and begin the session
//! 5. `IN_FLIGHT`, session active: record one sample and re-emit the header
//!
//! Commands are drained at the start of every tick. Cancellation is checked
//! between ticks, so at most one tick completes after a cancel request.

use std::time::Duration;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::status::{header_status, loading_status, Command, StatusSink, CREATING_HEADER, PAUSED, WAITING};
use crate::config::Config;
use crate::error::Result;
use crate::flight::capture::capture_header;
use crate::flight::{FlightState, FlightStateDetector, RecordingSession, Transition};
use crate::local_time::LocalTimeResolver;
use crate::schema::SessionId;
use crate::source::aircraft::{master_systems_on, AircraftCommand};
use crate::source::TelemetrySource;
use crate::storage::SessionStore;

/// Mutable loop flags, owned by the worker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopState {
    pub paused: bool,
    /// Load-delay ticks still to wait before the session is created
    pub loading: Option<u32>,
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Paused,
    Waiting,
    Loading(u32),
    Started(SessionId),
    Recorded { id: SessionId, samples: usize },
}

/// The recording worker
pub struct RecordingLoop {
    source: Box<dyn TelemetrySource>,
    store: SessionStore,
    resolver: LocalTimeResolver,
    detector: FlightStateDetector,
    session: RecordingSession,
    status: StatusSink,
    state: LoopState,
    /// Aircraft commands waiting for the next unpaused tick
    pending_aircraft: Vec<AircraftCommand>,
    tick_interval: Duration,
    load_delay_ticks: u32,
}

impl RecordingLoop {
    pub fn new(
        source: Box<dyn TelemetrySource>,
        store: SessionStore,
        resolver: LocalTimeResolver,
        status: StatusSink,
        config: &Config,
    ) -> Self {
        Self {
            source,
            store,
            resolver,
            detector: FlightStateDetector::new(config.detector.position_read_attempts),
            session: RecordingSession::new(),
            status,
            state: LoopState::default(),
            pending_aircraft: Vec::new(),
            tick_interval: Duration::from_millis(config.recorder.tick_interval_ms),
            load_delay_ticks: config.recorder.load_delay_ticks,
        }
    }

    /// Build the loop with the store and resolver described by `config`
    pub fn from_config(config: &Config, source: Box<dyn TelemetrySource>, status: StatusSink) -> Result<Self> {
        let store = config.storage.open_store()?;
        let resolver = config.time.resolver()?;
        Ok(Self::new(source, store, resolver, status, config))
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused
    }

    pub fn flight_state(&self) -> FlightState {
        self.detector.state()
    }

    pub fn session(&self) -> &RecordingSession {
        &self.session
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn pause(&mut self) {
        if !self.state.paused {
            info!("Recording paused");
        }
        self.state.paused = true;
    }

    pub fn resume(&mut self) {
        if self.state.paused {
            info!("Recording resumed");
        }
        self.state.paused = false;
    }

    /// Apply a command. Returns `false` when the loop should exit.
    pub fn handle(&mut self, command: Command) -> bool {
        debug!("Command received: {:?}", command);
        match command {
            Command::Pause => self.pause(),
            Command::Start | Command::Resume => self.resume(),
            Command::Stop => return false,
            Command::Aircraft(action) => self.pending_aircraft.push(action),
        }
        true
    }

    /// Run one tick.
    ///
    /// # Errors
    ///
    /// Returns error if the telemetry source is unavailable, rejects an
    /// aircraft command, or a session artifact cannot be written. Any of
    /// these halts the loop.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        if self.state.paused {
            self.status.emit(PAUSED);
            return Ok(TickOutcome::Paused);
        }

        self.source.refresh()?;
        // After refresh, so writes land on the frame this tick reads
        for action in std::mem::take(&mut self.pending_aircraft) {
            info!("Applying aircraft command {:?}", action);
            action.apply(self.source.as_mut())?;
        }
        let transition = self.detector.poll(self.source.as_ref())?;

        match transition {
            Transition::Idle | Transition::Ended => {
                self.session.end();
                if self.state.loading.take().is_some() {
                    info!("Flight lost while loading, waiting again");
                }
                self.status.emit(WAITING);
                Ok(TickOutcome::Waiting)
            }
            Transition::Started | Transition::Continuing => {
                if let Some(id) = self.session.session_id() {
                    let samples = self
                        .session
                        .record_tick(self.source.as_ref(), &self.resolver, &self.store)?;
                    if let Some(header) = self.session.header() {
                        self.status.emit(header_status(header, &self.store.header_path(id)));
                    }
                    return Ok(TickOutcome::Recorded { id, samples });
                }

                let remaining = self.state.loading.unwrap_or(self.load_delay_ticks);
                if remaining > 0 {
                    self.status.emit(loading_status(remaining));
                    self.state.loading = Some(remaining - 1);
                    return Ok(TickOutcome::Loading(remaining));
                }

                self.state.loading = None;
                let id = self.start_session()?;
                Ok(TickOutcome::Started(id))
            }
        }
    }

    /// Allocate, persist and begin a new session.
    fn start_session(&mut self) -> Result<SessionId> {
        if let Some(removed) = self.store.validate_and_repair()? {
            info!("Discarded incomplete session {} before starting a new one", removed);
        }

        self.status.emit(CREATING_HEADER);
        let id = self.store.next_id()?;
        self.store.create(id)?;

        let header = capture_header(id, self.source.as_ref(), &self.resolver)?;
        self.store.write_header(id, &header)?;

        if master_systems_on(self.source.as_ref())? {
            info!("Session {}: master systems on", id);
        } else {
            info!("Session {}: master systems off", id);
        }

        self.status.emit(header_status(&header, &self.store.header_path(id)));
        self.session.begin(id, header);
        Ok(id)
    }

    /// Tick until stopped, cancelled or halted by an error.
    ///
    /// # Errors
    ///
    /// Returns the error that halted the loop, after emitting it as
    /// an `ERROR: ...` status
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>, cancel: CancellationToken) -> Result<()> {
        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Recording loop started, ticking every {:?}", self.tick_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.drain_commands(&mut commands) {
                        info!("Stop requested");
                        break;
                    }

                    if let Err(e) = self.tick() {
                        error!("Recording loop halted: {}", e);
                        self.status.emit(format!("ERROR: {}", e));
                        self.session.end();
                        return Err(e);
                    }
                }

                _ = cancel.cancelled() => {
                    info!("Recording loop cancelled");
                    break;
                }
            }
        }

        self.session.end();
        Ok(())
    }

    /// Apply every queued command. Returns `false` on `Stop`.
    fn drain_commands(&mut self, commands: &mut mpsc::Receiver<Command>) -> bool {
        loop {
            match commands.try_recv() {
                Ok(command) => {
                    if !self.handle(command) {
                        return false;
                    }
                }
                // A closed command channel leaves cancellation as the only way out
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return true,
            }
        }
    }
}
