//! # Recording Session
//!
//! In-memory state of the flight currently being recorded: its id, header
//! and the growing sample buffer. Every recorded tick checkpoints the whole
//! buffer through the [`SessionStore`].

use tracing::{debug, info, warn};

use super::capture::capture_sample;
use crate::error::Result;
use crate::local_time::LocalTimeResolver;
use crate::schema::{Header, Sample, SessionId};
use crate::source::TelemetrySource;
use crate::storage::SessionStore;

#[derive(Debug)]
struct ActiveFlight {
    id: SessionId,
    header: Header,
    samples: Vec<Sample>,
}

/// At most one active flight at a time.
#[derive(Debug, Default)]
pub struct RecordingSession {
    active: Option<ActiveFlight>,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start recording a new flight with an empty sample buffer.
    ///
    /// Called once after a NO_FLIGHT → IN_FLIGHT transition, after the
    /// header has been persisted.
    pub fn begin(&mut self, id: SessionId, header: Header) {
        if let Some(previous) = &self.active {
            warn!(
                "Session {} replaced by {} without end()",
                previous.id, id
            );
        }
        info!("Recording session {}", id);
        self.active = Some(ActiveFlight {
            id,
            header,
            samples: Vec::new(),
        });
    }

    /// Capture one sample, append it and checkpoint the full series.
    ///
    /// # Returns
    ///
    /// Buffer length after the append; 0 when no session is active.
    ///
    /// # Errors
    ///
    /// Returns error if the source is unavailable or the checkpoint cannot
    /// be written. The captured sample stays in the buffer either way.
    pub fn record_tick(
        &mut self,
        source: &dyn TelemetrySource,
        resolver: &LocalTimeResolver,
        store: &SessionStore,
    ) -> Result<usize> {
        let Some(flight) = self.active.as_mut() else {
            warn!("record_tick called with no active session");
            return Ok(0);
        };

        let sample = capture_sample(source, resolver)?;
        flight.samples.push(sample);
        store.append_sample_series(flight.id, &flight.samples)?;

        debug!("Session {} checkpointed {} samples", flight.id, flight.samples.len());
        Ok(flight.samples.len())
    }

    /// Stop recording. Persisted data is left untouched.
    ///
    /// # Returns
    ///
    /// The id of the session that ended, if one was active.
    pub fn end(&mut self) -> Option<SessionId> {
        let flight = self.active.take()?;
        info!(
            "Session {} ended with {} samples",
            flight.id,
            flight.samples.len()
        );
        Some(flight.id)
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.active.as_ref().map(|flight| flight.id)
    }

    pub fn header(&self) -> Option<&Header> {
        self.active.as_ref().map(|flight| &flight.header)
    }

    pub fn samples(&self) -> &[Sample] {
        self.active.as_ref().map_or(&[], |flight| &flight.samples)
    }

    pub fn sample_count(&self) -> usize {
        self.samples().len()
    }
}
