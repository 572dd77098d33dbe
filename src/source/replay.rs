//! # Replay Source
//!
//! A [`TelemetrySource`] that plays back recorded frames from a JSON-lines
//! file, one object of `field -> value` per line:
//!
//! ```text
//! {"PLANE_LATITUDE": 47.4502, "PLANE_LONGITUDE": -122.3088, "PLANE_ALTITUDE": 433.0}
//! {"PLANE_LATITUDE": 47.4511, "PLANE_LONGITUDE": -122.3087, "PLANE_ALTITUDE": 480.5}
//! ```
//!
//! Each [`refresh`](TelemetrySource::refresh) latches the next frame. Once
//! every frame has been played the source reports `SourceUnavailable`, the
//! same way a closed simulator connection would.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use super::TelemetrySource;
use crate::error::{RecorderError, Result};
use crate::schema::FieldValue;

/// One frame of simulator state. `null` marks an absent field.
pub type Frame = BTreeMap<String, Option<FieldValue>>;

/// Frame-by-frame playback of recorded simulator state
#[derive(Debug, Default)]
pub struct ReplaySource {
    frames: Vec<Frame>,
    /// Index of the latched frame; `None` until the first refresh
    current: Option<usize>,
    /// Values written with `set`, cleared on the next refresh
    overrides: BTreeMap<String, FieldValue>,
    triggered: Vec<String>,
}

impl ReplaySource {
    /// Create a replay from in-memory frames
    pub fn from_frames(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            ..Self::default()
        }
    }

    /// Load a JSON-lines replay file. Blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or a line is not a JSON object
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let frames = contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str::<Frame>)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        info!(
            "Loaded {} replay frames from {}",
            frames.len(),
            path.as_ref().display()
        );
        Ok(Self::from_frames(frames))
    }

    /// Number of frames in the replay
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Events fired with `trigger`, in order
    pub fn triggered_events(&self) -> &[String] {
        &self.triggered
    }
}

impl TelemetrySource for ReplaySource {
    fn refresh(&mut self) -> Result<()> {
        let next = self.current.map_or(0, |index| index + 1);
        if next >= self.frames.len() {
            return Err(RecorderError::SourceUnavailable(format!(
                "replay exhausted after {} frames",
                self.frames.len()
            )));
        }

        self.current = Some(next);
        self.overrides.clear();
        debug!("Replay frame {}/{}", next + 1, self.frames.len());
        Ok(())
    }

    fn get(&self, field: &str) -> Result<Option<FieldValue>> {
        if let Some(value) = self.overrides.get(field) {
            return Ok(Some(value.clone()));
        }

        Ok(self
            .current
            .and_then(|index| self.frames[index].get(field))
            .cloned()
            .flatten())
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        debug!("Replay set {} = {}", field, value);
        self.overrides.insert(field.to_string(), value);
        Ok(())
    }

    fn trigger(&mut self, event: &str) -> Result<()> {
        info!("Replay event triggered: {}", event);
        self.triggered.push(event.to_string());
        Ok(())
    }
}
