//! # Recorder Module
//!
//! The recording worker and its link to the presentation side.
//!
//! This module handles:
//! - The fixed-period recording loop
//! - Pause/resume/stop commands delivered over a channel
//! - Human-readable status strings pushed to a fire-and-forget sink

pub mod recording_loop;
pub mod status;

pub use recording_loop::{LoopState, RecordingLoop, TickOutcome};
pub use status::{Command, StatusSink};
