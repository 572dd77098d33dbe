//! # Flight Module
//!
//! Flight-session lifecycle.
//!
//! This module handles:
//! - Detecting flight start/end from the polled aircraft position
//! - Capturing headers and samples stamped with local time
//! - Holding the active session's sample buffer and checkpointing it

pub mod capture;
pub mod detector;
pub mod session;

pub use detector::{FlightState, FlightStateDetector, Transition};
pub use session::RecordingSession;
