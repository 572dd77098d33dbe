//! # Error Types
//!
//! Custom error types for the flight recorder using `thiserror`.
//!
//! Absent telemetry fields are not errors: [`TelemetrySource::get`] reports
//! them as `Ok(None)`. Incomplete sessions are repaired by deletion and only
//! logged.
//!
//! [`TelemetrySource::get`]: crate::source::TelemetrySource::get

use thiserror::Error;

use crate::schema::SessionId;

/// Main error type for the flight recorder
#[derive(Debug, Error)]
pub enum RecorderError {
    /// The telemetry provider connection is down. Fatal to the recording loop.
    #[error("telemetry source unavailable: {0}")]
    SourceUnavailable(String),

    /// Local time could not be resolved from the aircraft position
    #[error("geo resolution failed: {0}")]
    GeoResolution(String),

    /// A session directory already exists for this id
    #[error("session {0} already exists")]
    AlreadyExists(SessionId),

    /// A string could not be parsed as a session id (`f<N>`)
    #[error("invalid session id: {0:?}")]
    InvalidSessionId(String),

    /// The requested session has no persisted artifact
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Session artifact (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV export errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type alias for the flight recorder
pub type Result<T> = std::result::Result<T, RecorderError>;
