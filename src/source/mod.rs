//! # Telemetry Source Module
//!
//! Contract for the simulator data interface the recorder polls.
//!
//! This module handles:
//! - Reading named fields (`get`), where an absent value is a normal outcome
//! - Writing fields (`set`) and firing simulator events (`trigger`)
//! - Replaying recorded frames from a JSON-lines file
//! - Aircraft utility commands built on top of `set`/`trigger`
//!
//! A dropped provider connection is reported as
//! [`RecorderError::SourceUnavailable`] and halts recording.
//!
//! [`RecorderError::SourceUnavailable`]: crate::error::RecorderError::SourceUnavailable

pub mod aircraft;
pub mod replay;

pub use replay::ReplaySource;

use crate::error::Result;
use crate::schema::FieldValue;

/// Simulator data interface.
///
/// `get` returns `Ok(None)` when the provider has no value for the field
/// yet. Implementations do not retry on their own.
#[cfg_attr(test, mockall::automock)]
pub trait TelemetrySource: Send {
    /// Latch a fresh frame of data. Called once at the start of every tick.
    fn refresh(&mut self) -> Result<()> {
        Ok(())
    }

    /// Read a field
    fn get(&self, field: &str) -> Result<Option<FieldValue>>;

    /// Write a field
    fn set(&mut self, field: &str, value: FieldValue) -> Result<()>;

    /// Fire a named simulator event
    fn trigger(&mut self, event: &str) -> Result<()>;
}

/// Read a field as a finite number, treating text and non-finite values as absent.
pub fn read_f64(source: &dyn TelemetrySource, field: &str) -> Result<Option<f64>> {
    Ok(source
        .get(field)?
        .and_then(|value| value.as_f64())
        .filter(|value| value.is_finite()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecorderError;
    use mockall::predicate::eq;

    #[test]
    fn test_read_f64_number() {
        let mut source = MockTelemetrySource::new();
        source
            .expect_get()
            .with(eq("PLANE_ALTITUDE"))
            .returning(|_| Ok(Some(FieldValue::Number(1200.0))));

        assert_eq!(read_f64(&source, "PLANE_ALTITUDE").unwrap(), Some(1200.0));
    }

    #[test]
    fn test_read_f64_text_is_absent() {
        let mut source = MockTelemetrySource::new();
        source
            .expect_get()
            .returning(|_| Ok(Some(FieldValue::from("C172"))));

        assert_eq!(read_f64(&source, "ATC_TYPE").unwrap(), None);
    }

    #[test]
    fn test_read_f64_nan_is_absent() {
        let mut source = MockTelemetrySource::new();
        source
            .expect_get()
            .returning(|_| Ok(Some(FieldValue::Number(f64::NAN))));

        assert_eq!(read_f64(&source, "G_FORCE").unwrap(), None);
    }

    #[test]
    fn test_read_f64_propagates_unavailable() {
        let mut source = MockTelemetrySource::new();
        source
            .expect_get()
            .returning(|_| Err(RecorderError::SourceUnavailable("pipe closed".into())));

        match read_f64(&source, "PLANE_LATITUDE") {
            Err(RecorderError::SourceUnavailable(msg)) => assert_eq!(msg, "pipe closed"),
            other => panic!("Expected SourceUnavailable, got: {:?}", other),
        }
    }
}
