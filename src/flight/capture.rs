//! # Sample and Header Capture
//!
//! Pulls one full [`Sample`] or the start-of-flight [`Header`] from a
//! [`TelemetrySource`], stamped with the aircraft's local time.
//!
//! Absent fields are recorded as absent. If local time cannot be resolved
//! within the resolver's attempt budget, UTC wall-clock time is used instead
//! so every record still carries a timestamp.

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::error::{RecorderError, Result};
use crate::local_time::LocalTimeResolver;
use crate::schema::{FieldValue, Header, HeaderEntry, Sample, SessionId, HEADER_FIELDS, SAMPLE_FIELDS};
use crate::source::TelemetrySource;

fn read_value(source: &dyn TelemetrySource, field: &str) -> Result<Option<FieldValue>> {
    Ok(source.get(field)?.and_then(|value| match value {
        FieldValue::Number(number) => FieldValue::number(number),
        other => Some(other),
    }))
}

/// Local time at the aircraft position, falling back to UTC.
pub fn capture_local_time(
    source: &dyn TelemetrySource,
    resolver: &LocalTimeResolver,
) -> Result<NaiveDateTime> {
    match resolver.resolve_from(source) {
        Ok(local) => Ok(local),
        Err(RecorderError::GeoResolution(reason)) => {
            warn!("Using UTC timestamp, local time unavailable: {}", reason);
            Ok(resolver.now_utc().naive_utc())
        }
        Err(e) => Err(e),
    }
}

/// Poll every sample field once.
pub fn capture_sample(source: &dyn TelemetrySource, resolver: &LocalTimeResolver) -> Result<Sample> {
    let local_time = capture_local_time(source, resolver)?;
    let values = SAMPLE_FIELDS
        .iter()
        .map(|field| read_value(source, field))
        .collect::<Result<Vec<_>>>()?;

    let absent = values.iter().filter(|value| value.is_none()).count();
    if absent > 0 {
        debug!("Sample at {} has {} absent fields", local_time, absent);
    }

    Ok(Sample { local_time, values })
}

/// Capture the header for a new session.
pub fn capture_header(
    session_id: SessionId,
    source: &dyn TelemetrySource,
    resolver: &LocalTimeResolver,
) -> Result<Header> {
    let local_time = capture_local_time(source, resolver)?;
    let entries = HEADER_FIELDS
        .iter()
        .map(|&(name, field)| {
            Ok(HeaderEntry {
                name: name.to_string(),
                value: read_value(source, field)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Header {
        session_id,
        local_time,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_time::NauticalZones;
    use crate::source::MockTelemetrySource;
    use chrono::{DateTime, NaiveDate, Utc};

    fn fixed_now() -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2024, 4, 18)
            .unwrap()
            .and_hms_opt(11, 52, 44)
            .unwrap()
            .and_utc()
    }

    fn resolver() -> LocalTimeResolver {
        LocalTimeResolver::new(Box::new(NauticalZones), 2).with_clock(fixed_now)
    }

    fn airborne_source() -> MockTelemetrySource {
        let mut source = MockTelemetrySource::new();
        source.expect_get().returning(|field| {
            Ok(match field {
                "PLANE_LATITUDE" | "GPS_WP_NEXT_LAT" => Some(FieldValue::Number(43.63)),
                "PLANE_LONGITUDE" | "GPS_WP_NEXT_LON" => Some(FieldValue::Number(-79.39)),
                "ATC_TYPE" => Some(FieldValue::from("Cessna")),
                "STALL_WARNING" => Some(FieldValue::Flag(false)),
                "G_FORCE" => Some(FieldValue::Number(f64::NAN)),
                "TOTAL_WEIGHT" => Some(FieldValue::Number(2450.0)),
                _ => None,
            })
        });
        source
    }

    #[test]
    fn test_capture_sample_aligned_with_schema() {
        let sample = capture_sample(&airborne_source(), &resolver()).unwrap();

        assert_eq!(sample.values.len(), SAMPLE_FIELDS.len());
        assert_eq!(sample.get("PLANE_LATITUDE"), Some(&FieldValue::Number(43.63)));
        assert_eq!(sample.get("STALL_WARNING"), Some(&FieldValue::Flag(false)));
        assert_eq!(sample.get("AIRSPEED_TRUE"), None);
    }

    #[test]
    fn test_capture_sample_non_finite_is_absent() {
        let sample = capture_sample(&airborne_source(), &resolver()).unwrap();
        assert_eq!(sample.get("G_FORCE"), None);
    }

    #[test]
    fn test_capture_sample_uses_local_time() {
        let sample = capture_sample(&airborne_source(), &resolver()).unwrap();
        // -79.39° is UTC-5
        let expected = NaiveDate::from_ymd_opt(2024, 4, 18).unwrap().and_hms_opt(6, 52, 44).unwrap();
        assert_eq!(sample.local_time, expected);
    }

    #[test]
    fn test_capture_sample_falls_back_to_utc() {
        let mut source = MockTelemetrySource::new();
        source.expect_get().returning(|_| Ok(None));

        let sample = capture_sample(&source, &resolver()).unwrap();
        assert_eq!(sample.local_time, fixed_now().naive_utc());
        assert!(sample.values.iter().all(Option::is_none));
    }

    #[test]
    fn test_capture_sample_propagates_unavailable() {
        let mut source = MockTelemetrySource::new();
        source
            .expect_get()
            .returning(|_| Err(RecorderError::SourceUnavailable("down".into())));

        assert!(matches!(
            capture_sample(&source, &resolver()),
            Err(RecorderError::SourceUnavailable(_))
        ));
    }

    #[test]
    fn test_capture_header() {
        let header = capture_header(SessionId::new(7), &airborne_source(), &resolver()).unwrap();

        assert_eq!(header.session_id, SessionId::new(7));
        assert_eq!(header.entries.len(), HEADER_FIELDS.len());
        assert_eq!(header.get("ATC_TYPE"), Some(&FieldValue::from("Cessna")));
        assert_eq!(header.get("TOTAL_WEIGHT"), Some(&FieldValue::Number(2450.0)));
        assert_eq!(header.get("DESTINATION_LAT"), Some(&FieldValue::Number(43.63)));
        assert_eq!(header.get("ATC_MODEL"), None);
    }
}
