//! # Local Time Module
//!
//! Resolves the aircraft's local wall-clock time from its position.
//!
//! The timezone lookup itself is a collaborator behind [`TimezoneLookup`].
//! Three lookups are built in:
//!
//! - [`PositionZones`] (default): the IANA zone containing the position,
//!   with its daylight saving rules and non-hour offsets
//! - [`NauticalZones`]: 15° longitude bands, offset = round(lon / 15) hours
//! - [`NamedZone`]: one fixed IANA zone regardless of position
//!
//! [`LocalTimeResolver::resolve_from`] re-reads the position and retries a
//! bounded number of times before giving up with
//! [`RecorderError::GeoResolution`].

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};
use tzf_rs::DefaultFinder;

use crate::error::{RecorderError, Result};
use crate::schema::fields::{PLANE_LATITUDE, PLANE_LONGITUDE};
use crate::source::{read_f64, TelemetrySource};

/// Configuration name selecting [`PositionZones`]
pub const POSITION: &str = "position";

/// Configuration name selecting [`NauticalZones`]
pub const NAUTICAL: &str = "nautical";

/// Seconds per hour of nautical offset
const SECONDS_PER_HOUR: i32 = 3600;

/// Maps a position to its UTC offset at a given instant.
#[cfg_attr(test, mockall::automock)]
pub trait TimezoneLookup: Send + Sync {
    fn utc_offset(&self, lat: f64, lon: f64, at: DateTime<Utc>) -> Result<FixedOffset>;
}

/// The real time zone at the aircraft position.
///
/// Positions outside every zone polygon, or zone names unknown to
/// `chrono-tz`, fall back to [`NauticalZones`].
pub struct PositionZones {
    finder: DefaultFinder,
}

impl PositionZones {
    /// Load the zone polygons. Takes a noticeable moment, so build once.
    pub fn new() -> Self {
        Self {
            finder: DefaultFinder::new(),
        }
    }

    /// IANA zone name at the position, if one is found
    pub fn zone_at(&self, lat: f64, lon: f64) -> Option<Tz> {
        self.finder.get_tz_name(lon, lat).parse().ok()
    }
}

impl Default for PositionZones {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PositionZones {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionZones").finish_non_exhaustive()
    }
}

impl TimezoneLookup for PositionZones {
    fn utc_offset(&self, lat: f64, lon: f64, at: DateTime<Utc>) -> Result<FixedOffset> {
        validate_coordinates(lat, lon)?;

        match self.zone_at(lat, lon) {
            Some(tz) => NamedZone(tz).utc_offset(lat, lon, at),
            None => {
                debug!("No time zone at lat={} lon={}, using nautical zone", lat, lon);
                NauticalZones.utc_offset(lat, lon, at)
            }
        }
    }
}

/// Nautical time zones: whole-hour offsets from 15° longitude bands.
#[derive(Debug, Clone, Copy, Default)]
pub struct NauticalZones;

impl TimezoneLookup for NauticalZones {
    fn utc_offset(&self, lat: f64, lon: f64, _at: DateTime<Utc>) -> Result<FixedOffset> {
        validate_coordinates(lat, lon)?;

        let hours = (lon / 15.0).round() as i32;
        FixedOffset::east_opt(hours * SECONDS_PER_HOUR).ok_or_else(|| {
            RecorderError::GeoResolution(format!("no offset for longitude {}", lon))
        })
    }
}

/// A single IANA zone used for every position.
#[derive(Debug, Clone, Copy)]
pub struct NamedZone(pub Tz);

impl TimezoneLookup for NamedZone {
    fn utc_offset(&self, lat: f64, lon: f64, at: DateTime<Utc>) -> Result<FixedOffset> {
        validate_coordinates(lat, lon)?;
        Ok(self.0.offset_from_utc_datetime(&at.naive_utc()).fix())
    }
}

fn validate_coordinates(lat: f64, lon: f64) -> Result<()> {
    if !lat.is_finite() || !lon.is_finite() || lat.abs() > 90.0 || lon.abs() > 180.0 {
        return Err(RecorderError::GeoResolution(format!(
            "invalid coordinates lat={} lon={}",
            lat, lon
        )));
    }
    Ok(())
}

/// Whether `name` selects a lookup: `"position"`, `"nautical"` or an IANA zone name.
pub fn is_known_zone(name: &str) -> bool {
    name == POSITION || name == NAUTICAL || name.parse::<Tz>().is_ok()
}

/// Build the lookup named in configuration: `"position"`, `"nautical"` or
/// an IANA zone name.
pub fn lookup_from_name(name: &str) -> Option<Box<dyn TimezoneLookup>> {
    match name {
        POSITION => Some(Box::new(PositionZones::new())),
        NAUTICAL => Some(Box::new(NauticalZones)),
        _ => name
            .parse::<Tz>()
            .ok()
            .map(|tz| Box::new(NamedZone(tz)) as Box<dyn TimezoneLookup>),
    }
}

/// Converts aircraft position into local time with bounded retry.
pub struct LocalTimeResolver {
    lookup: Box<dyn TimezoneLookup>,
    max_attempts: u32,
    clock: fn() -> DateTime<Utc>,
}

impl std::fmt::Debug for LocalTimeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTimeResolver")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl LocalTimeResolver {
    /// Create a resolver. `max_attempts` is raised to at least 1.
    pub fn new(lookup: Box<dyn TimezoneLookup>, max_attempts: u32) -> Self {
        Self {
            lookup,
            max_attempts: max_attempts.max(1),
            clock: Utc::now,
        }
    }

    /// Replace the wall clock, for deterministic tests.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Current UTC time as seen by this resolver
    pub fn now_utc(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Local time at the given coordinates, single attempt.
    pub fn resolve(&self, lat: f64, lon: f64) -> Result<NaiveDateTime> {
        let now = self.now_utc();
        let offset = self.lookup.utc_offset(lat, lon, now)?;
        Ok(now.with_timezone(&offset).naive_local())
    }

    /// Local time at the aircraft's current position.
    ///
    /// Re-reads latitude and longitude on every attempt. Absent coordinates
    /// and lookup failures are retried up to `max_attempts` times.
    ///
    /// # Errors
    ///
    /// - `SourceUnavailable` as soon as the provider reports it
    /// - `GeoResolution` once every attempt has failed
    pub fn resolve_from(&self, source: &dyn TelemetrySource) -> Result<NaiveDateTime> {
        let mut last_failure = String::from("no attempt made");

        for attempt in 1..=self.max_attempts {
            let lat = read_f64(source, PLANE_LATITUDE)?;
            let lon = read_f64(source, PLANE_LONGITUDE)?;

            match (lat, lon) {
                (Some(lat), Some(lon)) => match self.resolve(lat, lon) {
                    Ok(local) => return Ok(local),
                    Err(e) => last_failure = e.to_string(),
                },
                _ => last_failure = "position absent".to_string(),
            }
            debug!(
                "Local time attempt {}/{} failed: {}",
                attempt, self.max_attempts, last_failure
            );
        }

        warn!(
            "Local time unresolved after {} attempts: {}",
            self.max_attempts, last_failure
        );
        Err(RecorderError::GeoResolution(last_failure))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldValue;
    use crate::source::MockTelemetrySource;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fixed_now() -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2024, 7, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc()
    }

    fn local(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, 1).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    fn position_source(lat: Option<f64>, lon: Option<f64>) -> MockTelemetrySource {
        let mut source = MockTelemetrySource::new();
        source.expect_get().returning(move |field| {
            Ok(match field {
                PLANE_LATITUDE => lat.map(FieldValue::Number),
                PLANE_LONGITUDE => lon.map(FieldValue::Number),
                _ => None,
            })
        });
        source
    }

    #[test]
    fn test_nautical_offsets() {
        let zones = NauticalZones;
        let hours = |lon: f64| zones.utc_offset(0.0, lon, fixed_now()).unwrap().local_minus_utc() / 3600;

        assert_eq!(hours(0.0), 0);
        assert_eq!(hours(-79.389), -5);
        assert_eq!(hours(139.69), 9);
        assert_eq!(hours(7.4), 0);
        assert_eq!(hours(7.6), 1);
        assert_eq!(hours(180.0), 12);
        assert_eq!(hours(-180.0), -12);
    }

    #[test]
    fn test_nautical_rejects_invalid_coordinates() {
        let zones = NauticalZones;
        for (lat, lon) in [(f64::NAN, 0.0), (0.0, f64::INFINITY), (91.0, 0.0), (0.0, -181.0)] {
            assert!(matches!(
                zones.utc_offset(lat, lon, fixed_now()),
                Err(RecorderError::GeoResolution(_))
            ));
        }
    }

    #[test]
    fn test_named_zone_applies_daylight_saving() {
        let zone = NamedZone(chrono_tz::America::Toronto);
        let offset = zone.utc_offset(43.63, -79.38, fixed_now()).unwrap();
        // EDT in July
        assert_eq!(offset.local_minus_utc(), -4 * 3600);
    }

    #[test]
    fn test_position_zones_follow_real_zones() {
        // 2024-05-06 16:00Z
        let at = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap().and_hms_opt(16, 0, 0).unwrap().and_utc();
        let zones = PositionZones::new();
        let minutes = |lat: f64, lon: f64| zones.utc_offset(lat, lon, at).unwrap().local_minus_utc() / 60;

        // Mumbai: IST, half-hour offset
        assert_eq!(minutes(19.076, 72.8777), 5 * 60 + 30);
        // New York: EDT
        assert_eq!(minutes(40.7128, -74.006), -4 * 60);
        // Madrid: CEST, two hours off its longitude band
        assert_eq!(minutes(40.4168, -3.7038), 2 * 60);
    }

    #[test]
    fn test_position_zones_resolver_local_time() {
        fn may_sixth() -> DateTime<Utc> {
            NaiveDate::from_ymd_opt(2024, 5, 6).unwrap().and_hms_opt(16, 0, 0).unwrap().and_utc()
        }
        let resolver = LocalTimeResolver::new(Box::new(PositionZones::new()), 1).with_clock(may_sixth);
        let expected = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap().and_hms_opt(21, 30, 0).unwrap();
        assert_eq!(resolver.resolve(19.076, 72.8777).unwrap(), expected);
    }

    #[test]
    fn test_position_zones_open_ocean() {
        let zones = PositionZones::new();
        // Mid-Atlantic: either an Etc/GMT+3 ocean zone or the nautical band, both UTC-3
        let offset = zones.utc_offset(30.0, -40.0, fixed_now()).unwrap();
        assert_eq!(offset.local_minus_utc(), -3 * 3600);
        assert!(zones.utc_offset(f64::NAN, 0.0, fixed_now()).is_err());
    }

    #[test]
    fn test_is_known_zone() {
        assert!(is_known_zone("position"));
        assert!(is_known_zone("nautical"));
        assert!(is_known_zone("Asia/Kolkata"));
        assert!(!is_known_zone("Mars/Olympus_Mons"));
    }

    #[test]
    fn test_lookup_from_name() {
        assert!(lookup_from_name("position").is_some());
        assert!(lookup_from_name("nautical").is_some());
        assert!(lookup_from_name("Europe/Berlin").is_some());
        assert!(lookup_from_name("Mars/Olympus_Mons").is_none());
    }

    #[test]
    fn test_resolve_shifts_utc_by_offset() {
        let resolver = LocalTimeResolver::new(Box::new(NauticalZones), 3).with_clock(fixed_now);
        assert_eq!(resolver.resolve(43.63, -79.38).unwrap(), local(7, 0));
        assert_eq!(resolver.resolve(35.68, 139.69).unwrap(), local(21, 0));
    }

    #[test]
    fn test_resolve_from_source() {
        let resolver = LocalTimeResolver::new(Box::new(NauticalZones), 3).with_clock(fixed_now);
        let source = position_source(Some(51.47), Some(-0.45));
        assert_eq!(resolver.resolve_from(&source).unwrap(), local(12, 0));
    }

    #[test]
    fn test_resolve_from_gives_up_on_absent_position() {
        let resolver = LocalTimeResolver::new(Box::new(NauticalZones), 4).with_clock(fixed_now);
        let mut source = MockTelemetrySource::new();
        // Two reads per attempt, four attempts
        source.expect_get().times(8).returning(|_| Ok(None));

        match resolver.resolve_from(&source) {
            Err(RecorderError::GeoResolution(msg)) => assert_eq!(msg, "position absent"),
            other => panic!("Expected GeoResolution, got: {:?}", other),
        }
    }

    #[test]
    fn test_resolve_from_retries_transient_lookup_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let mut lookup = MockTimezoneLookup::new();
        lookup.expect_utc_offset().returning(move |_, _, _| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(RecorderError::GeoResolution("lookup busy".into()))
            } else {
                Ok(FixedOffset::east_opt(2 * 3600).unwrap())
            }
        });

        let resolver = LocalTimeResolver::new(Box::new(lookup), 5).with_clock(fixed_now);
        let source = position_source(Some(48.1), Some(11.5));

        assert_eq!(resolver.resolve_from(&source).unwrap(), local(14, 0));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_resolve_from_propagates_unavailable() {
        let resolver = LocalTimeResolver::new(Box::new(NauticalZones), 3);
        let mut source = MockTelemetrySource::new();
        source
            .expect_get()
            .times(1)
            .returning(|_| Err(RecorderError::SourceUnavailable("closed".into())));

        assert!(matches!(
            resolver.resolve_from(&source),
            Err(RecorderError::SourceUnavailable(_))
        ));
    }

    #[test]
    fn test_zero_attempts_is_raised_to_one() {
        let resolver = LocalTimeResolver::new(Box::new(NauticalZones), 0).with_clock(fixed_now);
        let source = position_source(Some(0.0), Some(0.0));
        assert!(resolver.resolve_from(&source).is_ok());
    }
}
