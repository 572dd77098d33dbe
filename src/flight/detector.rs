//! # Flight State Detector
//!
//! Decides whether a flight is in progress from the polled aircraft position.
//!
//! The simulator parks the aircraft at fixed "main menu" coordinates when no
//! flight is loaded. Being at that marker position and low is taken as
//! "no flight"; anything else is "in flight":
//!
//! ```text
//! NO_FLIGHT: round4(lat) == round4(MARKER_LATITUDE)
//!            AND round4(lon) == round4(MARKER_LONGITUDE)
//!            AND round4(alt) < 50 ft
//! IN_FLIGHT: otherwise
//! ```
//!
//! This is a heuristic. A real position that coincides with the marker is
//! misread as "no flight".

use tracing::{debug, info};

use crate::error::Result;
use crate::schema::fields::{PLANE_ALTITUDE, PLANE_LATITUDE, PLANE_LONGITUDE};
use crate::source::{read_f64, TelemetrySource};

/// Latitude the simulator reports while in the main menu
pub const MARKER_LATITUDE: f64 = 0.000407442168686809;

/// Longitude the simulator reports while in the main menu
pub const MARKER_LONGITUDE: f64 = 0.01397450300629543;

/// Altitude (feet) below which the marker position means "no flight"
pub const MARKER_ALTITUDE_CEILING_FT: f64 = 50.0;

/// Positions are compared at 4 decimal places
const MARKER_SCALE: f64 = 10_000.0;

/// Whether a flight is currently loaded in the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlightState {
    #[default]
    NoFlight,
    InFlight,
}

impl std::fmt::Display for FlightState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlightState::NoFlight => write!(f, "NO_FLIGHT"),
            FlightState::InFlight => write!(f, "IN_FLIGHT"),
        }
    }
}

/// Edge reported by [`FlightStateDetector::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Still no flight
    Idle,
    /// NO_FLIGHT → IN_FLIGHT
    Started,
    /// Still in flight
    Continuing,
    /// IN_FLIGHT → NO_FLIGHT
    Ended,
}

/// One read of the position fields
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub alt_ft: Option<f64>,
}

impl Position {
    fn is_complete(&self) -> bool {
        self.lat.is_some() && self.lon.is_some() && self.alt_ft.is_some()
    }
}

fn scaled(value: f64) -> i64 {
    (value * MARKER_SCALE).round() as i64
}

/// Classify a position. Incomplete positions are never at the marker.
pub fn classify(position: &Position) -> FlightState {
    let (Some(lat), Some(lon), Some(alt)) = (position.lat, position.lon, position.alt_ft) else {
        return FlightState::InFlight;
    };

    let at_marker = scaled(lat) == scaled(MARKER_LATITUDE) && scaled(lon) == scaled(MARKER_LONGITUDE);
    let low = (scaled(alt) as f64 / MARKER_SCALE) < MARKER_ALTITUDE_CEILING_FT;

    if at_marker && low {
        FlightState::NoFlight
    } else {
        FlightState::InFlight
    }
}

/// Two-state machine over NO_FLIGHT / IN_FLIGHT, starting in NO_FLIGHT.
#[derive(Debug)]
pub struct FlightStateDetector {
    state: FlightState,
    read_attempts: u32,
}

impl FlightStateDetector {
    /// Create a detector. `read_attempts` bounds how often an incomplete
    /// position is re-read per poll (2 = read, then retry once).
    pub fn new(read_attempts: u32) -> Self {
        Self {
            state: FlightState::NoFlight,
            read_attempts: read_attempts.max(1),
        }
    }

    /// State as of the last poll
    pub fn state(&self) -> FlightState {
        self.state
    }

    /// Read latitude, longitude and altitude, re-reading while any is absent.
    pub fn read_position(&self, source: &dyn TelemetrySource) -> Result<Position> {
        let mut position = Position::default();

        for attempt in 1..=self.read_attempts {
            position = Position {
                lat: read_f64(source, PLANE_LATITUDE)?,
                lon: read_f64(source, PLANE_LONGITUDE)?,
                alt_ft: read_f64(source, PLANE_ALTITUDE)?,
            };
            if position.is_complete() {
                break;
            }
            debug!("Incomplete position on read {}/{}: {:?}", attempt, self.read_attempts, position);
        }

        Ok(position)
    }

    /// Poll the source and advance the state machine.
    pub fn poll(&mut self, source: &dyn TelemetrySource) -> Result<Transition> {
        let position = self.read_position(source)?;
        let next = classify(&position);

        let transition = match (self.state, next) {
            (FlightState::NoFlight, FlightState::NoFlight) => Transition::Idle,
            (FlightState::NoFlight, FlightState::InFlight) => Transition::Started,
            (FlightState::InFlight, FlightState::InFlight) => Transition::Continuing,
            (FlightState::InFlight, FlightState::NoFlight) => Transition::Ended,
        };

        if next != self.state {
            info!("Flight state {} -> {} at {:?}", self.state, next, position);
        }
        self.state = next;
        Ok(transition)
    }
}

impl Default for FlightStateDetector {
    fn default() -> Self {
        Self::new(2)
    }
}
