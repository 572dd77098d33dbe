//! # Aircraft Utilities
//!
//! Operator commands sent to the simulator through [`TelemetrySource::set`]
//! and [`TelemetrySource::trigger`]: power the aircraft up or down, repair
//! and refuel, and reposition it.

use std::str::FromStr;
use tracing::info;

use super::{read_f64, TelemetrySource};
use crate::error::Result;
use crate::schema::fields::{
    AVIONICS_MASTER_SWITCH, ELECTRICAL_MASTER_BATTERY, PLANE_LATITUDE, PLANE_LONGITUDE,
};
use crate::schema::FieldValue;

/// Event that starts every engine
pub const ENGINE_AUTO_START: &str = "ENGINE_AUTO_START";
/// Event that shuts down every engine
pub const ENGINE_AUTO_SHUTDOWN: &str = "ENGINE_AUTO_SHUTDOWN";
/// Event that toggles battery and alternator together
pub const TOGGLE_MASTER_BATTERY_ALTERNATOR: &str = "TOGGLE_MASTER_BATTERY_ALTERNATOR";
/// Event that toggles the avionics bus
pub const TOGGLE_AVIONICS_MASTER: &str = "TOGGLE_AVIONICS_MASTER";
/// Event that fully repairs and refuels the aircraft
pub const REPAIR_AND_REFUEL: &str = "REPAIR_AND_REFUEL";

/// Altitude above ground written by [`fast_travel`]
const PLANE_ALT_ABOVE_GROUND: &str = "PLANE_ALT_ABOVE_GROUND";

/// An operator request against the aircraft, applied by the recording loop
/// at the start of a tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AircraftCommand {
    SystemsOn,
    SystemsOff,
    Repair,
    /// Reposition to `lat`/`lon`, optionally at `agl_ft` feet above ground
    Travel { lat: f64, lon: f64, agl_ft: Option<f64> },
}

impl AircraftCommand {
    pub fn apply(&self, source: &mut dyn TelemetrySource) -> Result<()> {
        match *self {
            AircraftCommand::SystemsOn => start_all_systems(source),
            AircraftCommand::SystemsOff => stop_all_systems(source),
            AircraftCommand::Repair => repair_and_refuel(source),
            AircraftCommand::Travel { lat, lon, agl_ft } => fast_travel(source, Some(lat), Some(lon), agl_ft),
        }
    }
}

impl FromStr for AircraftCommand {
    type Err = String;

    /// `systems on`, `systems off`, `repair` or `travel <lat> <lon> [agl_ft]`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let words: Vec<&str> = lowered.split_whitespace().collect();

        match words.as_slice() {
            ["systems", "on"] => Ok(AircraftCommand::SystemsOn),
            ["systems", "off"] => Ok(AircraftCommand::SystemsOff),
            ["repair"] => Ok(AircraftCommand::Repair),
            ["travel", lat, lon, rest @ ..] if rest.len() <= 1 => {
                let lat = parse_degrees(lat, 90.0)?;
                let lon = parse_degrees(lon, 180.0)?;
                let agl_ft = rest.first().map(|agl| parse_number(agl)).transpose()?;
                Ok(AircraftCommand::Travel { lat, lon, agl_ft })
            }
            ["travel", ..] => Err("usage: travel <lat> <lon> [agl_ft]".to_string()),
            _ => Err(format!("unknown aircraft command {:?}", s.trim())),
        }
    }
}

fn parse_number(word: &str) -> std::result::Result<f64, String> {
    word.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| format!("{:?} is not a number", word))
}

fn parse_degrees(word: &str, limit: f64) -> std::result::Result<f64, String> {
    let value = parse_number(word)?;
    if value.abs() > limit {
        return Err(format!("{} is outside ±{}°", value, limit));
    }
    Ok(value)
}

/// Start the engines and toggle the battery/alternator and avionics masters.
pub fn start_all_systems(source: &mut dyn TelemetrySource) -> Result<()> {
    info!("Starting all aircraft systems");
    for event in [ENGINE_AUTO_START, TOGGLE_MASTER_BATTERY_ALTERNATOR, TOGGLE_AVIONICS_MASTER] {
        source.trigger(event)?;
    }
    Ok(())
}

/// Shut down the engines and toggle the battery/alternator and avionics masters.
pub fn stop_all_systems(source: &mut dyn TelemetrySource) -> Result<()> {
    info!("Stopping all aircraft systems");
    for event in [ENGINE_AUTO_SHUTDOWN, TOGGLE_MASTER_BATTERY_ALTERNATOR, TOGGLE_AVIONICS_MASTER] {
        source.trigger(event)?;
    }
    Ok(())
}

/// Fully repair and refuel the current aircraft.
pub fn repair_and_refuel(source: &mut dyn TelemetrySource) -> Result<()> {
    info!("Repairing and refueling aircraft");
    source.trigger(REPAIR_AND_REFUEL)
}

/// Reposition the aircraft. Only the supplied coordinates are written.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees
/// * `lon` - Longitude in degrees
/// * `alt_above_ground_ft` - Height above ground in feet
pub fn fast_travel(
    source: &mut dyn TelemetrySource,
    lat: Option<f64>,
    lon: Option<f64>,
    alt_above_ground_ft: Option<f64>,
) -> Result<()> {
    info!(
        "Fast travel to lat={:?} lon={:?} agl={:?}",
        lat, lon, alt_above_ground_ft
    );
    for (field, value) in [
        (PLANE_LATITUDE, lat),
        (PLANE_LONGITUDE, lon),
        (PLANE_ALT_ABOVE_GROUND, alt_above_ground_ft),
    ] {
        if let Some(value) = value {
            source.set(field, FieldValue::Number(value))?;
        }
    }
    Ok(())
}

/// Whether both the avionics master and the master battery are on.
///
/// Any other combination, including absent readings, is "off".
pub fn master_systems_on(source: &dyn TelemetrySource) -> Result<bool> {
    let avionics = read_f64(source, AVIONICS_MASTER_SWITCH)?;
    let battery = read_f64(source, ELECTRICAL_MASTER_BATTERY)?;
    Ok(avionics == Some(1.0) && battery == Some(1.0))
}
