//! # Field Vocabulary
//!
//! Simulator variable names recorded per sample and per header.
//!
//! Engine channels are indexed `:1` to `:4`. Aircraft with fewer engines
//! report the missing channels as absent.

/// Column name of the resolved local timestamp (first column of every sample)
pub const LOCAL_TIME: &str = "LOCAL_TIME";

/// Header entry holding the session id
pub const SESSION_ID_KEY: &str = "ANG_FLIGHT_NUMBER";

/// Latitude in degrees; north positive
pub const PLANE_LATITUDE: &str = "PLANE_LATITUDE";
/// Longitude in degrees; east positive
pub const PLANE_LONGITUDE: &str = "PLANE_LONGITUDE";
/// Altitude in feet above sea level
pub const PLANE_ALTITUDE: &str = "PLANE_ALTITUDE";

/// Avionics master switch (1.0 = on)
pub const AVIONICS_MASTER_SWITCH: &str = "AVIONICS_MASTER_SWITCH";
/// Master battery switch (1.0 = on)
pub const ELECTRICAL_MASTER_BATTERY: &str = "ELECTRICAL_MASTER_BATTERY";

/// Fields polled on every tick, in column order.
pub const SAMPLE_FIELDS: &[&str] = &[
    PLANE_LATITUDE,
    PLANE_LONGITUDE,
    PLANE_ALTITUDE,
    "PLANE_ALT_ABOVE_GROUND",
    "AMBIENT_WIND_VELOCITY",
    "AMBIENT_WIND_DIRECTION",
    "AMBIENT_WIND_X",
    "AMBIENT_WIND_Y",
    "AMBIENT_WIND_Z",
    "AIRCRAFT_WIND_X",
    "AIRCRAFT_WIND_Y",
    "AIRCRAFT_WIND_Z",
    "AMBIENT_VISIBILITY",
    "AMBIENT_TEMPERATURE",
    "BAROMETER_PRESSURE",
    "AILERON_LEFT_DEFLECTION",
    "AILERON_RIGHT_DEFLECTION",
    "ANGLE_OF_ATTACK_INDICATOR",
    "AIRSPEED_TRUE",
    "GROUND_VELOCITY",
    "GPS_WP_TRUE_BEARING",
    "GPS_WP_DISTANCE",
    "ELEVATOR_TRIM_POSITION",
    "FLAPS_HANDLE_PERCENT",
    "HEADING_INDICATOR",
    "PLANE_PITCH_DEGREES",
    "PLANE_BANK_DEGREES",
    "RUDDER_POSITION",
    "VERTICAL_SPEED",
    "G_FORCE",
    "FUEL_TOTAL_QUANTITY",
    "GENERAL_ENG_THROTTLE_LEVER_POSITION:1",
    "GENERAL_ENG_THROTTLE_LEVER_POSITION:2",
    "GENERAL_ENG_THROTTLE_LEVER_POSITION:3",
    "GENERAL_ENG_THROTTLE_LEVER_POSITION:4",
    "PROP_THRUST:1",
    "PROP_THRUST:2",
    "PROP_THRUST:3",
    "PROP_THRUST:4",
    "GENERAL_ENG_EXHAUST_GAS_TEMPERATURE:1",
    "GENERAL_ENG_EXHAUST_GAS_TEMPERATURE:2",
    "GENERAL_ENG_EXHAUST_GAS_TEMPERATURE:3",
    "GENERAL_ENG_EXHAUST_GAS_TEMPERATURE:4",
    "GENERAL_ENG_FUEL_PRESSURE:1",
    "GENERAL_ENG_FUEL_PRESSURE:2",
    "GENERAL_ENG_FUEL_PRESSURE:3",
    "GENERAL_ENG_FUEL_PRESSURE:4",
    "ENG_FUEL_FLOW_GPH:1",
    "ENG_FUEL_FLOW_GPH:2",
    "ENG_FUEL_FLOW_GPH:3",
    "ENG_FUEL_FLOW_GPH:4",
    "TURB_ENG_VIBRATION:1",
    "TURB_ENG_VIBRATION:2",
    "TURB_ENG_VIBRATION:3",
    "TURB_ENG_VIBRATION:4",
    "GENERAL_ENG_OIL_PRESSURE:1",
    "GENERAL_ENG_OIL_PRESSURE:2",
    "GENERAL_ENG_OIL_PRESSURE:3",
    "GENERAL_ENG_OIL_PRESSURE:4",
    "GENERAL_ENG_RPM:1",
    "GENERAL_ENG_RPM:2",
    "GENERAL_ENG_RPM:3",
    "GENERAL_ENG_RPM:4",
    "FUEL_TANK_RIGHT_MAIN_QUANTITY",
    "FUEL_TANK_LEFT_MAIN_QUANTITY",
    "FUEL_TOTAL_QUANTITY_WEIGHT",
    "STALL_WARNING",
    "OVERSPEED_WARNING",
];

/// Header entries captured once at flight start, as `(header key, simulator field)`.
///
/// Destination entries are read from the next GPS waypoint.
pub const HEADER_FIELDS: &[(&str, &str)] = &[
    ("ATC_FLIGHT_NUMBER", "ATC_FLIGHT_NUMBER"),
    ("ATC_TYPE", "ATC_TYPE"),
    ("ATC_MODEL", "ATC_MODEL"),
    ("TOTAL_WEIGHT", "TOTAL_WEIGHT"),
    ("ENGINE_TYPE", "ENGINE_TYPE"),
    ("NUMBER_OF_ENGINES", "NUMBER_OF_ENGINES"),
    (PLANE_LATITUDE, PLANE_LATITUDE),
    (PLANE_LONGITUDE, PLANE_LONGITUDE),
    (PLANE_ALTITUDE, PLANE_ALTITUDE),
    ("PLANE_ALT_ABOVE_GROUND", "PLANE_ALT_ABOVE_GROUND"),
    ("DESTINATION_LAT", "GPS_WP_NEXT_LAT"),
    ("DESTINATION_LON", "GPS_WP_NEXT_LON"),
    ("DESTINATION_ALT", "GPS_WP_NEXT_ALT"),
    ("FUEL_TOTAL_QUANTITY", "FUEL_TOTAL_QUANTITY"),
];

/// Position of `field` within [`SAMPLE_FIELDS`].
pub fn sample_field_index(field: &str) -> Option<usize> {
    SAMPLE_FIELDS.iter().position(|&name| name == field)
}
