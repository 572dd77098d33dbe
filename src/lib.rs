//! # Flight Recorder Library
//!
//! Record flight simulator telemetry, one session per flight.
//!
//! This library polls a simulator data interface once per tick, detects when
//! a flight starts and ends, and persists each flight as a header plus a
//! sample series. Persisted sessions can be exported to CSV.

pub mod config;
pub mod error;
pub mod flight;
pub mod local_time;
pub mod recorder;
pub mod schema;
pub mod source;
pub mod storage;
