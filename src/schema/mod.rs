//! # Sample Schema
//!
//! Defines what "a sample" and "a header" mean for a recorded flight.
//!
//! This module handles:
//! - The fixed, ordered vocabulary of simulator fields
//! - Value, sample and header types as persisted on disk
//! - Session identifiers (`f<N>`)

pub mod fields;
pub mod types;

pub use fields::{HEADER_FIELDS, SAMPLE_FIELDS};
pub use types::{FieldValue, Header, HeaderEntry, Sample, SessionId};
