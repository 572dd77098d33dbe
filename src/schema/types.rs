//! # Recording Data Types
//!
//! Values, samples, headers and session identifiers as persisted on disk.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::fields::{sample_field_index, LOCAL_TIME, SESSION_ID_KEY};
use crate::error::RecorderError;

/// Display text for an absent value
pub const ABSENT: &str = "absent";

/// A single simulator reading.
///
/// Serialized untagged so session files read as plain JSON values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Wrap a number, treating NaN and infinities as absent.
    pub fn number(value: f64) -> Option<Self> {
        value.is_finite().then_some(FieldValue::Number(value))
    }

    /// Numeric view of the value. Flags read as 0.0 / 1.0.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(value) => Some(*value),
            FieldValue::Flag(flag) => Some(if *flag { 1.0 } else { 0.0 }),
            FieldValue::Text(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Flag(flag) => write!(f, "{}", flag),
            FieldValue::Number(value) => write!(f, "{}", value),
            FieldValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(flag: bool) -> Self {
        FieldValue::Flag(flag)
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        FieldValue::Text(text)
    }
}

/// Render an optional value, writing `absent` in place of a missing one.
pub fn render_value(value: Option<&FieldValue>, absent: &str) -> String {
    value.map_or_else(|| absent.to_string(), ToString::to_string)
}

/// Session identifier, rendered as `f<N>`.
///
/// Ids are allocated as one more than the highest id found on disk, so they
/// only ever grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(u32);

impl SessionId {
    /// Id handed out when no session exists yet
    pub const BASE: SessionId = SessionId(0);

    pub fn new(number: u32) -> Self {
        SessionId(number)
    }

    pub fn number(&self) -> u32 {
        self.0
    }

    /// The id allocated after this one.
    pub fn next(&self) -> Self {
        SessionId(self.0.saturating_add(1))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = RecorderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix('f')
            .filter(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| RecorderError::InvalidSessionId(s.to_string()))?;

        digits
            .parse()
            .map(SessionId)
            .map_err(|_| RecorderError::InvalidSessionId(s.to_string()))
    }
}

impl TryFrom<String> for SessionId {
    type Error = RecorderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.to_string()
    }
}

/// One poll of every sample field at a single instant.
///
/// `values` is aligned with [`SAMPLE_FIELDS`](super::fields::SAMPLE_FIELDS);
/// `None` marks a field the provider had no value for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub local_time: NaiveDateTime,
    pub values: Vec<Option<FieldValue>>,
}

impl Sample {
    /// Value of a sample field by name
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        sample_field_index(field)
            .and_then(|index| self.values.get(index))
            .and_then(Option::as_ref)
    }
}

/// A named header value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderEntry {
    pub name: String,
    pub value: Option<FieldValue>,
}

/// Snapshot of slow-changing flight context captured once at session start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub session_id: SessionId,
    pub local_time: NaiveDateTime,
    pub entries: Vec<HeaderEntry>,
}

impl Header {
    /// Value of a header entry by key
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .and_then(|entry| entry.value.as_ref())
    }

    /// Every header row as `(key, display value)`, local time and session id first.
    pub fn rows(&self) -> Vec<(String, String)> {
        self.rows_with(ABSENT)
    }

    /// Like [`Header::rows`], with a custom marker for absent values.
    pub fn rows_with(&self, absent: &str) -> Vec<(String, String)> {
        let mut rows = Vec::with_capacity(self.entries.len() + 2);
        rows.push((LOCAL_TIME.to_string(), self.local_time.to_string()));
        rows.push((SESSION_ID_KEY.to_string(), self.session_id.to_string()));
        rows.extend(
            self.entries
                .iter()
                .map(|entry| (entry.name.clone(), render_value(entry.value.as_ref(), absent))),
        );
        rows
    }
}
