//! # Storage Module
//!
//! Session persistence and export.
//!
//! This module handles:
//! - Allocating session ids and directories
//! - Atomic header and sample-series checkpoints
//! - Startup repair of an incomplete latest session
//! - Batch CSV export of sessions not yet converted

pub mod export;
pub mod store;

pub use export::{Exporter, PendingExports};
pub use store::{ArtifactKind, SampleSeries, SessionStore};
