//! # Session Store
//!
//! Owns the on-disk session layout:
//!
//! ```text
//! <data_dir>/
//! └── f<N>/
//!     ├── f<N>_Flight_Header.json
//!     └── f<N>.json
//! <export_dir>/
//! ├── flight_data/f<N>.csv
//! └── flight_headers/f<N>_Flight_Header.csv
//! ```
//!
//! Artifacts are written to a `.tmp` sibling, synced and renamed into place,
//! so a crash leaves either the previous checkpoint or the new one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

use crate::error::{RecorderError, Result};
use crate::schema::{Header, Sample, SessionId, SAMPLE_FIELDS};

const HEADER_SUFFIX: &str = "_Flight_Header";
const FLIGHT_DATA_DIR: &str = "flight_data";
const FLIGHT_HEADERS_DIR: &str = "flight_headers";

/// The two artifacts every complete session has
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Header,
    Series,
}

impl ArtifactKind {
    fn file_stem(&self, id: SessionId) -> String {
        match self {
            ArtifactKind::Header => format!("{}{}", id, HEADER_SUFFIX),
            ArtifactKind::Series => id.to_string(),
        }
    }

    fn export_dir_name(&self) -> &'static str {
        match self {
            ArtifactKind::Header => FLIGHT_HEADERS_DIR,
            ArtifactKind::Series => FLIGHT_DATA_DIR,
        }
    }

    /// Inverse of `file_stem`
    fn parse_stem(&self, stem: &str) -> Option<SessionId> {
        let id = match self {
            ArtifactKind::Header => stem.strip_suffix(HEADER_SUFFIX)?,
            ArtifactKind::Series => stem,
        };
        id.parse().ok()
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Header => write!(f, "header"),
            ArtifactKind::Series => write!(f, "sample series"),
        }
    }
}

/// Persisted sample series: the column order plus every sample so far
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SampleSeries {
    pub session_id: SessionId,
    pub fields: Vec<String>,
    pub samples: Vec<Sample>,
}

#[derive(Serialize)]
struct SeriesRef<'a> {
    session_id: SessionId,
    fields: &'a [&'a str],
    samples: &'a [Sample],
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer(&mut writer, value)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// File-system backed session repository
#[derive(Debug, Clone)]
pub struct SessionStore {
    data_dir: PathBuf,
    export_dir: PathBuf,
}

impl SessionStore {
    /// Open the store, creating the data directory if needed.
    ///
    /// # Errors
    ///
    /// Returns error if the data directory cannot be created
    pub fn open<P: Into<PathBuf>, Q: Into<PathBuf>>(data_dir: P, export_dir: Q) -> Result<Self> {
        let store = Self {
            data_dir: data_dir.into(),
            export_dir: export_dir.into(),
        };
        fs::create_dir_all(&store.data_dir)?;
        debug!("Session store at {}", store.data_dir.display());
        Ok(store)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    pub fn session_dir(&self, id: SessionId) -> PathBuf {
        self.data_dir.join(id.to_string())
    }

    pub fn artifact_path(&self, id: SessionId, kind: ArtifactKind) -> PathBuf {
        self.session_dir(id).join(format!("{}.json", kind.file_stem(id)))
    }

    pub fn header_path(&self, id: SessionId) -> PathBuf {
        self.artifact_path(id, ArtifactKind::Header)
    }

    pub fn series_path(&self, id: SessionId) -> PathBuf {
        self.artifact_path(id, ArtifactKind::Series)
    }

    /// Where the exported CSV for `id` lives (or will live)
    pub fn exported_path(&self, id: SessionId, kind: ArtifactKind) -> PathBuf {
        self.export_dir
            .join(kind.export_dir_name())
            .join(format!("{}.csv", kind.file_stem(id)))
    }

    /// Every session directory on disk, in ascending id order.
    ///
    /// Entries whose name is not a session id are ignored.
    pub fn session_ids(&self) -> Result<Vec<SessionId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.data_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(id) = entry.file_name().to_str().and_then(|name| name.parse().ok()) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// One greater than the highest id on disk, or [`SessionId::BASE`].
    pub fn next_id(&self) -> Result<SessionId> {
        Ok(self
            .session_ids()?
            .last()
            .map_or(SessionId::BASE, SessionId::next))
    }

    /// Allocate an empty session directory.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if the directory is already present
    pub fn create(&self, id: SessionId) -> Result<()> {
        match fs::create_dir(self.session_dir(id)) {
            Ok(()) => {
                info!("Created session {} at {}", id, self.session_dir(id).display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(RecorderError::AlreadyExists(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist the header. Callers write it exactly once per session.
    pub fn write_header(&self, id: SessionId, header: &Header) -> Result<()> {
        write_json_atomic(&self.header_path(id), header)?;
        debug!("Wrote header for {}", id);
        Ok(())
    }

    /// Load a persisted header.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if the header artifact is missing
    pub fn load_header(&self, id: SessionId) -> Result<Header> {
        let bytes = read_artifact(&self.header_path(id), id)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Checkpoint the full accumulated series, replacing the previous one.
    pub fn append_sample_series(&self, id: SessionId, samples: &[Sample]) -> Result<()> {
        let series = SeriesRef {
            session_id: id,
            fields: SAMPLE_FIELDS,
            samples,
        };
        write_json_atomic(&self.series_path(id), &series)
    }

    /// Load a persisted sample series.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if the series artifact is missing
    pub fn load_sample_series(&self, id: SessionId) -> Result<SampleSeries> {
        let bytes = read_artifact(&self.series_path(id), id)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn has_artifact(&self, id: SessionId, kind: ArtifactKind) -> bool {
        self.artifact_path(id, kind).is_file()
    }

    /// Discard the most recent session if it is incomplete.
    ///
    /// Only the highest id is inspected. A session missing its header or
    /// its sample series never finished starting and is deleted, along with
    /// any CSV left over from an earlier session under the same id.
    /// Header-only sessions (a flight that ended before its first sample)
    /// are deleted on purpose.
    ///
    /// # Returns
    ///
    /// The id of the deleted session, if any
    pub fn validate_and_repair(&self) -> Result<Option<SessionId>> {
        let Some(&latest) = self.session_ids()?.last() else {
            return Ok(None);
        };

        let missing: Vec<_> = [ArtifactKind::Header, ArtifactKind::Series]
            .into_iter()
            .filter(|&kind| !self.has_artifact(latest, kind))
            .collect();
        if missing.is_empty() {
            return Ok(None);
        }

        warn!(
            "Removing incomplete session {} (missing {:?})",
            latest, missing
        );
        fs::remove_dir_all(self.session_dir(latest))?;
        // The id is reused next, so exports of the old session must not shadow it
        for kind in [ArtifactKind::Header, ArtifactKind::Series] {
            remove_if_present(&self.exported_path(latest, kind))?;
        }
        Ok(Some(latest))
    }

    /// Whether `id` has an export of `kind` at least as new as its artifact.
    ///
    /// A CSV older than the artifact it came from is stale. An export whose
    /// artifact is gone counts as exported.
    pub fn is_exported(&self, id: SessionId, kind: ArtifactKind) -> Result<bool> {
        let Some(exported) = modified_time(&self.exported_path(id, kind))? else {
            return Ok(false);
        };
        match modified_time(&self.artifact_path(id, kind))? {
            Some(artifact) if artifact > exported => {
                debug!("Stale {} export for {}", kind, id);
                Ok(false)
            }
            _ => Ok(true),
        }
    }

    /// Sessions holding a persisted artifact of `kind`
    pub fn persisted_ids(&self, kind: ArtifactKind) -> Result<BTreeSet<SessionId>> {
        Ok(self
            .session_ids()?
            .into_iter()
            .filter(|&id| self.has_artifact(id, kind))
            .collect())
    }

    /// Sessions with an up to date export of `kind`
    pub fn exported_ids(&self, kind: ArtifactKind) -> Result<BTreeSet<SessionId>> {
        let dir = self.export_dir.join(kind.export_dir_name());
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = BTreeSet::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("csv") {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| kind.parse_stem(stem))
            {
                if self.is_exported(id, kind)? {
                    ids.insert(id);
                }
            }
        }
        Ok(ids)
    }

    /// Persisted sessions of `kind` with no up to date export, ascending.
    pub fn list_unconverted(&self, kind: ArtifactKind) -> Result<Vec<SessionId>> {
        let exported = self.exported_ids(kind)?;
        Ok(self
            .persisted_ids(kind)?
            .difference(&exported)
            .copied()
            .collect())
    }
}

fn modified_time(path: &Path) -> Result<Option<SystemTime>> {
    match fs::metadata(path) {
        Ok(metadata) => Ok(Some(metadata.modified()?)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            info!("Removed stale export {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn read_artifact(path: &Path, id: SessionId) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => RecorderError::SessionNotFound(id),
        _ => e.into(),
    })
}
