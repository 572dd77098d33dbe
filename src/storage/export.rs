//! # CSV Export
//!
//! Batch conversion of persisted sessions to CSV for analysis tools.
//!
//! Flights become one row per sample (`LOCAL_TIME` first, then the series'
//! field order). Headers become a two-column `FIELD,VALUE` table. Absent
//! values are empty cells. Sessions whose exported file is at least as new
//! as the persisted artifact are skipped; older exports are rewritten.

use std::fs;
use std::path::Path;
use tracing::{debug, info};

use super::store::{ArtifactKind, SessionStore};
use crate::error::Result;
use crate::schema::fields::LOCAL_TIME;
use crate::schema::types::render_value;
use crate::schema::SessionId;

/// Sessions waiting for export, by artifact kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingExports {
    pub flights: Vec<SessionId>,
    pub headers: Vec<SessionId>,
}

impl PendingExports {
    pub fn is_empty(&self) -> bool {
        self.flights.is_empty() && self.headers.is_empty()
    }
}

/// Converts persisted sessions into CSV files under the store's export dir
#[derive(Debug, Clone)]
pub struct Exporter {
    store: SessionStore,
}

impl Exporter {
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    /// Sessions with a persisted artifact that has not been exported yet
    pub fn pending(&self) -> Result<PendingExports> {
        Ok(PendingExports {
            flights: self.store.list_unconverted(ArtifactKind::Series)?,
            headers: self.store.list_unconverted(ArtifactKind::Header)?,
        })
    }

    /// Export one session's sample series.
    ///
    /// # Returns
    ///
    /// `false` if an up to date CSV already existed and nothing was written
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if the session has no sample series
    pub fn export_flight(&self, id: SessionId) -> Result<bool> {
        let path = self.store.exported_path(id, ArtifactKind::Series);
        if self.store.is_exported(id, ArtifactKind::Series)? {
            debug!("Flight {} already exported", id);
            return Ok(false);
        }

        let series = self.store.load_sample_series(id)?;
        let mut columns = Vec::with_capacity(series.fields.len() + 1);
        columns.push(LOCAL_TIME.to_string());
        columns.extend(series.fields.iter().cloned());

        let rows = series.samples.iter().map(|sample| {
            let mut row = Vec::with_capacity(columns.len());
            row.push(sample.local_time.to_string());
            row.extend(
                (0..series.fields.len())
                    .map(|index| render_value(sample.values.get(index).and_then(Option::as_ref), "")),
            );
            row
        });

        write_csv_atomic(&path, &columns, rows)?;
        info!("Exported flight {} ({} samples) to {}", id, series.samples.len(), path.display());
        Ok(true)
    }

    /// Export one session's header.
    ///
    /// # Returns
    ///
    /// `false` if an up to date CSV already existed and nothing was written
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if the session has no header
    pub fn export_header(&self, id: SessionId) -> Result<bool> {
        let path = self.store.exported_path(id, ArtifactKind::Header);
        if self.store.is_exported(id, ArtifactKind::Header)? {
            debug!("Header {} already exported", id);
            return Ok(false);
        }

        let header = self.store.load_header(id)?;
        let rows = header
            .rows_with("")
            .into_iter()
            .map(|(field, value)| vec![field, value]);

        write_csv_atomic(&path, &["FIELD".to_string(), "VALUE".to_string()], rows)?;
        info!("Exported header {} to {}", id, path.display());
        Ok(true)
    }

    /// Export every pending flight, returning the ids written
    pub fn export_all_flights(&self) -> Result<Vec<SessionId>> {
        let mut exported = Vec::new();
        for id in self.store.list_unconverted(ArtifactKind::Series)? {
            if self.export_flight(id)? {
                exported.push(id);
            }
        }
        Ok(exported)
    }

    /// Export every pending header, returning the ids written
    pub fn export_all_headers(&self) -> Result<Vec<SessionId>> {
        let mut exported = Vec::new();
        for id in self.store.list_unconverted(ArtifactKind::Header)? {
            if self.export_header(id)? {
                exported.push(id);
            }
        }
        Ok(exported)
    }
}

fn write_csv_atomic<I>(path: &Path, columns: &[String], rows: I) -> Result<()>
where
    I: IntoIterator<Item = Vec<String>>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp)?;
        writer.write_record(columns)?;
        for row in rows {
            writer.write_record(&row)?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
