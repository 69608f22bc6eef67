//! Backup export and import.
//!
//! ```text
//!   export ─► read 5 collections + doctor ─► ExportSnapshot (lastSync = now)
//!
//!   import(snapshot, Replace) ─► clear all ─► write non-empty collections ─► doctor
//!   import(snapshot, Merge)   ─► read current ─► merge_snapshots ─► write collections ─► doctor
//! ```
//!
//! Writes are not transactional across collections. A merge interrupted by a
//! store failure can be re-run with the same snapshot: every dedupe key is
//! content based, so the retry converges instead of double-applying.

mod merge;
mod snapshot;

pub use merge::*;
pub use snapshot::*;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Doctor;
use crate::store::{
    keys, load_collection, load_doctor, save_collection, save_doctor, KeyValueStore, StoreError,
};

/// Backup errors.
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid backup file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid import mode: {0}")]
    InvalidMode(String),
}

pub type BackupResult<T> = Result<T, BackupError>;

/// How an imported snapshot is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Wipe the store and restore the snapshot as-is
    #[default]
    Replace,
    /// Union with existing data, never deleting anything
    Merge,
}

impl FromStr for ImportMode {
    type Err = BackupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "replace" => Ok(ImportMode::Replace),
            "merge" => Ok(ImportMode::Merge),
            other => Err(BackupError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportMode::Replace => f.write_str("replace"),
            ImportMode::Merge => f.write_str("merge"),
        }
    }
}

/// What an import did to the store.
///
/// A merge drops incoming visits and exam requests whose patient is neither
/// in the store nor in the backup; they are counted in each collection's
/// `orphans`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub mode: ImportMode,
    /// For replace, `added` counts the records written.
    pub collections: MergeReport,
}

/// Export/import manager over a key-value store.
pub struct BackupEngine<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> BackupEngine<'a> {
    /// Create a new backup engine.
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    /// Snapshot the current store. A missing doctor becomes a placeholder.
    pub fn export(&self) -> BackupResult<ExportSnapshot> {
        let mut snapshot = self.read_current()?;
        if snapshot.doctor.is_none() {
            snapshot.doctor = Some(Doctor::placeholder());
        }
        snapshot.last_sync = chrono::Utc::now().to_rfc3339();

        tracing::info!(records = snapshot.record_count(), "exported backup");
        Ok(snapshot)
    }

    /// Snapshot the current store as a backup file.
    pub fn export_json(&self) -> BackupResult<String> {
        Ok(self.export()?.to_json()?)
    }

    /// Apply a snapshot to the store.
    pub fn import(&self, snapshot: &ExportSnapshot, mode: ImportMode) -> BackupResult<ImportReport> {
        tracing::info!(%mode, records = snapshot.record_count(), "importing backup");

        let collections = match mode {
            ImportMode::Replace => self.replace(snapshot)?,
            ImportMode::Merge => self.merge(snapshot)?,
        };

        tracing::info!(
            %mode,
            patients_added = collections.patients.added,
            visits_added = collections.visits.added,
            exam_requests_added = collections.exam_requests.added,
            documents_added = collections.documents.added,
            templates_added = collections.templates.added,
            "import complete"
        );
        Ok(ImportReport { mode, collections })
    }

    /// Parse a backup file and apply it.
    pub fn import_json(&self, json: &str, mode: ImportMode) -> BackupResult<ImportReport> {
        let snapshot = ExportSnapshot::from_json(json)?;
        self.import(&snapshot, mode)
    }

    /// Remove every collection and the doctor record.
    pub fn clear_all(&self) -> BackupResult<()> {
        for key in keys::ALL {
            self.store.remove(key)?;
        }
        Ok(())
    }

    fn read_current(&self) -> BackupResult<ExportSnapshot> {
        Ok(ExportSnapshot {
            patients: load_collection(self.store, keys::PATIENTS)?,
            visits: load_collection(self.store, keys::VISITS)?,
            exam_requests: load_collection(self.store, keys::EXAM_REQUESTS)?,
            documents: load_collection(self.store, keys::DOCUMENTS)?,
            templates: load_collection(self.store, keys::TEMPLATES)?,
            doctor: load_doctor(self.store)?,
            last_sync: String::new(),
        })
    }

    fn replace(&self, snapshot: &ExportSnapshot) -> BackupResult<MergeReport> {
        self.clear_all()?;

        let mut report = MergeReport::default();
        report.patients.added = self.write_if_any(keys::PATIENTS, &snapshot.patients)?;
        report.visits.added = self.write_if_any(keys::VISITS, &snapshot.visits)?;
        report.exam_requests.added =
            self.write_if_any(keys::EXAM_REQUESTS, &snapshot.exam_requests)?;
        report.documents.added = self.write_if_any(keys::DOCUMENTS, &snapshot.documents)?;
        report.templates.added = self.write_if_any(keys::TEMPLATES, &snapshot.templates)?;

        if let Some(doctor) = &snapshot.doctor {
            save_doctor(self.store, doctor)?;
            report.doctor_updated = true;
        }
        Ok(report)
    }

    fn write_if_any<T: Serialize>(&self, key: &str, items: &[T]) -> BackupResult<usize> {
        if !items.is_empty() {
            save_collection(self.store, key, items)?;
        }
        Ok(items.len())
    }

    fn merge(&self, snapshot: &ExportSnapshot) -> BackupResult<MergeReport> {
        let current = self.read_current()?;
        let MergeOutcome { merged, report } = merge_snapshots(&current, snapshot);

        save_collection(self.store, keys::PATIENTS, &merged.patients)?;
        save_collection(self.store, keys::VISITS, &merged.visits)?;
        save_collection(self.store, keys::EXAM_REQUESTS, &merged.exam_requests)?;
        save_collection(self.store, keys::DOCUMENTS, &merged.documents)?;
        save_collection(self.store, keys::TEMPLATES, &merged.templates)?;

        if report.doctor_updated {
            if let Some(doctor) = &merged.doctor {
                save_doctor(self.store, doctor)?;
            }
        }

        let dropped = report.visits.orphans + report.exam_requests.orphans;
        if dropped > 0 {
            tracing::warn!(dropped, "dropped incoming records referencing unknown patients");
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Patient, Visit};
    use crate::store::MemoryStore;

    #[test]
    fn test_import_mode_parsing() {
        assert_eq!("merge".parse::<ImportMode>().unwrap(), ImportMode::Merge);
        assert_eq!(" Replace ".parse::<ImportMode>().unwrap(), ImportMode::Replace);
        assert!("upsert".parse::<ImportMode>().is_err());
        assert_eq!(ImportMode::default(), ImportMode::Replace);
        assert_eq!(ImportMode::Merge.to_string(), "merge");
    }

    #[test]
    fn test_export_empty_store_has_placeholder_doctor() {
        let store = MemoryStore::new();
        let engine = BackupEngine::new(&store);

        let snapshot = engine.export().unwrap();
        assert_eq!(snapshot.record_count(), 0);
        let doctor = snapshot.doctor.unwrap();
        assert_eq!(doctor.id, crate::models::PLACEHOLDER_DOCTOR_ID);
        assert!(!snapshot.last_sync.is_empty());

        // Export never writes
        assert_eq!(store.get(keys::DOCTOR).unwrap(), None);
    }

    #[test]
    fn test_clear_all_removes_every_key() {
        let store = MemoryStore::new();
        for key in keys::ALL {
            store.set(key, "[]").unwrap();
        }
        store.set("unrelated", "keep").unwrap();

        BackupEngine::new(&store).clear_all().unwrap();

        for key in keys::ALL {
            assert_eq!(store.get(key).unwrap(), None);
        }
        assert_eq!(store.get("unrelated").unwrap(), Some("keep".into()));
    }

    #[test]
    fn test_replace_report_counts() {
        let store = MemoryStore::new();
        let engine = BackupEngine::new(&store);

        let patient = Patient::new("Mario", "Rossi");
        let snapshot = ExportSnapshot {
            visits: vec![Visit::new(patient.id.clone(), "2024-01-01")],
            patients: vec![patient],
            ..Default::default()
        };

        let report = engine.import(&snapshot, ImportMode::Replace).unwrap();
        assert_eq!(report.mode, ImportMode::Replace);
        assert_eq!(report.collections.patients.added, 1);
        assert_eq!(report.collections.visits.added, 1);
        assert!(!report.collections.doctor_updated);
    }

    #[test]
    fn test_import_json_rejects_garbage() {
        let store = MemoryStore::new();
        let engine = BackupEngine::new(&store);

        let err = engine.import_json("not a backup", ImportMode::Merge).unwrap_err();
        assert!(matches!(err, BackupError::Json(_)));
    }
}
