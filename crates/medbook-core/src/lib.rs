//! Medbook Core Library
//!
//! Local-first data core for a medical practice: patients, visits, exam
//! requests, documents, templates and the doctor profile, kept in a simple
//! key-value store, plus backup export and import.
//!
//! # Architecture
//!
//! ```text
//!            UI shell (Swift / Kotlin / desktop)
//!                         │  FFI (uniffi)
//!                         ▼
//!                   ┌─────────────┐
//!                   │ MedbookCore │
//!                   └──────┬──────┘
//!              ┌───────────┴────────────┐
//!              ▼                        ▼
//!          Records                BackupEngine
//!     (typed CRUD, validation)   (export, replace, merge)
//!              └───────────┬────────────┘
//!                          ▼
//!                  dyn KeyValueStore
//!              ┌───────────┴────────────┐
//!              ▼                        ▼
//!        MemoryStore               SqliteStore
//!     (map, optional JSON file)   (kv_store table)
//! ```
//!
//! # Modules
//!
//! - [`store`]: key-value contract, backends and defensive collection decoding
//! - [`models`]: domain types (Patient, Visit, ExamRequest, Document, ...)
//! - [`records`]: typed record operations with validation
//! - [`backup`]: snapshot export and replace/merge import
//! - [`config`]: backend selection

pub mod backup;
pub mod config;
pub mod models;
pub mod records;
pub mod store;

// Re-export commonly used types
pub use backup::{BackupEngine, ExportSnapshot, ImportMode, ImportReport, MergeReport};
pub use config::{StoreBackend, StoreConfig};
pub use models::{
    ambulatory_content_key, Ambulatory, Doctor, Document, DocumentCategory, ExamRequest, Patient,
    Template, Visit,
};
pub use records::Records;
pub use store::{KeyValueStore, MemoryStore, SqliteStore};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum MedbookError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<store::StoreError> for MedbookError {
    fn from(e: store::StoreError) -> Self {
        MedbookError::StorageError(e.to_string())
    }
}

impl From<records::RecordError> for MedbookError {
    fn from(e: records::RecordError) -> Self {
        match e {
            records::RecordError::Store(e) => e.into(),
            records::RecordError::NotFound(id) => MedbookError::NotFound(id),
            records::RecordError::Validation(msg) => MedbookError::InvalidInput(msg),
        }
    }
}

impl From<backup::BackupError> for MedbookError {
    fn from(e: backup::BackupError) -> Self {
        match e {
            backup::BackupError::Store(e) => e.into(),
            backup::BackupError::Json(e) => MedbookError::SerializationError(e.to_string()),
            backup::BackupError::InvalidMode(mode) => MedbookError::InvalidInput(mode),
        }
    }
}

impl From<config::ConfigError> for MedbookError {
    fn from(e: config::ConfigError) -> Self {
        MedbookError::ConfigError(e.to_string())
    }
}

impl From<serde_json::Error> for MedbookError {
    fn from(e: serde_json::Error) -> Self {
        MedbookError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for MedbookError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        MedbookError::StorageError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open a store by backend name ("memory", "file", "sqlite") and path.
#[uniffi::export]
pub fn open_core(backend: String, path: Option<String>) -> Result<Arc<MedbookCore>, MedbookError> {
    let config = StoreConfig::from_parts(&backend, path.map(PathBuf::from))?;
    MedbookCore::open(&config)
}

/// Open the store described by MEDBOOK_STORE / MEDBOOK_DATA_PATH.
#[uniffi::export]
pub fn open_core_from_env() -> Result<Arc<MedbookCore>, MedbookError> {
    let config = StoreConfig::from_env()?;
    MedbookCore::open(&config)
}

/// Create an in-memory store (for testing).
#[uniffi::export]
pub fn open_core_in_memory() -> Result<Arc<MedbookCore>, MedbookError> {
    MedbookCore::open(&StoreConfig::default())
}

/// Install a stderr log subscriber. Returns false if one was already set.
#[uniffi::export]
pub fn init_logging(filter: Option<String>) -> bool {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = filter
        .and_then(|f| EnvFilter::try_new(f).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("medbook_core=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .is_ok()
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe store wrapper for FFI.
#[derive(uniffi::Object)]
pub struct MedbookCore {
    store: Arc<Mutex<Box<dyn KeyValueStore>>>,
}

impl MedbookCore {
    fn open(config: &StoreConfig) -> Result<Arc<Self>, MedbookError> {
        let store = config.open()?;
        Ok(Arc::new(Self {
            store: Arc::new(Mutex::new(store)),
        }))
    }
}

#[uniffi::export]
impl MedbookCore {
    // =========================================================================
    // Backup Operations
    // =========================================================================

    /// Export every collection as a backup file (JSON).
    pub fn export_backup(&self) -> Result<String, MedbookError> {
        let store = self.store.lock()?;
        let engine = BackupEngine::new(&**store);
        Ok(engine.export_json()?)
    }

    /// Import a backup file (JSON).
    pub fn import_backup(
        &self,
        json: String,
        mode: FfiImportMode,
    ) -> Result<FfiImportReport, MedbookError> {
        let store = self.store.lock()?;
        let engine = BackupEngine::new(&**store);
        let report = engine.import_json(&json, mode.into())?;
        Ok(report.into())
    }

    /// Delete all data.
    pub fn clear_all(&self) -> Result<(), MedbookError> {
        let store = self.store.lock()?;
        BackupEngine::new(&**store).clear_all()?;
        Ok(())
    }

    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// List all patients.
    pub fn list_patients(&self) -> Result<Vec<FfiPatient>, MedbookError> {
        let store = self.store.lock()?;
        let patients = Records::new(&**store).list_patients()?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }

    /// Search patients by name, surname or fiscal code.
    pub fn search_patients(
        &self,
        query: String,
        limit: u32,
    ) -> Result<Vec<FfiPatient>, MedbookError> {
        let store = self.store.lock()?;
        let patients = Records::new(&**store).search_patients(&query, limit as usize)?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }

    /// Get a patient by id.
    pub fn get_patient(&self, id: String) -> Result<Option<FfiPatient>, MedbookError> {
        let store = self.store.lock()?;
        let patient = Records::new(&**store).get_patient(&id)?;
        Ok(patient.map(|p| p.into()))
    }

    /// Delete a patient and their visits and exam requests.
    pub fn delete_patient(&self, id: String) -> Result<(), MedbookError> {
        let store = self.store.lock()?;
        Records::new(&**store).delete_patient(&id)?;
        Ok(())
    }

    // =========================================================================
    // Doctor Operations
    // =========================================================================

    /// Doctor profile as JSON, if one has been saved.
    pub fn get_doctor_json(&self) -> Result<Option<String>, MedbookError> {
        let store = self.store.lock()?;
        let doctor = Records::new(&**store).get_doctor()?;
        Ok(doctor.map(|d| serde_json::to_string(&d)).transpose()?)
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe import mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiImportMode {
    Replace,
    Merge,
}

impl From<FfiImportMode> for ImportMode {
    fn from(mode: FfiImportMode) -> Self {
        match mode {
            FfiImportMode::Replace => ImportMode::Replace,
            FfiImportMode::Merge => ImportMode::Merge,
        }
    }
}

/// FFI-safe per-collection import counters.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCollectionReport {
    pub added: u32,
    pub duplicates: u32,
    pub orphans: u32,
    pub reassigned_ids: u32,
}

impl From<backup::CollectionReport> for FfiCollectionReport {
    fn from(report: backup::CollectionReport) -> Self {
        Self {
            added: report.added as u32,
            duplicates: report.duplicates as u32,
            orphans: report.orphans as u32,
            reassigned_ids: report.reassigned_ids as u32,
        }
    }
}

/// FFI-safe import report.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiImportReport {
    pub merged: bool,
    pub patients: FfiCollectionReport,
    pub visits: FfiCollectionReport,
    pub exam_requests: FfiCollectionReport,
    pub documents: FfiCollectionReport,
    pub templates: FfiCollectionReport,
    pub doctor_updated: bool,
}

impl From<ImportReport> for FfiImportReport {
    fn from(report: ImportReport) -> Self {
        let collections = report.collections;
        Self {
            merged: report.mode == ImportMode::Merge,
            patients: collections.patients.into(),
            visits: collections.visits.into(),
            exam_requests: collections.exam_requests.into(),
            documents: collections.documents.into(),
            templates: collections.templates.into(),
            doctor_updated: collections.doctor_updated,
        }
    }
}

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: String,
    pub fiscal_code: Option<String>,
    pub name: String,
    pub surname: String,
    pub birth_date: String,
    pub birthplace: String,
    pub sex: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl From<Patient> for FfiPatient {
    fn from(patient: Patient) -> Self {
        Self {
            id: patient.id,
            fiscal_code: patient.fiscal_code,
            name: patient.name,
            surname: patient.surname,
            birth_date: patient.birth_date,
            birthplace: patient.birthplace,
            sex: patient.sex,
            phone: patient.phone,
            email: patient.email,
        }
    }
}
