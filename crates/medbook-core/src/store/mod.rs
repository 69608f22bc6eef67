//! Key-value storage layer.
//!
//! Every collection lives under a fixed key as a JSON array. Callers read a
//! whole collection, compute the new one and write it back; there are no
//! partial updates.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::{SqliteStore, SCHEMA};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::models::Doctor;

/// Fixed collection keys.
pub mod keys {
    pub const PATIENTS: &str = "patients";
    pub const VISITS: &str = "visits";
    pub const EXAM_REQUESTS: &str = "richiesteEsami";
    pub const DOCUMENTS: &str = "documents";
    pub const TEMPLATES: &str = "templates";
    pub const DOCTOR: &str = "doctor";

    /// All keys owned by the application.
    pub const ALL: [&str; 6] = [PATIENTS, VISITS, EXAM_REQUESTS, DOCUMENTS, TEMPLATES, DOCTOR];
}

/// Storage errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A durable string store.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;
    fn remove(&self, key: &str) -> StoreResult<()>;
    fn clear_all(&self) -> StoreResult<()>;
}

/// Read a collection, treating missing or malformed content as empty.
pub fn load_collection<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> StoreResult<Vec<T>> {
    let Some(raw) = store.get(key)? else {
        return Ok(Vec::new());
    };

    match serde_json::from_str::<Vec<T>>(&raw) {
        Ok(items) => Ok(items),
        Err(e) => {
            tracing::warn!(key, error = %e, "malformed collection in store, treating as empty");
            Ok(Vec::new())
        }
    }
}

/// Write a whole collection.
pub fn save_collection<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    items: &[T],
) -> StoreResult<()> {
    let json = serde_json::to_string(items)?;
    store.set(key, &json)
}

/// Read the doctor record, treating malformed content as absent.
pub fn load_doctor(store: &dyn KeyValueStore) -> StoreResult<Option<Doctor>> {
    let Some(raw) = store.get(keys::DOCTOR)? else {
        return Ok(None);
    };

    match serde_json::from_str::<Option<Doctor>>(&raw) {
        Ok(doctor) => Ok(doctor),
        Err(e) => {
            tracing::warn!(error = %e, "malformed doctor record in store, treating as absent");
            Ok(None)
        }
    }
}

pub fn save_doctor(store: &dyn KeyValueStore, doctor: &Doctor) -> StoreResult<()> {
    let json = serde_json::to_string(doctor)?;
    store.set(keys::DOCTOR, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Patient;

    #[test]
    fn test_missing_collection_is_empty() {
        let store = MemoryStore::new();
        let patients: Vec<Patient> = load_collection(&store, keys::PATIENTS).unwrap();
        assert!(patients.is_empty());
    }

    #[test]
    fn test_malformed_collection_is_empty() {
        let store = MemoryStore::new();
        store.set(keys::PATIENTS, "{not json").unwrap();
        let patients: Vec<Patient> = load_collection(&store, keys::PATIENTS).unwrap();
        assert!(patients.is_empty());

        // Right JSON, wrong shape
        store.set(keys::PATIENTS, r#"{"id":"p1"}"#).unwrap();
        let patients: Vec<Patient> = load_collection(&store, keys::PATIENTS).unwrap();
        assert!(patients.is_empty());
    }

    #[test]
    fn test_collection_roundtrip() {
        let store = MemoryStore::new();
        let patient = Patient::new("Mario", "Rossi");
        save_collection(&store, keys::PATIENTS, std::slice::from_ref(&patient)).unwrap();

        let loaded: Vec<Patient> = load_collection(&store, keys::PATIENTS).unwrap();
        assert_eq!(loaded, vec![patient]);
    }

    #[test]
    fn test_doctor_malformed_or_null() {
        let store = MemoryStore::new();
        assert!(load_doctor(&store).unwrap().is_none());

        store.set(keys::DOCTOR, "null").unwrap();
        assert!(load_doctor(&store).unwrap().is_none());

        store.set(keys::DOCTOR, "[1,2,3]").unwrap();
        assert!(load_doctor(&store).unwrap().is_none());

        save_doctor(&store, &Doctor::placeholder()).unwrap();
        assert!(load_doctor(&store).unwrap().is_some());
    }
}
