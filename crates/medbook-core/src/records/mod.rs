//! Typed record operations over the key-value store.
//!
//! Each operation reads the whole collection, edits it and writes it back.

mod doctor;
mod library;
mod patients;
mod visits;

use thiserror::Error;

use crate::models::Record;
use crate::store::{load_collection, save_collection, KeyValueStore, StoreError};

/// Record operation errors.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}

pub type RecordResult<T> = Result<T, RecordError>;

/// Record services bound to a store.
pub struct Records<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> Records<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    fn load<T: Record + serde::de::DeserializeOwned>(&self, key: &str) -> RecordResult<Vec<T>> {
        Ok(load_collection(self.store, key)?)
    }

    fn save<T: Record + serde::Serialize>(&self, key: &str, items: &[T]) -> RecordResult<()> {
        Ok(save_collection(self.store, key, items)?)
    }

    fn get<T>(&self, key: &str, id: &str) -> RecordResult<Option<T>>
    where
        T: Record + serde::de::DeserializeOwned,
    {
        Ok(self
            .load::<T>(key)?
            .into_iter()
            .find(|record| record.id() == id))
    }

    /// Replace the record with the same id.
    fn replace<T>(&self, key: &str, record: T) -> RecordResult<()>
    where
        T: Record + serde::Serialize + serde::de::DeserializeOwned,
    {
        let mut items = self.load::<T>(key)?;
        let slot = items
            .iter_mut()
            .find(|existing| existing.id() == record.id())
            .ok_or_else(|| RecordError::NotFound(record.id().to_string()))?;
        *slot = record;
        self.save(key, &items)
    }

    fn delete<T>(&self, key: &str, id: &str) -> RecordResult<()>
    where
        T: Record + serde::Serialize + serde::de::DeserializeOwned,
    {
        let mut items = self.load::<T>(key)?;
        let before = items.len();
        items.retain(|record| record.id() != id);
        if items.len() == before {
            return Err(RecordError::NotFound(id.to_string()));
        }
        self.save(key, &items)
    }

    /// Append a record, assigning an id when missing or already taken.
    fn append<T>(&self, key: &str, mut record: T) -> RecordResult<T>
    where
        T: Record + Clone + serde::Serialize + serde::de::DeserializeOwned,
    {
        let mut items = self.load::<T>(key)?;
        if record.id().is_empty() || items.iter().any(|r| r.id() == record.id()) {
            record.set_id(uuid::Uuid::new_v4().to_string());
        }
        items.push(record.clone());
        self.save(key, &items)?;
        Ok(record)
    }
}
