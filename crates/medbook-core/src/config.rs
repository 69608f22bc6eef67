//! Store configuration.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::store::{KeyValueStore, MemoryStore, SqliteStore, StoreError};

/// Environment variable selecting the backend.
pub const STORE_ENV: &str = "MEDBOOK_STORE";
/// Environment variable holding the data file path.
pub const DATA_PATH_ENV: &str = "MEDBOOK_DATA_PATH";

/// Which key-value backend to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Volatile in-process map
    Memory,
    /// In-process map persisted to a JSON file
    File(PathBuf),
    /// Native SQLite key-value table
    Sqlite(PathBuf),
}

/// Store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

impl StoreConfig {
    pub fn new(backend: StoreBackend) -> Self {
        Self { backend }
    }

    /// Build from a backend name and optional path.
    pub fn from_parts(backend: &str, path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let backend = match backend.parse::<BackendKind>()? {
            BackendKind::Memory => StoreBackend::Memory,
            BackendKind::File => StoreBackend::File(path.ok_or(ConfigError::MissingDataPath)?),
            BackendKind::Sqlite => StoreBackend::Sqlite(path.ok_or(ConfigError::MissingDataPath)?),
        };
        Ok(Self { backend })
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend = env::var(STORE_ENV).unwrap_or_else(|_| "memory".to_string());
        let path = env::var(DATA_PATH_ENV)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        Self::from_parts(&backend, path)
    }

    /// Open the configured store.
    pub fn open(&self) -> Result<Box<dyn KeyValueStore>, ConfigError> {
        let store: Box<dyn KeyValueStore> = match &self.backend {
            StoreBackend::Memory => Box::new(MemoryStore::new()),
            StoreBackend::File(path) => Box::new(MemoryStore::open(path)?),
            StoreBackend::Sqlite(path) => Box::new(SqliteStore::open(path)?),
        };
        Ok(store)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(StoreBackend::Memory)
    }
}

enum BackendKind {
    Memory,
    File,
    Sqlite,
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "file" => Ok(BackendKind::File),
            "sqlite" => Ok(BackendKind::Sqlite),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown store backend: {0} (expected memory, file or sqlite)")]
    UnknownBackend(String),

    #[error("MEDBOOK_DATA_PATH is required for file and sqlite stores")]
    MissingDataPath,

    #[error("Failed to open store: {0}")]
    Store(#[from] StoreError),
}
