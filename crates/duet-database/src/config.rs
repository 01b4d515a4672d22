//! Configuration for file-backed databases

use std::path::PathBuf;

use duet_core::DatabaseId;
use duet_storage::PersistentStorageConfig;

/// Configuration for [`Database::open`](crate::Database::open)
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Base directory for all database data
    pub data_dir: PathBuf,
    /// Identity to use on first open; a reopened database keeps its stored id
    pub database_id: Option<DatabaseId>,
    /// Storage configuration
    pub storage: PersistentStorageConfig,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::with_data_dir("./duet-data")
    }
}

impl DatabaseConfig {
    /// Create a configuration with a custom data directory
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            storage: PersistentStorageConfig::with_base_dir(data_dir.join("storage")),
            data_dir,
            database_id: None,
        }
    }

    /// Set the identity used when the database is first created
    pub fn with_database_id(mut self, database_id: DatabaseId) -> Self {
        self.database_id = Some(database_id);
        self
    }

    /// Set the storage configuration
    pub fn with_storage(mut self, storage: PersistentStorageConfig) -> Self {
        self.storage = storage;
        self
    }
}
