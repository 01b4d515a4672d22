//! redb table definitions and storage manager

use std::path::PathBuf;
use std::sync::Arc;

use duet_core::StorageError;
use redb::{Database, TableDefinition};
use tracing::{debug, info, instrument};

/// Type alias for scan results
pub type ScanResults = Vec<(Vec<u8>, Vec<u8>)>;

// Key: direction byte followed by remote database id, Value: change id string
pub const TRANSFER_LOG: TableDefinition<&[u8], &[u8]> = TableDefinition::new("transfer_log");

// Key: metadata name, Value: raw bytes
pub const META: TableDefinition<&[u8], &[u8]> = TableDefinition::new("meta");

fn database_error(err: impl std::fmt::Display) -> StorageError {
    StorageError::database(err.to_string())
}

/// Configuration for redb storage
#[derive(Debug, Clone)]
pub struct RedbStorageConfig {
    /// Path to the database file
    pub db_path: PathBuf,
}

impl Default for RedbStorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/duet.redb"),
        }
    }
}

/// redb storage manager
pub struct RedbStorage {
    db: Arc<Database>,
    config: RedbStorageConfig,
}

impl RedbStorage {
    /// Open or create the database
    #[instrument(skip(config), fields(path = %config.db_path.display()))]
    pub fn open(config: RedbStorageConfig) -> Result<Self, StorageError> {
        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(&config.db_path).map_err(database_error)?;

        info!("Opened redb database");

        let storage = Self {
            db: Arc::new(db),
            config,
        };
        storage.init_tables()?;

        Ok(storage)
    }

    fn init_tables(&self) -> Result<(), StorageError> {
        let write_txn = self.db.begin_write().map_err(database_error)?;
        write_txn.open_table(TRANSFER_LOG).map_err(database_error)?;
        write_txn.open_table(META).map_err(database_error)?;
        write_txn.commit().map_err(database_error)?;

        debug!("Initialized redb tables");
        Ok(())
    }

    pub fn config(&self) -> &RedbStorageConfig {
        &self.config
    }

    /// Put a key-value pair in a table
    pub fn put(
        &self,
        table: TableDefinition<&[u8], &[u8]>,
        key: &[u8],
        value: &[u8],
    ) -> Result<(), StorageError> {
        let write_txn = self.db.begin_write().map_err(database_error)?;
        {
            let mut table = write_txn.open_table(table).map_err(database_error)?;
            table.insert(key, value).map_err(database_error)?;
        }
        write_txn.commit().map_err(database_error)?;
        Ok(())
    }

    /// Get a value from a table
    pub fn get(
        &self,
        table: TableDefinition<&[u8], &[u8]>,
        key: &[u8],
    ) -> Result<Option<Vec<u8>>, StorageError> {
        let read_txn = self.db.begin_read().map_err(database_error)?;
        let table = read_txn.open_table(table).map_err(database_error)?;

        let value = table
            .get(key)
            .map_err(database_error)?
            .map(|v| v.value().to_vec());

        Ok(value)
    }

    /// Delete a key from a table, returning whether it was present
    pub fn delete(
        &self,
        table: TableDefinition<&[u8], &[u8]>,
        key: &[u8],
    ) -> Result<bool, StorageError> {
        let write_txn = self.db.begin_write().map_err(database_error)?;
        let removed = {
            let mut table = write_txn.open_table(table).map_err(database_error)?;
            table.remove(key).map_err(database_error)?.is_some()
        };
        write_txn.commit().map_err(database_error)?;
        Ok(removed)
    }

    /// All entries of a table whose key starts with `prefix`
    pub fn scan_prefix(
        &self,
        table: TableDefinition<&[u8], &[u8]>,
        prefix: &[u8],
    ) -> Result<ScanResults, StorageError> {
        let read_txn = self.db.begin_read().map_err(database_error)?;
        let table = read_txn.open_table(table).map_err(database_error)?;

        let mut results = Vec::new();
        for entry in table.range(prefix..).map_err(database_error)? {
            let (key, value) = entry.map_err(database_error)?;
            let key_bytes = key.value();
            if !key_bytes.starts_with(prefix) {
                break;
            }
            results.push((key_bytes.to_vec(), value.value().to_vec()));
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_storage() -> (RedbStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = RedbStorageConfig {
            db_path: temp_dir.path().join("nested").join("test.redb"),
        };
        let storage = RedbStorage::open(config).unwrap();
        (storage, temp_dir)
    }

    #[test]
    fn test_put_get_delete() {
        let (storage, _temp) = create_test_storage();

        storage.put(META, b"key", b"value").unwrap();
        assert_eq!(storage.get(META, b"key").unwrap(), Some(b"value".to_vec()));

        assert!(storage.delete(META, b"key").unwrap());
        assert!(!storage.delete(META, b"key").unwrap());
        assert!(storage.get(META, b"key").unwrap().is_none());
    }

    #[test]
    fn test_scan_prefix() {
        let (storage, _temp) = create_test_storage();

        storage.put(TRANSFER_LOG, b"Oalice", b"1").unwrap();
        storage.put(TRANSFER_LOG, b"Obob", b"2").unwrap();
        storage.put(TRANSFER_LOG, b"Ialice", b"3").unwrap();

        let outbound = storage.scan_prefix(TRANSFER_LOG, b"O").unwrap();
        assert_eq!(outbound.len(), 2);
        assert!(outbound.iter().all(|(key, _)| key.starts_with(b"O")));
    }
}
