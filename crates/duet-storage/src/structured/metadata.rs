//! Database-level metadata kept alongside the transfer log

use std::sync::Arc;

use duet_core::{DatabaseId, StorageError};
use tracing::info;

use super::tables::{META, RedbStorage};

const DATABASE_ID_KEY: &[u8] = b"database_id";

/// Small key-value store for per-database settings
#[derive(Clone)]
pub struct MetadataStore {
    storage: Arc<RedbStorage>,
}

impl MetadataStore {
    pub fn new(storage: Arc<RedbStorage>) -> Self {
        Self { storage }
    }

    /// The persisted database id, if one was recorded
    pub fn database_id(&self) -> Result<Option<DatabaseId>, StorageError> {
        match self.storage.get(META, DATABASE_ID_KEY)? {
            Some(value) => {
                let id = String::from_utf8(value)
                    .map_err(|e| StorageError::Corrupted(e.to_string()))?;
                Ok(Some(DatabaseId::new(id)))
            }
            None => Ok(None),
        }
    }

    /// Record the database id
    pub fn set_database_id(&self, id: &DatabaseId) -> Result<(), StorageError> {
        self.storage
            .put(META, DATABASE_ID_KEY, id.as_str().as_bytes())
    }

    /// Return the persisted id, or persist and return the one produced by `generate`
    pub fn database_id_or_insert_with(
        &self,
        generate: impl FnOnce() -> DatabaseId,
    ) -> Result<DatabaseId, StorageError> {
        if let Some(id) = self.database_id()? {
            return Ok(id);
        }
        let id = generate();
        self.set_database_id(&id)?;
        info!(database_id = %id, "Assigned database id");
        Ok(id)
    }
}
