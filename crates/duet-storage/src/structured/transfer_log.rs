//! Persistent replication cursors
//!
//! One row per `(remote database, direction)` in the transfer log table.

use std::sync::Arc;

use async_trait::async_trait;
use duet_core::{ChangeId, DatabaseId, DuetResult, ReplicationDirection, StorageError, TransferLog};
use tracing::debug;

use super::tables::{RedbStorage, TRANSFER_LOG};

/// redb-backed implementation of [`TransferLog`]
pub struct RedbTransferLog {
    storage: Arc<RedbStorage>,
}

impl RedbTransferLog {
    pub fn new(storage: Arc<RedbStorage>) -> Self {
        Self { storage }
    }

    fn make_key(peer: &DatabaseId, direction: ReplicationDirection) -> Vec<u8> {
        let mut key = Vec::with_capacity(1 + peer.as_str().len());
        key.push(direction.as_byte());
        key.extend_from_slice(peer.as_str().as_bytes());
        key
    }

    /// All cursors recorded for one direction
    pub fn cursors(
        &self,
        direction: ReplicationDirection,
    ) -> Result<Vec<(DatabaseId, ChangeId)>, StorageError> {
        self.storage
            .scan_prefix(TRANSFER_LOG, &[direction.as_byte()])?
            .into_iter()
            .map(|(key, value)| {
                let peer = std::str::from_utf8(&key[1..])
                    .map_err(|e| StorageError::Corrupted(e.to_string()))?;
                Ok((DatabaseId::new(peer), Self::decode_cursor(&value)?))
            })
            .collect()
    }

    fn decode_cursor(value: &[u8]) -> Result<ChangeId, StorageError> {
        let text =
            std::str::from_utf8(value).map_err(|e| StorageError::Corrupted(e.to_string()))?;
        ChangeId::parse(text).map_err(|e| StorageError::Corrupted(e.to_string()))
    }
}

#[async_trait]
impl TransferLog for RedbTransferLog {
    async fn get(
        &self,
        peer: &DatabaseId,
        direction: ReplicationDirection,
    ) -> DuetResult<Option<ChangeId>> {
        let key = Self::make_key(peer, direction);
        match self.storage.get(TRANSFER_LOG, &key)? {
            Some(value) => Ok(Some(Self::decode_cursor(&value)?)),
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        peer: &DatabaseId,
        direction: ReplicationDirection,
        change_id: &ChangeId,
    ) -> DuetResult<()> {
        let key = Self::make_key(peer, direction);
        self.storage
            .put(TRANSFER_LOG, &key, change_id.to_string().as_bytes())?;

        debug!(peer = %peer.short_id(), direction = %direction, cursor = %change_id, "Saved transfer cursor");
        Ok(())
    }
}
