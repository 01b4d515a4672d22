//! In-memory storage implementations
//!
//! This module provides in-memory implementations of the journal, bucket,
//! and transfer log, suitable for embedded use without persistence and for
//! testing.

use async_trait::async_trait;
use dashmap::DashMap;
use duet_core::{
    Action, Change, ChangeId, DatabaseId, Document, DocumentId, DuetResult, Journal,
    ReplicationDirection, SequenceFactory, TransferLog, Version,
};
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace};

use crate::append_log::JournalIndex;
use crate::{Bucket, BucketKey};

/// In-memory implementation of [`Journal`]
///
/// All three journal views live in one [`JournalIndex`] behind a single lock;
/// sequences are drawn while the write lock is held, so sequence order always
/// matches publication order.
#[derive(Debug, Default)]
pub struct InMemoryJournal {
    index: RwLock<JournalIndex>,
    sequences: SequenceFactory,
}

impl InMemoryJournal {
    /// Create an empty journal
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of recorded changes
    pub async fn change_count(&self) -> usize {
        self.index.read().await.len()
    }
}

#[async_trait]
impl Journal for InMemoryJournal {
    #[instrument(skip_all, fields(document_id = %document_id, version = %version))]
    async fn insert(
        &self,
        document_id: &DocumentId,
        version: Version,
        action: Action,
    ) -> DuetResult<ChangeId> {
        let mut index = self.index.write().await;

        let change_id = ChangeId::new(document_id.clone(), version);
        if index.sequence_of(&change_id).is_some() {
            debug!("Change already recorded");
            return Ok(change_id);
        }

        let sequence = self.sequences.next_sequence();
        index.apply(Change::new(document_id.clone(), version, action, sequence));

        trace!(sequence = %sequence, action = %action, "Inserted change");
        Ok(change_id)
    }

    async fn latest_change_of(&self, document_id: &DocumentId) -> DuetResult<Option<Change>> {
        Ok(self.index.read().await.latest_change_of(document_id))
    }

    async fn exists(&self, document_id: &DocumentId, version: &Version) -> DuetResult<bool> {
        Ok(self.index.read().await.exists(document_id, version))
    }

    async fn list(&self) -> DuetResult<Vec<DocumentId>> {
        Ok(self.index.read().await.list())
    }

    async fn changes(&self, latest_seen: Option<&ChangeId>) -> DuetResult<Vec<Change>> {
        self.index.read().await.changes(latest_seen)
    }
}

/// In-memory implementation of [`Bucket`]
///
/// Uses `DashMap` for concurrent access to stored documents.
#[derive(Debug, Default)]
pub struct InMemoryBucket {
    documents: DashMap<BucketKey, Document>,
}

impl InMemoryBucket {
    /// Create an empty bucket
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl Bucket for InMemoryBucket {
    async fn get(&self, key: &BucketKey) -> DuetResult<Option<Document>> {
        Ok(self.documents.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, key: &BucketKey, document: &Document) -> DuetResult<()> {
        trace!(key = %key, size = document.len(), "Storing blob");
        self.documents.insert(key.clone(), document.clone());
        Ok(())
    }

    async fn remove(&self, key: &BucketKey) -> DuetResult<()> {
        self.documents.remove(key);
        Ok(())
    }

    async fn list(&self) -> DuetResult<Vec<BucketKey>> {
        Ok(self.documents.iter().map(|entry| entry.key().clone()).collect())
    }
}

/// In-memory implementation of [`TransferLog`]
#[derive(Debug, Default)]
pub struct InMemoryTransferLog {
    cursors: DashMap<(DatabaseId, ReplicationDirection), ChangeId>,
}

impl InMemoryTransferLog {
    /// Create an empty transfer log
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransferLog for InMemoryTransferLog {
    async fn get(
        &self,
        peer: &DatabaseId,
        direction: ReplicationDirection,
    ) -> DuetResult<Option<ChangeId>> {
        Ok(self
            .cursors
            .get(&(peer.clone(), direction))
            .map(|entry| entry.value().clone()))
    }

    async fn put(
        &self,
        peer: &DatabaseId,
        direction: ReplicationDirection,
        change_id: &ChangeId,
    ) -> DuetResult<()> {
        trace!(peer = %peer.short_id(), direction = %direction, cursor = %change_id, "Advancing cursor");
        self.cursors.insert((peer.clone(), direction), change_id.clone());
        Ok(())
    }
}
