//! Database facade
//!
//! Orchestrates a journal, a bucket, and a version factory into document
//! operations, and exposes the same stores to other databases through
//! [`ReplicationPeer`].
//!
//! Every write stores content in the bucket before the journal records the
//! change, so a recorded save always has its content available.

use std::sync::Arc;

use async_trait::async_trait;
use duet_core::{
    Action, Change, ChangeId, DatabaseId, Document, DocumentId, DuetError, DuetResult, Journal,
    ReplicationDirection, ReplicationEvent, ReplicationPeer, TransferLog, Version, VersionFactory,
};
use duet_storage::{
    Bucket, BucketKey, InMemoryBucket, InMemoryJournal, InMemoryTransferLog, PersistentStorage,
};
use duet_sync::{Replicator, SyncResult};
use tracing::{debug, info, instrument};

use crate::config::DatabaseConfig;

/// A replicated document database
pub struct Database {
    id: DatabaseId,
    bucket: Arc<dyn Bucket>,
    journal: Arc<dyn Journal>,
    versions: VersionFactory,
    replicator: Replicator,
}

impl Database {
    /// Assemble a database from its stores
    pub fn new(
        id: DatabaseId,
        bucket: Arc<dyn Bucket>,
        journal: Arc<dyn Journal>,
        transfer_log: Arc<dyn TransferLog>,
    ) -> Self {
        Self {
            id,
            bucket,
            journal,
            versions: VersionFactory::new(),
            replicator: Replicator::new(transfer_log),
        }
    }

    /// In-memory database with a generated id
    pub fn in_memory() -> Self {
        Self::with_id(DatabaseId::generate())
    }

    /// In-memory database with the given id
    pub fn with_id(id: DatabaseId) -> Self {
        Self::new(
            id,
            Arc::new(InMemoryBucket::new()),
            Arc::new(InMemoryJournal::new()),
            Arc::new(InMemoryTransferLog::new()),
        )
    }

    /// Open (or create) a file-backed database
    ///
    /// The id is persisted on first open. Reopening with a different
    /// configured id fails with `InvalidArgument`.
    #[instrument(skip(config), fields(data_dir = %config.data_dir.display()))]
    pub async fn open(config: DatabaseConfig) -> DuetResult<Self> {
        let storage = PersistentStorage::open(config.storage.clone()).await?;

        let configured = config.database_id.clone();
        let id = storage.metadata.database_id_or_insert_with(|| {
            configured.clone().unwrap_or_else(DatabaseId::generate)
        })?;
        if let Some(configured) = configured
            && configured != id
        {
            return Err(DuetError::invalid_argument(format!(
                "Data directory belongs to database '{}', not '{}'",
                id, configured
            )));
        }

        let known_peers = storage.transfer_log.cursors(ReplicationDirection::Outbound)?;
        for (peer, cursor) in &known_peers {
            debug!(peer = %peer.short_id(), cursor = %cursor, "Outbound cursor");
        }

        info!(database_id = %id, known_peers = known_peers.len(), "Opened database");

        Ok(Self::new(
            id,
            storage.bucket,
            storage.journal,
            storage.transfer_log,
        ))
    }

    /// Replace the version factory
    pub fn with_version_factory(mut self, versions: VersionFactory) -> Self {
        self.versions = versions;
        self
    }

    /// Identity of this database
    pub fn id(&self) -> &DatabaseId {
        &self.id
    }

    /// Current content of a document, `None` if unknown or deleted
    pub async fn get(&self, document_id: &DocumentId) -> DuetResult<Option<Document>> {
        match self.journal.latest_change_of(document_id).await? {
            Some(change) if !change.is_delete() => self.content_at(document_id, &change.version).await,
            _ => Ok(None),
        }
    }

    /// Store a new document and return its generated id
    #[instrument(skip_all, fields(size = document.len()))]
    pub async fn create(&self, document: &Document) -> DuetResult<DocumentId> {
        let document_id = DocumentId::generate();
        let version = self.versions.create();

        self.store(&document_id, version, document).await?;

        debug!(document_id = %document_id, version = %version, "Created document");
        Ok(document_id)
    }

    /// Store new content for an existing document
    ///
    /// A deleted document is brought back by an update.
    #[instrument(skip(self, document), fields(document_id = %document_id))]
    pub async fn update(&self, document_id: &DocumentId, document: &Document) -> DuetResult<()> {
        let latest = self.require_latest(document_id).await?;
        let version = self.versions.create_from(&latest.version);

        self.store(document_id, version, document).await?;

        debug!(version = %version, "Updated document");
        Ok(())
    }

    /// Mark a document as deleted
    #[instrument(skip(self), fields(document_id = %document_id))]
    pub async fn remove(&self, document_id: &DocumentId) -> DuetResult<()> {
        let latest = self.require_latest(document_id).await?;
        let version = self.versions.create_from(&latest.version);

        self.journal
            .insert(document_id, version, Action::Delete)
            .await?;

        debug!(version = %version, "Removed document");
        Ok(())
    }

    /// Ids of all documents that are not deleted
    pub async fn list(&self) -> DuetResult<Vec<DocumentId>> {
        self.journal.list().await
    }

    /// Exchange changes with `peer` in both directions
    ///
    /// Returns the changes this database received.
    pub async fn replicate(&self, peer: &dyn ReplicationPeer) -> SyncResult<Vec<ReplicationEvent>> {
        self.replicator.replicate(self, peer).await
    }

    async fn require_latest(&self, document_id: &DocumentId) -> DuetResult<Change> {
        self.journal
            .latest_change_of(document_id)
            .await?
            .ok_or_else(|| DuetError::not_found(format!("Unknown document: '{}'", document_id)))
    }

    /// Bucket write followed by the journal commit
    async fn store(&self, document_id: &DocumentId, version: Version, document: &Document) -> DuetResult<()> {
        self.bucket
            .put(&BucketKey::new(document_id, &version), document)
            .await?;
        self.journal
            .insert(document_id, version, Action::Save)
            .await?;
        Ok(())
    }

    async fn content_at(&self, document_id: &DocumentId, version: &Version) -> DuetResult<Option<Document>> {
        self.bucket.get(&BucketKey::new(document_id, version)).await
    }
}

#[async_trait]
impl ReplicationPeer for Database {
    async fn database_id(&self) -> DuetResult<DatabaseId> {
        Ok(self.id.clone())
    }

    async fn exists(&self, document_id: &DocumentId, version: &Version) -> DuetResult<bool> {
        self.journal.exists(document_id, version).await
    }

    async fn get(&self, document_id: &DocumentId, version: &Version) -> DuetResult<Option<Document>> {
        self.content_at(document_id, version).await
    }

    #[instrument(skip(self, document), fields(document_id = %document_id, version = %version, action = %action))]
    async fn put(
        &self,
        document_id: &DocumentId,
        version: &Version,
        action: Action,
        document: Option<Document>,
    ) -> DuetResult<()> {
        if self.journal.exists(document_id, version).await? {
            debug!("Change already present");
            return Ok(());
        }

        match (action, document) {
            (Action::Save, Some(document)) => self.store(document_id, *version, &document).await,
            (Action::Delete, None) => {
                self.journal
                    .insert(document_id, *version, Action::Delete)
                    .await?;
                Ok(())
            }
            (action, document) => Err(DuetError::invalid_argument(format!(
                "Invalid combination: action '{}' with {}",
                action,
                if document.is_some() { "a document" } else { "no document" }
            ))),
        }
    }

    async fn changes(&self, latest_seen: Option<&ChangeId>) -> DuetResult<Vec<Change>> {
        self.journal.changes(latest_seen).await
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("id", &self.id).finish_non_exhaustive()
    }
}
