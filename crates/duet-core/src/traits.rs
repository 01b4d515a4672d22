//! Core traits for Duet
//!
//! These traits are the seams between the replicator, the stores, and the
//! database facade.
//!
//! ## Key Traits
//!
//! - [`Journal`]: append-only, globally ordered change log
//! - [`TransferLog`]: per-peer, per-direction replication cursor
//! - [`ReplicationPeer`]: the only surface the replicator touches

use async_trait::async_trait;

use crate::change::{Action, Change, ChangeId};
use crate::document::Document;
use crate::error::DuetResult;
use crate::identity::{DatabaseId, DocumentId};
use crate::replication::ReplicationDirection;
use crate::version::Version;

/// Append-only store of changes
///
/// Implementations must publish each change to the per-document set and to
/// both indexes in one atomic step, so no reader can observe a change through
/// one view but not the other.
#[async_trait]
pub trait Journal: Send + Sync {
    /// Record a change, assigning it the next sequence
    async fn insert(
        &self,
        document_id: &DocumentId,
        version: Version,
        action: Action,
    ) -> DuetResult<ChangeId>;

    /// The change with the highest version for a document
    async fn latest_change_of(&self, document_id: &DocumentId) -> DuetResult<Option<Change>>;

    /// Whether a change for exactly this `(document, version)` exists
    async fn exists(&self, document_id: &DocumentId, version: &Version) -> DuetResult<bool>;

    /// Documents whose latest change is a save, in no particular order
    async fn list(&self) -> DuetResult<Vec<DocumentId>>;

    /// Changes in sequence order, strictly after `latest_seen` when given
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when `latest_seen` is not a change of this journal.
    async fn changes(&self, latest_seen: Option<&ChangeId>) -> DuetResult<Vec<Change>>;
}

/// Durable record of how far replication with each peer has progressed
#[async_trait]
pub trait TransferLog: Send + Sync {
    /// Last change transferred for `(peer, direction)`, if any
    async fn get(
        &self,
        peer: &DatabaseId,
        direction: ReplicationDirection,
    ) -> DuetResult<Option<ChangeId>>;

    /// Overwrite the cursor for `(peer, direction)`
    async fn put(
        &self,
        peer: &DatabaseId,
        direction: ReplicationDirection,
        change_id: &ChangeId,
    ) -> DuetResult<()>;
}

/// Capability contract of a database taking part in replication
///
/// Implemented by local databases and, in networked deployments, by
/// transport-backed adapters for remote ones.
#[async_trait]
pub trait ReplicationPeer: Send + Sync {
    /// Identity of this peer
    async fn database_id(&self) -> DuetResult<DatabaseId>;

    /// Whether this peer already recorded `(document, version)`
    async fn exists(&self, document_id: &DocumentId, version: &Version) -> DuetResult<bool>;

    /// Content of a specific document version
    async fn get(&self, document_id: &DocumentId, version: &Version)
    -> DuetResult<Option<Document>>;

    /// Idempotent conditional apply
    ///
    /// A no-op when `(document, version)` is already recorded. Otherwise a
    /// save requires `document` and a delete forbids it; any other
    /// combination fails with `InvalidArgument`.
    async fn put(
        &self,
        document_id: &DocumentId,
        version: &Version,
        action: Action,
        document: Option<Document>,
    ) -> DuetResult<()>;

    /// Same contract as [`Journal::changes`]
    async fn changes(&self, latest_seen: Option<&ChangeId>) -> DuetResult<Vec<Change>>;
}
