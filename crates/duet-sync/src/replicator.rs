//! Resumable change transfer between two peers
//!
//! ## Protocol
//!
//! ```text
//! replicate(local, remote)
//!   1. OUTBOUND: stream local.changes(cursor) into remote   (events dropped)
//!   2. INBOUND:  stream remote.changes(cursor) into local   (events returned)
//! ```
//!
//! Both cursors are keyed by the remote database id. A cursor only moves
//! after the destination confirmed the apply, so an interrupted pass resumes
//! at the first change it did not finish.

use std::sync::Arc;

use duet_core::{
    Action, Change, ChangeId, DatabaseId, DuetError, DuetResult, ReplicationDirection,
    ReplicationEvent, ReplicationPeer, TransferLog,
};
use tracing::{debug, info, instrument, trace};

use crate::error::{SyncError, SyncResult};

/// Outcome of transferring one change
enum Transfer {
    /// The destination recorded the change
    Applied(ReplicationEvent),
    /// The destination already had the content
    Skipped,
}

/// Counters of one replication pass
#[derive(Debug, Default)]
struct PassStats {
    applied: usize,
    skipped: usize,
}

/// Drives replication passes and owns the cursor bookkeeping
#[derive(Clone)]
pub struct Replicator {
    transfer_log: Arc<dyn TransferLog>,
}

impl Replicator {
    pub fn new(transfer_log: Arc<dyn TransferLog>) -> Self {
        Self { transfer_log }
    }

    /// Access the transfer log holding this replicator's cursors
    pub fn transfer_log(&self) -> &Arc<dyn TransferLog> {
        &self.transfer_log
    }

    /// Bidirectional replication
    ///
    /// Returns the changes newly applied to `local`. An outbound failure is
    /// returned before the inbound pass starts.
    pub async fn replicate(
        &self,
        local: &dyn ReplicationPeer,
        remote: &dyn ReplicationPeer,
    ) -> SyncResult<Vec<ReplicationEvent>> {
        self.replicate_to(local, remote, ReplicationDirection::Outbound)
            .await?;
        self.replicate_to(remote, local, ReplicationDirection::Inbound)
            .await
    }

    /// One-way pass from `source` to `destination`
    ///
    /// `direction` is seen from the local peer: for `Outbound` the remote is
    /// `destination`, for `Inbound` it is `source`.
    #[instrument(skip_all, fields(direction = %direction))]
    pub async fn replicate_to(
        &self,
        source: &dyn ReplicationPeer,
        destination: &dyn ReplicationPeer,
        direction: ReplicationDirection,
    ) -> SyncResult<Vec<ReplicationEvent>> {
        let remote = match direction {
            ReplicationDirection::Outbound => destination.database_id().await,
            ReplicationDirection::Inbound => source.database_id().await,
        }
        .map_err(|e| SyncError::PeerIdentity {
            direction,
            source: e,
        })?;

        let mut stats = PassStats::default();
        let mut events = Vec::new();

        let result = self
            .run_pass(source, destination, direction, &remote, &mut stats, &mut events)
            .await;

        match result {
            Ok(()) => {
                info!(
                    peer = %remote.short_id(),
                    applied = stats.applied,
                    skipped = stats.skipped,
                    "Replication pass complete"
                );
                Ok(events)
            }
            Err(e) => {
                info!(
                    peer = %remote.short_id(),
                    applied = stats.applied,
                    skipped = stats.skipped,
                    error = %e,
                    "Replication pass aborted"
                );
                Err(SyncError::pass(direction, remote, e))
            }
        }
    }

    async fn run_pass(
        &self,
        source: &dyn ReplicationPeer,
        destination: &dyn ReplicationPeer,
        direction: ReplicationDirection,
        remote: &DatabaseId,
        stats: &mut PassStats,
        events: &mut Vec<ReplicationEvent>,
    ) -> DuetResult<()> {
        let cursor: Option<ChangeId> = self.transfer_log.get(remote, direction).await?;
        match &cursor {
            Some(cursor) => debug!(cursor = %cursor, "Resuming after cursor"),
            None => debug!("Replicating from the beginning"),
        }

        let changes = source.changes(cursor.as_ref()).await?;
        trace!(pending = changes.len(), "Fetched pending changes");

        for change in changes {
            let outcome = Self::transfer(source, destination, &change).await?;
            self.transfer_log
                .put(remote, direction, &change.change_id())
                .await?;

            match outcome {
                Transfer::Applied(event) => {
                    stats.applied += 1;
                    events.push(event);
                }
                Transfer::Skipped => stats.skipped += 1,
            }
        }

        Ok(())
    }

    async fn transfer(
        source: &dyn ReplicationPeer,
        destination: &dyn ReplicationPeer,
        change: &Change,
    ) -> DuetResult<Transfer> {
        let event = ReplicationEvent::new(change.document_id.clone(), change.action);

        match change.action {
            Action::Delete => {
                destination
                    .put(&change.document_id, &change.version, Action::Delete, None)
                    .await?;
                trace!(document_id = %change.document_id, version = %change.version, "Transferred delete");
                Ok(Transfer::Applied(event))
            }
            Action::Save => {
                if destination
                    .exists(&change.document_id, &change.version)
                    .await?
                {
                    trace!(document_id = %change.document_id, version = %change.version, "Already present");
                    return Ok(Transfer::Skipped);
                }

                let document = source
                    .get(&change.document_id, &change.version)
                    .await?
                    .ok_or_else(|| {
                        DuetError::not_found(format!(
                            "Content of '{}' at version {}",
                            change.document_id, change.version
                        ))
                    })?;
                destination
                    .put(&change.document_id, &change.version, Action::Save, Some(document))
                    .await?;
                trace!(document_id = %change.document_id, version = %change.version, "Transferred save");
                Ok(Transfer::Applied(event))
            }
        }
    }
}

impl std::fmt::Debug for Replicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Replicator").finish_non_exhaustive()
    }
}
