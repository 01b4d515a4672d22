//! Replication protocol tests
//!
//! Peers here are thin journal + bucket pairs with call counters and
//! failure injection, so the replicator is exercised on its own.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use duet_core::{
    Action, Change, ChangeId, DatabaseId, Document, DocumentId, DuetError, DuetResult, Journal,
    ReplicationDirection, ReplicationEvent, ReplicationPeer, StorageError, TransferLog, Version,
};
use duet_storage::{Bucket, BucketKey, InMemoryBucket, InMemoryJournal, InMemoryTransferLog};
use duet_sync::{Replicator, SyncError};
use tokio_test::{assert_err, assert_ok};

const NEVER: usize = usize::MAX;

struct TestPeer {
    id: DatabaseId,
    journal: InMemoryJournal,
    bucket: InMemoryBucket,
    get_calls: AtomicUsize,
    put_calls: AtomicUsize,
    /// Number of `get` calls that succeed before every further one fails
    gets_before_failure: AtomicUsize,
    puts_before_failure: AtomicUsize,
}

impl TestPeer {
    fn new(id: &str) -> Self {
        Self {
            id: DatabaseId::new(id),
            journal: InMemoryJournal::new(),
            bucket: InMemoryBucket::new(),
            get_calls: AtomicUsize::new(0),
            put_calls: AtomicUsize::new(0),
            gets_before_failure: AtomicUsize::new(NEVER),
            puts_before_failure: AtomicUsize::new(NEVER),
        }
    }

    async fn save(&self, document: &str, version: Version, content: &str) {
        let document_id = DocumentId::new(document).unwrap();
        self.bucket
            .put(&BucketKey::new(&document_id, &version), &Document::from(content.to_string().into_bytes()))
            .await
            .unwrap();
        self.journal
            .insert(&document_id, version, Action::Save)
            .await
            .unwrap();
    }

    async fn delete(&self, document: &str, version: Version) {
        let document_id = DocumentId::new(document).unwrap();
        self.journal
            .insert(&document_id, version, Action::Delete)
            .await
            .unwrap();
    }

    async fn content_of(&self, document: &str) -> Option<Document> {
        let document_id = DocumentId::new(document).unwrap();
        let latest = self.journal.latest_change_of(&document_id).await.unwrap()?;
        if latest.is_delete() {
            return None;
        }
        self.bucket
            .get(&BucketKey::new(&document_id, &latest.version))
            .await
            .unwrap()
    }

    async fn listed(&self) -> HashSet<String> {
        self.journal
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|id| id.as_str().to_string())
            .collect()
    }

    fn take_get_calls(&self) -> usize {
        self.get_calls.swap(0, Ordering::SeqCst)
    }

    fn fail_gets_after(&self, count: usize) {
        self.gets_before_failure.store(count, Ordering::SeqCst);
    }

    fn fail_puts_after(&self, count: usize) {
        self.puts_before_failure.store(count, Ordering::SeqCst);
    }

    fn heal(&self) {
        self.fail_gets_after(NEVER);
        self.fail_puts_after(NEVER);
    }

    fn injected(budget: &AtomicUsize) -> DuetResult<()> {
        let allowed = budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                0 => None,
                NEVER => Some(NEVER),
                left => Some(left - 1),
            })
            .is_ok();
        if allowed {
            Ok(())
        } else {
            Err(DuetError::Storage(StorageError::io("injected failure")))
        }
    }
}

#[async_trait]
impl ReplicationPeer for TestPeer {
    async fn database_id(&self) -> DuetResult<DatabaseId> {
        Ok(self.id.clone())
    }

    async fn exists(&self, document_id: &DocumentId, version: &Version) -> DuetResult<bool> {
        self.journal.exists(document_id, version).await
    }

    async fn get(&self, document_id: &DocumentId, version: &Version) -> DuetResult<Option<Document>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        Self::injected(&self.gets_before_failure)?;
        self.bucket.get(&BucketKey::new(document_id, version)).await
    }

    async fn put(
        &self,
        document_id: &DocumentId,
        version: &Version,
        action: Action,
        document: Option<Document>,
    ) -> DuetResult<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        Self::injected(&self.puts_before_failure)?;
        if self.journal.exists(document_id, version).await? {
            return Ok(());
        }
        match (action, document) {
            (Action::Save, Some(document)) => {
                self.bucket
                    .put(&BucketKey::new(document_id, version), &document)
                    .await?;
            }
            (Action::Delete, None) => {}
            (action, _) => {
                return Err(DuetError::invalid_argument(format!("Invalid combination for {}", action)));
            }
        }
        self.journal.insert(document_id, *version, action).await?;
        Ok(())
    }

    async fn changes(&self, latest_seen: Option<&ChangeId>) -> DuetResult<Vec<Change>> {
        self.journal.changes(latest_seen).await
    }
}

fn replicator() -> (Replicator, Arc<InMemoryTransferLog>) {
    let transfer_log = Arc::new(InMemoryTransferLog::new());
    (Replicator::new(transfer_log.clone()), transfer_log)
}

fn event(document: &str, action: Action) -> ReplicationEvent {
    ReplicationEvent::new(DocumentId::new(document).unwrap(), action)
}

#[tokio::test]
async fn test_returns_inbound_events_only() {
    let (replicator, _) = replicator();
    let local = TestPeer::new("local");
    let remote = TestPeer::new("remote");

    local.save("x1", Version::new(1, 1), "x1").await;
    local.save("x2", Version::new(1, 2), "x2").await;
    remote.save("y1", Version::new(1, 3), "y1").await;
    remote.save("y2", Version::new(1, 4), "y2").await;

    let events = replicator.replicate(&local, &remote).await.unwrap();

    assert_eq!(events, vec![event("y1", Action::Save), event("y2", Action::Save)]);
    let expected: HashSet<String> = ["x1", "x2", "y1", "y2"].iter().map(|s| s.to_string()).collect();
    assert_eq!(local.listed().await, expected);
    assert_eq!(remote.listed().await, expected);
    assert_eq!(remote.content_of("x1").await, Some(Document::from("x1")));
    assert_eq!(local.content_of("y2").await, Some(Document::from("y2")));
}

#[tokio::test]
async fn test_cursors_keyed_by_remote_id() {
    let (replicator, transfer_log) = replicator();
    let local = TestPeer::new("local");
    let remote = TestPeer::new("remote");

    local.save("x", Version::new(1, 1), "x").await;
    remote.save("y", Version::new(1, 1), "y").await;

    replicator.replicate(&local, &remote).await.unwrap();

    let remote_id = DatabaseId::new("remote");
    let outbound = transfer_log
        .get(&remote_id, ReplicationDirection::Outbound)
        .await
        .unwrap();
    assert_eq!(outbound.unwrap().document_id.as_str(), "x");

    // The inbound stream also carried "x" back after the outbound pass
    let inbound = transfer_log
        .get(&remote_id, ReplicationDirection::Inbound)
        .await
        .unwrap();
    assert_eq!(inbound.unwrap().document_id.as_str(), "x");

    let local_id = DatabaseId::new("local");
    assert!(transfer_log
        .get(&local_id, ReplicationDirection::Outbound)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_existing_content_is_not_fetched() {
    let (replicator, _) = replicator();
    let local = TestPeer::new("local");
    let remote = TestPeer::new("remote");

    local.save("shared", Version::new(1, 7), "same").await;
    remote.save("shared", Version::new(1, 7), "same").await;

    let events = replicator.replicate(&local, &remote).await.unwrap();

    assert!(events.is_empty());
    assert_eq!(local.take_get_calls(), 0);
    assert_eq!(remote.take_get_calls(), 0);
}

#[tokio::test]
async fn test_rerun_transfers_nothing() {
    let (replicator, _) = replicator();
    let local = TestPeer::new("local");
    let remote = TestPeer::new("remote");

    local.save("a", Version::new(1, 1), "a").await;
    remote.save("b", Version::new(1, 1), "b").await;

    replicator.replicate(&local, &remote).await.unwrap();
    local.take_get_calls();
    remote.take_get_calls();

    let events = replicator.replicate(&local, &remote).await.unwrap();
    assert!(events.is_empty());
    assert_eq!(local.take_get_calls(), 0);
    assert_eq!(remote.take_get_calls(), 0);
}

#[tokio::test]
async fn test_delete_is_transferred() {
    let (replicator, _) = replicator();
    let local = TestPeer::new("local");
    let remote = TestPeer::new("remote");

    remote.save("doc", Version::new(1, 1), "v1").await;
    replicator.replicate(&local, &remote).await.unwrap();
    assert_eq!(local.content_of("doc").await, Some(Document::from("v1")));

    remote.delete("doc", Version::new(2, 1)).await;
    let events = replicator.replicate(&local, &remote).await.unwrap();

    assert_eq!(events, vec![event("doc", Action::Delete)]);
    assert!(local.content_of("doc").await.is_none());
    assert!(local.listed().await.is_empty());
    assert_eq!(remote.take_get_calls(), 1);
}

#[tokio::test]
async fn test_resumes_after_failed_fetch() {
    let (replicator, transfer_log) = replicator();
    let local = TestPeer::new("local");
    let remote = TestPeer::new("remote");

    for i in 1..=5u64 {
        remote.save(&format!("doc-{}", i), Version::new(1, i), &format!("content-{}", i)).await;
    }

    // Two fetches succeed, the third fails
    remote.fail_gets_after(2);
    let err = assert_err!(replicator.replicate(&local, &remote).await);

    assert!(matches!(err, SyncError::Inbound { .. }));
    assert_eq!(err.peer(), Some(&DatabaseId::new("remote")));
    assert!(matches!(err.cause(), DuetError::Storage(_)));
    assert_eq!(local.listed().await.len(), 2);

    let cursor = transfer_log
        .get(&DatabaseId::new("remote"), ReplicationDirection::Inbound)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cursor.document_id.as_str(), "doc-2");

    remote.heal();
    remote.take_get_calls();
    let events = assert_ok!(replicator.replicate(&local, &remote).await);

    assert_eq!(remote.take_get_calls(), 3);
    assert_eq!(
        events,
        vec![
            event("doc-3", Action::Save),
            event("doc-4", Action::Save),
            event("doc-5", Action::Save),
        ]
    );
    assert_eq!(local.listed().await.len(), 5);
    for i in 1..=5u64 {
        assert_eq!(
            local.content_of(&format!("doc-{}", i)).await,
            Some(Document::from(format!("content-{}", i).into_bytes()))
        );
    }
}

#[tokio::test]
async fn test_outbound_failure_skips_inbound_pass() {
    let (replicator, transfer_log) = replicator();
    let local = TestPeer::new("local");
    let remote = TestPeer::new("remote");

    local.save("x", Version::new(1, 1), "x").await;
    remote.save("y", Version::new(1, 1), "y").await;

    remote.fail_puts_after(0);
    let err = assert_err!(replicator.replicate(&local, &remote).await);

    assert_eq!(err.direction(), ReplicationDirection::Outbound);
    assert!(local.listed().await.contains("x"));
    assert!(!local.listed().await.contains("y"));
    assert_eq!(remote.take_get_calls(), 0);
    assert!(transfer_log
        .get(&DatabaseId::new("remote"), ReplicationDirection::Outbound)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_replicate_to_single_direction() {
    let (replicator, _) = replicator();
    let source = TestPeer::new("source");
    let destination = TestPeer::new("destination");

    source.save("only", Version::new(1, 1), "one way").await;
    destination.save("stays", Version::new(1, 1), "here").await;

    let events = replicator
        .replicate_to(&source, &destination, ReplicationDirection::Outbound)
        .await
        .unwrap();

    assert_eq!(events, vec![event("only", Action::Save)]);
    assert!(!source.listed().await.contains("stays"));
    assert_eq!(destination.put_calls.load(Ordering::SeqCst), 1);
}
