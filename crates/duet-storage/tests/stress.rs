//! Stress tests for duet-storage
//!
//! These tests verify journal behavior under concurrent load and across
//! reopen cycles of the file-backed stores.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use duet_core::{Action, DatabaseId, DocumentId, ReplicationDirection, Version};
use duet_storage::{
    Bucket, BucketKey, Document, InMemoryJournal, Journal, PersistentStorage,
    PersistentStorageConfig, TransferLog,
};
use rand::Rng;
use tempfile::TempDir;

// ============================================================================
// Throughput Tests
// ============================================================================

/// Insert 10,000 changes and stream them back in order
#[tokio::test]
async fn test_journal_throughput() {
    let journal = InMemoryJournal::new();
    let change_count: u64 = 10_000;

    let start = Instant::now();
    for i in 1..=change_count {
        let document_id = DocumentId::new(format!("doc-{}", i % 100)).unwrap();
        journal
            .insert(&document_id, Version::new(i, 0), Action::Save)
            .await
            .expect("Failed to insert change");
    }
    let duration = start.elapsed();
    println!(
        "Inserted {} changes in {:?} ({:.2} changes/sec)",
        change_count,
        duration,
        change_count as f64 / duration.as_secs_f64()
    );

    let changes = journal.changes(None).await.unwrap();
    assert_eq!(changes.len() as u64, change_count);
    for (i, change) in changes.iter().enumerate() {
        assert_eq!(change.sequence.value(), i as u64 + 1);
    }
    assert_eq!(journal.list().await.unwrap().len(), 100);
}

// ============================================================================
// Concurrency Tests
// ============================================================================

/// Concurrent writers and readers never observe a change in one view but not another
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_readers_see_consistent_views() {
    let journal = Arc::new(InMemoryJournal::new());

    let writers: Vec<_> = (0..4u64)
        .map(|task| {
            let journal = journal.clone();
            tokio::spawn(async move {
                for i in 0..250u64 {
                    let document_id = DocumentId::new(format!("w{}-{}", task, i % 10)).unwrap();
                    journal
                        .insert(&document_id, Version::new(i + 1, task), Action::Save)
                        .await
                        .unwrap();
                }
            })
        })
        .collect();

    let reader = {
        let journal = journal.clone();
        tokio::spawn(async move {
            for _ in 0..50 {
                let snapshot = journal.changes(None).await.unwrap();
                for change in &snapshot {
                    assert!(journal.exists(&change.document_id, &change.version).await.unwrap());
                }
                if let Some(last) = snapshot.last() {
                    // A cursor taken from a snapshot always resolves
                    journal.changes(Some(&last.change_id())).await.unwrap();
                }
                tokio::task::yield_now().await;
            }
        })
    };

    for writer in writers {
        writer.await.unwrap();
    }
    reader.await.unwrap();

    let changes = journal.changes(None).await.unwrap();
    assert_eq!(changes.len(), 1_000);
    let sequences: HashSet<u64> = changes.iter().map(|c| c.sequence.value()).collect();
    assert_eq!(sequences.len(), 1_000);
}

// ============================================================================
// Persistence Tests
// ============================================================================

/// All file-backed stores come back intact after reopening
#[tokio::test]
async fn test_persistent_storage_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let config = PersistentStorageConfig::with_base_dir(temp_dir.path().join("db"));
    let remote = DatabaseId::new("remote");
    let mut rng = rand::rng();

    let mut written = Vec::new();
    let database_id = {
        let storage = PersistentStorage::open(config.clone()).await.unwrap();
        let database_id = storage
            .metadata
            .database_id_or_insert_with(DatabaseId::generate)
            .unwrap();

        for i in 0..20u64 {
            let document_id = DocumentId::generate();
            let version = Version::new(1, rng.random::<u64>());
            let payload: Vec<u8> = (0..64).map(|_| rng.random::<u8>()).collect();

            storage
                .bucket
                .put(&BucketKey::new(&document_id, &version), &Document::from(payload.clone()))
                .await
                .unwrap();
            let change_id = storage
                .journal
                .insert(&document_id, version, Action::Save)
                .await
                .unwrap();

            if i == 9 {
                storage
                    .transfer_log
                    .put(&remote, ReplicationDirection::Outbound, &change_id)
                    .await
                    .unwrap();
            }
            written.push((document_id, version, payload));
        }
        database_id
    };

    let storage = PersistentStorage::open(config).await.unwrap();
    assert_eq!(
        storage.metadata.database_id().unwrap(),
        Some(database_id)
    );
    assert_eq!(storage.journal.change_count().await, 20);
    assert_eq!(storage.bucket.list().await.unwrap().len(), 20);

    for (document_id, version, payload) in &written {
        let stored = storage
            .bucket
            .get(&BucketKey::new(document_id, version))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.as_bytes(), payload.as_slice());
    }

    let cursor = storage
        .transfer_log
        .get(&remote, ReplicationDirection::Outbound)
        .await
        .unwrap()
        .unwrap();
    let remaining = storage.journal.changes(Some(&cursor)).await.unwrap();
    assert_eq!(remaining.len(), 10);
    assert_eq!(remaining[0].document_id, written[10].0);
}
