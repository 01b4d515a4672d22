//! # Duet Storage
//!
//! Storage backends for Duet databases.
//!
//! ## Features
//!
//! - **Journal**: [`InMemoryJournal`] and the file-backed [`FileJournal`]
//! - **Bucket trait**: content store addressed by `(document, version)`
//! - **InMemoryBucket / FileBucket**: bucket implementations
//! - **Transfer logs**: [`InMemoryTransferLog`] and the redb-backed [`RedbTransferLog`]
//! - **PersistentStorage**: all file-backed stores under one base directory
//!
//! ## Example
//!
//! ```rust,ignore
//! use duet_core::{Action, DocumentId, Journal, VersionFactory};
//! use duet_storage::InMemoryJournal;
//!
//! #[tokio::main]
//! async fn main() {
//!     let journal = InMemoryJournal::new();
//!     let versions = VersionFactory::new();
//!     let document_id = DocumentId::generate();
//!
//!     journal.insert(&document_id, versions.create(), Action::Save).await.unwrap();
//!
//!     let latest = journal.latest_change_of(&document_id).await.unwrap();
//!     assert_eq!(latest.unwrap().action, Action::Save);
//! }
//! ```

pub mod append_log;
pub mod blobs;
pub mod composite;
pub mod memory;
pub mod structured;

use std::fmt::{self, Display};

use async_trait::async_trait;
use duet_core::{DocumentId, DuetResult, Version};

// Re-exports
pub use append_log::{FileJournal, FileJournalConfig, JournalIndex};
pub use blobs::{FileBucket, FileBucketConfig};
pub use composite::{PersistentStorage, PersistentStorageConfig};
pub use memory::{InMemoryBucket, InMemoryJournal, InMemoryTransferLog};
pub use structured::{MetadataStore, RedbStorage, RedbStorageConfig, RedbTransferLog};

// Re-export the store contracts from duet-core for convenience
pub use duet_core::{Journal, TransferLog};

pub use duet_core::Document;

/// Key of one stored document version
///
/// Derived deterministically as `"<document_id>-<version>"`. The version part
/// never contains `-`, so the last `-` always splits the key unambiguously.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketKey(String);

impl BucketKey {
    /// Key of `document_id` at `version`
    pub fn new(document_id: &DocumentId, version: &Version) -> Self {
        Self(format!("{}-{}", document_id, version))
    }

    /// Rebuild a key from its stored string form
    pub(crate) fn from_stored(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Byte-blob content store
///
/// Buckets know nothing about journals; a blob becomes visible to readers
/// only once the journal records the matching change.
#[async_trait]
pub trait Bucket: Send + Sync {
    /// Read the content stored under a key
    async fn get(&self, key: &BucketKey) -> DuetResult<Option<Document>>;

    /// Store content under a key, replacing any previous content
    async fn put(&self, key: &BucketKey, document: &Document) -> DuetResult<()>;

    /// Remove the content under a key; removing a missing key is not an error
    async fn remove(&self, key: &BucketKey) -> DuetResult<()>;

    /// All stored keys, in no particular order
    async fn list(&self) -> DuetResult<Vec<BucketKey>>;
}
