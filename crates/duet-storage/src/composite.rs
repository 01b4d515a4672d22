//! File-backed stores of one database under a single base directory
//!
//! ```text
//! <base_dir>/
//!   journal.log   FileJournal
//!   bucket/       FileBucket
//!   duet.redb     RedbTransferLog + MetadataStore
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use duet_core::StorageError;
use tracing::{info, instrument};

use crate::append_log::{FileJournal, FileJournalConfig};
use crate::blobs::{FileBucket, FileBucketConfig};
use crate::structured::{MetadataStore, RedbStorage, RedbStorageConfig, RedbTransferLog};

/// Configuration for persistent storage
#[derive(Debug, Clone)]
pub struct PersistentStorageConfig {
    /// Base directory for all storage
    pub base_dir: PathBuf,
    pub journal: FileJournalConfig,
    pub bucket: FileBucketConfig,
    pub redb: RedbStorageConfig,
}

impl Default for PersistentStorageConfig {
    fn default() -> Self {
        Self::with_base_dir("./data")
    }
}

impl PersistentStorageConfig {
    /// Create a configuration with every store under `base_dir`
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            journal: FileJournalConfig {
                path: base_dir.join("journal.log"),
                ..Default::default()
            },
            bucket: FileBucketConfig {
                base_dir: base_dir.join("bucket"),
                ..Default::default()
            },
            redb: RedbStorageConfig {
                db_path: base_dir.join("duet.redb"),
            },
            base_dir,
        }
    }

    /// Set whether journal records are synced to disk on every insert
    pub fn with_sync_on_write(mut self, sync_on_write: bool) -> Self {
        self.journal.sync_on_write = sync_on_write;
        self
    }
}

/// Opened file-backed stores
pub struct PersistentStorage {
    pub journal: Arc<FileJournal>,
    pub bucket: Arc<FileBucket>,
    pub transfer_log: Arc<RedbTransferLog>,
    pub metadata: MetadataStore,
    config: PersistentStorageConfig,
}

impl PersistentStorage {
    /// Open (or create) every store
    #[instrument(skip(config), fields(base_dir = %config.base_dir.display()))]
    pub async fn open(config: PersistentStorageConfig) -> Result<Self, StorageError> {
        tokio::fs::create_dir_all(&config.base_dir).await?;

        let redb = Arc::new(RedbStorage::open(config.redb.clone())?);
        let journal = Arc::new(FileJournal::open(config.journal.clone()).await?);
        let bucket = Arc::new(FileBucket::new(config.bucket.clone()).await?);

        info!("Persistent storage initialized");

        Ok(Self {
            journal,
            bucket,
            transfer_log: Arc::new(RedbTransferLog::new(redb.clone())),
            metadata: MetadataStore::new(redb),
            config,
        })
    }

    pub fn config(&self) -> &PersistentStorageConfig {
        &self.config
    }
}
