//! File-backed bucket
//!
//! One file per stored document version, named by the BLAKE3 hash of its
//! bucket key so names have a fixed width whatever the document id.
//!
//! ```text
//! [4 bytes: key len][key bytes][document bytes]
//! ```
//!
//! The header keeps the key recoverable for [`Bucket::list`].

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use duet_core::{Document, DuetResult, StorageError};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, instrument};

use crate::{Bucket, BucketKey};

const TEMP_EXTENSION: &str = "tmp";

/// Configuration for the file bucket
#[derive(Debug, Clone)]
pub struct FileBucketConfig {
    /// Base directory for blob files
    pub base_dir: PathBuf,
    /// Whether to use a two-character shard directory per blob
    pub sharded: bool,
}

impl Default for FileBucketConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./data/bucket"),
            sharded: true,
        }
    }
}

/// Bucket storing each blob in its own file
pub struct FileBucket {
    config: FileBucketConfig,
    temp_counter: AtomicU64,
}

impl FileBucket {
    /// Create a file bucket, creating its base directory if needed
    pub async fn new(config: FileBucketConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.base_dir).await?;

        info!(path = %config.base_dir.display(), "File bucket initialized");

        Ok(Self {
            config,
            temp_counter: AtomicU64::new(0),
        })
    }

    /// Get the file path for a key
    fn blob_path(&self, key: &BucketKey) -> PathBuf {
        let name = hex::encode(blake3::hash(key.as_str().as_bytes()).as_bytes());
        let mut path = self.config.base_dir.clone();
        if self.config.sharded {
            path.push(&name[..2]);
        }
        path.push(name);
        path
    }

    /// Split a stored file into its key and content
    fn decode(path: &Path, data: Vec<u8>) -> Result<(String, Bytes), StorageError> {
        let corrupted = || StorageError::Corrupted(format!("Malformed blob file {}", path.display()));

        let len_bytes: [u8; 4] = data.get(..4).and_then(|b| b.try_into().ok()).ok_or_else(corrupted)?;
        let key_end = 4 + u32::from_be_bytes(len_bytes) as usize;
        let key = data
            .get(4..key_end)
            .and_then(|b| std::str::from_utf8(b).ok())
            .ok_or_else(corrupted)?
            .to_string();

        let mut content = Bytes::from(data);
        Ok((key, content.split_off(key_end)))
    }

    /// Read only the key header of a blob file
    async fn read_key(path: &Path) -> Result<String, StorageError> {
        let corrupted = || StorageError::Corrupted(format!("Malformed blob file {}", path.display()));

        let mut file = File::open(path).await?;
        let mut len_bytes = [0u8; 4];
        file.read_exact(&mut len_bytes).await.map_err(|_| corrupted())?;
        let mut key = vec![0u8; u32::from_be_bytes(len_bytes) as usize];
        file.read_exact(&mut key).await.map_err(|_| corrupted())?;
        String::from_utf8(key).map_err(|_| corrupted())
    }

    /// Collect keys from blob files directly inside `dir`
    async fn collect_keys(dir: &Path, keys: &mut Vec<BucketKey>) -> Result<(), StorageError> {
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == TEMP_EXTENSION) {
                continue;
            }
            keys.push(BucketKey::from_stored(Self::read_key(&path).await?));
        }
        Ok(())
    }
}

#[async_trait]
impl Bucket for FileBucket {
    async fn get(&self, key: &BucketKey) -> DuetResult<Option<Document>> {
        let path = self.blob_path(key);
        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let (stored_key, content) = Self::decode(&path, data)?;
        if stored_key != key.as_str() {
            return Err(StorageError::Corrupted(format!(
                "Blob file {} holds '{}', expected '{}'",
                path.display(),
                stored_key,
                key
            ))
            .into());
        }
        Ok(Some(Document::new(content)))
    }

    #[instrument(skip(self, document), fields(key = %key, size = document.len()))]
    async fn put(&self, key: &BucketKey, document: &Document) -> DuetResult<()> {
        let path = self.blob_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to a unique temp file, then rename into place
        let unique = self.temp_counter.fetch_add(1, Ordering::Relaxed);
        let temp_path = path.with_extension(format!("{}.{}", unique, TEMP_EXTENSION));

        let key_bytes = key.as_str().as_bytes();
        let mut file = File::create(&temp_path).await?;
        file.write_all(&(key_bytes.len() as u32).to_be_bytes()).await?;
        file.write_all(key_bytes).await?;
        file.write_all(document.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &path).await?;

        debug!("Stored blob");
        Ok(())
    }

    async fn remove(&self, key: &BucketKey) -> DuetResult<()> {
        match fs::remove_file(self.blob_path(key)).await {
            Ok(()) => {
                debug!(key = %key, "Removed blob");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> DuetResult<Vec<BucketKey>> {
        let mut keys = Vec::new();
        if self.config.sharded {
            let mut shards = fs::read_dir(&self.config.base_dir).await?;
            while let Some(shard) = shards.next_entry().await? {
                if shard.file_type().await?.is_dir() {
                    Self::collect_keys(&shard.path(), &mut keys).await?;
                }
            }
        } else {
            Self::collect_keys(&self.config.base_dir, &mut keys).await?;
        }
        Ok(keys)
    }
}
