//! File-backed journal
//!
//! Every change is appended to a single log file and replayed into a
//! [`JournalIndex`] when the journal is opened.

use std::io::{ErrorKind, SeekFrom};
use std::path::PathBuf;

use async_trait::async_trait;
use duet_core::{
    Action, Change, ChangeId, DocumentId, DuetResult, Journal, Sequence, SequenceFactory,
    StorageError, Version,
};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use super::index::JournalIndex;

/// Upper bound for a single serialized record
const MAX_RECORD_LEN: usize = 1024 * 1024;

/// Fill `buf`, returning `false` when the file ends first
async fn read_record_part<R: AsyncRead + Unpin>(
    reader: &mut R,
    buf: &mut [u8],
) -> Result<bool, StorageError> {
    match reader.read_exact(buf).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Configuration for a file-backed journal
#[derive(Debug, Clone)]
pub struct FileJournalConfig {
    /// Path of the journal log file
    pub path: PathBuf,
    /// Whether to sync each record to disk before publishing it
    pub sync_on_write: bool,
}

impl Default for FileJournalConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/journal.log"),
            sync_on_write: true,
        }
    }
}

/// Open log file and the offset just past its last intact record
struct LogFile {
    file: File,
    offset: u64,
}

/// Append-only journal persisted as length-prefixed postcard records
///
/// ```text
/// [4 bytes: len][len bytes: Change][4 bytes: len][...]
/// ```
pub struct FileJournal {
    config: FileJournalConfig,
    index: RwLock<JournalIndex>,
    log: Mutex<LogFile>,
    sequences: SequenceFactory,
}

impl FileJournal {
    /// Open (or create) the journal file and replay it
    #[instrument(skip(config), fields(path = %config.path.display()))]
    pub async fn open(config: FileJournalConfig) -> Result<Self, StorageError> {
        if let Some(parent) = config.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&config.path)
            .await?;

        let file_size = file.metadata().await?.len();
        let (index, valid_len) = Self::replay(&file, file_size).await?;

        if valid_len < file_size {
            warn!(
                valid_len = valid_len,
                file_size = file_size,
                "Truncating torn journal tail"
            );
            file.set_len(valid_len).await?;
            file.sync_all().await?;
        }
        file.seek(SeekFrom::Start(valid_len)).await?;

        let sequences = match index.last_sequence() {
            Some(last) => SequenceFactory::resuming_after(last),
            None => SequenceFactory::new(),
        };

        info!(changes = index.len(), "Opened journal");

        Ok(Self {
            config,
            index: RwLock::new(index),
            log: Mutex::new(LogFile {
                file,
                offset: valid_len,
            }),
            sequences,
        })
    }

    /// Rebuild the index, returning it with the length of the intact prefix
    ///
    /// Only a record cut short by the end of the file is treated as a torn
    /// tail. A complete record that cannot be read is corruption.
    async fn replay(file: &File, file_size: u64) -> Result<(JournalIndex, u64), StorageError> {
        let mut reader = BufReader::new(file.try_clone().await?);
        let mut index = JournalIndex::new();
        let mut offset = 0u64;

        while offset < file_size {
            let mut len_buf = [0u8; 4];
            if !read_record_part(&mut reader, &mut len_buf).await? {
                warn!(offset = offset, "Torn journal record header");
                break;
            }

            let record_len = u32::from_be_bytes(len_buf) as usize;
            if record_len == 0 || record_len > MAX_RECORD_LEN {
                return Err(StorageError::Corrupted(format!(
                    "Invalid journal record length {} at offset {}",
                    record_len, offset
                )));
            }

            let mut record = vec![0u8; record_len];
            if !read_record_part(&mut reader, &mut record).await? {
                warn!(offset = offset, len = record_len, "Torn journal record");
                break;
            }

            let change = postcard::from_bytes::<Change>(&record).map_err(|e| {
                StorageError::Corrupted(format!(
                    "Undecodable journal record at offset {}: {}",
                    offset, e
                ))
            })?;
            index.apply(change);

            offset += 4 + record_len as u64;
        }

        debug!(changes = index.len(), "Replayed journal");
        Ok((index, offset))
    }

    /// Append one record at the end of the intact log
    async fn write_record(&self, change: &Change) -> Result<(), StorageError> {
        let record =
            postcard::to_allocvec(change).map_err(|e| StorageError::serialization(e.to_string()))?;
        let len_bytes = (record.len() as u32).to_be_bytes();

        let mut log = self.log.lock().await;
        let start = log.offset;

        let written = async {
            log.file.seek(SeekFrom::Start(start)).await?;
            log.file.write_all(&len_bytes).await?;
            log.file.write_all(&record).await?;
            log.file.flush().await?;
            if self.config.sync_on_write {
                log.file.sync_data().await?;
            }
            Ok::<(), std::io::Error>(())
        }
        .await;

        match written {
            Ok(()) => {
                log.offset = start + 4 + record.len() as u64;
                Ok(())
            }
            Err(e) => {
                if let Err(truncate_err) = log.file.set_len(start).await {
                    warn!(error = %truncate_err, "Failed to discard partial journal record");
                }
                Err(e.into())
            }
        }
    }

    /// Total number of recorded changes
    pub async fn change_count(&self) -> usize {
        self.index.read().await.len()
    }

    /// Path of the log file
    pub fn path(&self) -> &PathBuf {
        &self.config.path
    }

    /// Flush and sync the log file
    pub async fn sync(&self) -> Result<(), StorageError> {
        let log = self.log.lock().await;
        log.file.sync_all().await?;
        Ok(())
    }
}

#[async_trait]
impl Journal for FileJournal {
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

        let sequence: Sequence = self.sequences.next_sequence();
        let change = Change::new(document_id.clone(), version, action, sequence);
        self.write_record(&change).await?;
        index.apply(change);

        debug!(sequence = %sequence, action = %action, "Inserted change");
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
