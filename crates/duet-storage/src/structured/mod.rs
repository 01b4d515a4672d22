//! Structured storage using redb
//!
//! Holds the mutable state of a persistent database:
//! - Replication cursors per remote database and direction
//! - Database metadata such as its persisted id

mod metadata;
mod tables;
mod transfer_log;

pub use metadata::MetadataStore;
pub use tables::{META, RedbStorage, RedbStorageConfig, ScanResults, TRANSFER_LOG};
pub use transfer_log::RedbTransferLog;
