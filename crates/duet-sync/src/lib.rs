//! # Duet Sync
//!
//! Resumable bidirectional replication between databases.
//!
//! ## Key Components
//!
//! - [`Replicator`]: runs the outbound and inbound passes between two
//!   [`ReplicationPeer`](duet_core::ReplicationPeer)s
//! - [`SyncError`]: first failure of a pass with its direction and remote peer
//!
//! ## Resumption
//!
//! Progress is recorded per remote database and direction in a
//! [`TransferLog`](duet_core::TransferLog). Changes the destination already
//! holds are skipped without fetching their content, so re-running a
//! replication after a failure only transfers what is still missing.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use duet_storage::InMemoryTransferLog;
//! use duet_sync::Replicator;
//!
//! let replicator = Replicator::new(Arc::new(InMemoryTransferLog::new()));
//! let events = replicator.replicate(&local, &remote).await?;
//! for event in events {
//!     println!("{} {}", event.action, event.document_id);
//! }
//! ```

pub mod error;
pub mod replicator;

// Re-exports
pub use error::{SyncError, SyncResult};
pub use replicator::Replicator;
