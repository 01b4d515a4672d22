//! # Duet Core
//!
//! Core types, traits, and errors for Duet, an embeddable document store that
//! replicates bidirectionally between two peers without a coordinator.
//!
//! ## Key Traits
//!
//! - [`Journal`]: append-only change log with "latest version of" and
//!   "changes after cursor" queries
//! - [`TransferLog`]: resumable replication cursors
//! - [`ReplicationPeer`]: five-operation capability contract of a peer
//!
//! ## Key Types
//!
//! - [`Version`]: totally ordered revision `(edit_count, tiebreaker)`
//! - [`Sequence`]: journal-local insertion order
//! - [`ChangeId`]: `(document, version)` key used as a replication cursor
//! - [`Change`]: one journal record

pub mod change;
pub mod document;
pub mod error;
pub mod identity;
pub mod replication;
pub mod traits;
pub mod version;

// Re-export main types
pub use change::*;
pub use document::*;
pub use error::*;
pub use identity::*;
pub use replication::*;
pub use traits::*;
pub use version::*;
