//! # Duet Database
//!
//! Document database that converges with its peers through replication.
//!
//! ## Example
//!
//! ```rust,ignore
//! use duet_core::Document;
//! use duet_database::Database;
//!
//! let laptop = Database::in_memory();
//! let phone = Database::in_memory();
//!
//! let id = laptop.create(&Document::from("draft")).await?;
//! phone.replicate(&laptop).await?;
//!
//! assert_eq!(phone.get(&id).await?, Some(Document::from("draft")));
//! ```

pub mod config;
pub mod database;

// Re-exports
pub use config::DatabaseConfig;
pub use database::Database;

pub use duet_core::{Document, DocumentId, DuetError, DuetResult, ReplicationEvent};
pub use duet_sync::{SyncError, SyncResult};
