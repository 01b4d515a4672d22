//! Append-only journal storage
//!
//! This module provides the journal indexes shared by every journal and the
//! file-backed journal built on them.
//!
//! ## Storage Format
//!
//! The journal file contains length-prefixed, postcard-serialized changes:
//! ```text
//! [4 bytes: len][len bytes: serialized change][4 bytes: len][...]
//! ```

pub mod index;
pub mod journal_log;

pub use index::JournalIndex;
pub use journal_log::{FileJournal, FileJournalConfig};
