//! Journal records
//!
//! A [`Change`] records one mutation of one document. Its [`Sequence`] is the
//! journal-local insertion order; its [`ChangeId`] names the `(document,
//! version)` pair and is stable across peers, which makes it usable as a
//! replication cursor.

use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::FormatError;
use crate::identity::{CHANGE_ID_SEPARATOR, DocumentId};
use crate::version::Version;

/// Kind of mutation recorded by a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Save,
    Delete,
}

impl Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Save => write!(f, "SAVE"),
            Action::Delete => write!(f, "DELETE"),
        }
    }
}

/// Journal-local insertion order, starting at 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Sequence(u64);

impl Sequence {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out strictly increasing sequences
///
/// Safe under concurrent callers: no two calls ever return the same value.
#[derive(Debug)]
pub struct SequenceFactory {
    last: AtomicU64,
}

impl Default for SequenceFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceFactory {
    /// Factory for a fresh journal; the first sequence is 1
    pub fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Factory continuing after an already issued sequence (journal replay)
    pub fn resuming_after(last: Sequence) -> Self {
        Self {
            last: AtomicU64::new(last.0),
        }
    }

    /// Issue the next sequence
    pub fn next_sequence(&self) -> Sequence {
        Sequence(self.last.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// The most recently issued sequence, if any
    pub fn last_issued(&self) -> Option<Sequence> {
        match self.last.load(Ordering::SeqCst) {
            0 => None,
            n => Some(Sequence(n)),
        }
    }
}

/// Stable key of a `(document, version)` pair
///
/// Serializes as `"<document_id>_<edit_count>+<tiebreaker>"`, which is also
/// the persisted cursor format of transfer logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeId {
    pub document_id: DocumentId,
    pub version: Version,
}

impl ChangeId {
    pub fn new(document_id: DocumentId, version: Version) -> Self {
        Self {
            document_id,
            version,
        }
    }

    /// Parse the serialized form; exactly one separator with non-empty sides
    pub fn parse(input: &str) -> Result<Self, FormatError> {
        let invalid = || FormatError::InvalidChangeId(input.to_string());

        let mut parts = input.split(CHANGE_ID_SEPARATOR);
        let (Some(document_id), Some(version), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        if document_id.is_empty() || version.is_empty() {
            return Err(invalid());
        }

        let document_id = DocumentId::new(document_id).map_err(|_| invalid())?;
        let version = Version::parse(version).map_err(|_| invalid())?;
        Ok(Self::new(document_id, version))
    }
}

impl Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.document_id, CHANGE_ID_SEPARATOR, self.version)
    }
}

impl FromStr for ChangeId {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// One immutable journal record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Change {
    pub document_id: DocumentId,
    pub version: Version,
    pub action: Action,
    pub sequence: Sequence,
}

impl Change {
    pub fn new(document_id: DocumentId, version: Version, action: Action, sequence: Sequence) -> Self {
        Self {
            document_id,
            version,
            action,
            sequence,
        }
    }

    /// The `(document, version)` key of this change
    pub fn change_id(&self) -> ChangeId {
        ChangeId::new(self.document_id.clone(), self.version)
    }

    pub fn is_delete(&self) -> bool {
        self.action == Action::Delete
    }
}
