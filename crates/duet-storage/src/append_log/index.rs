//! In-memory journal indexes
//!
//! Three views of the same set of changes:
//!
//! ```text
//! documents:    DocumentId -> { Version -> Change }   (latest version, exists, list)
//! by_sequence:  Sequence   -> Change                  (ordered streaming)
//! by_change_id: ChangeId   -> Sequence                (cursor resolution)
//! ```
//!
//! Journals keep one [`JournalIndex`] behind a single lock and update all
//! three views in [`JournalIndex::apply`].

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use duet_core::{Change, ChangeId, DocumentId, DuetError, DuetResult, Sequence, Version};

/// Per-document version sets plus the sequence and change-id indexes
#[derive(Debug, Default)]
pub struct JournalIndex {
    documents: HashMap<DocumentId, BTreeMap<Version, Change>>,
    by_sequence: BTreeMap<Sequence, Change>,
    by_change_id: HashMap<ChangeId, Sequence>,
}

impl JournalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a change in all views
    pub fn apply(&mut self, change: Change) {
        self.by_change_id.insert(change.change_id(), change.sequence);
        self.by_sequence.insert(change.sequence, change.clone());
        self.documents
            .entry(change.document_id.clone())
            .or_default()
            .insert(change.version, change);
    }

    /// Sequence already assigned to a `(document, version)` pair
    pub fn sequence_of(&self, change_id: &ChangeId) -> Option<Sequence> {
        self.by_change_id.get(change_id).copied()
    }

    pub fn latest_change_of(&self, document_id: &DocumentId) -> Option<Change> {
        self.documents
            .get(document_id)
            .and_then(|versions| versions.last_key_value())
            .map(|(_, change)| change.clone())
    }

    pub fn exists(&self, document_id: &DocumentId, version: &Version) -> bool {
        self.documents
            .get(document_id)
            .is_some_and(|versions| versions.contains_key(version))
    }

    /// Documents whose latest change is a save
    pub fn list(&self) -> Vec<DocumentId> {
        self.documents
            .iter()
            .filter_map(|(document_id, versions)| {
                let (_, latest) = versions.last_key_value()?;
                (!latest.is_delete()).then(|| document_id.clone())
            })
            .collect()
    }

    /// Snapshot of changes in sequence order, strictly after `latest_seen`
    pub fn changes(&self, latest_seen: Option<&ChangeId>) -> DuetResult<Vec<Change>> {
        let lower = match latest_seen {
            Some(change_id) => {
                let sequence = self
                    .sequence_of(change_id)
                    .ok_or_else(|| DuetError::not_found(format!("Unknown change id '{}'", change_id)))?;
                Bound::Excluded(sequence)
            }
            None => Bound::Unbounded,
        };

        Ok(self
            .by_sequence
            .range((lower, Bound::Unbounded))
            .map(|(_, change)| change.clone())
            .collect())
    }

    /// Highest sequence recorded
    pub fn last_sequence(&self) -> Option<Sequence> {
        self.by_sequence.last_key_value().map(|(sequence, _)| *sequence)
    }

    /// Total number of changes
    pub fn len(&self) -> usize {
        self.by_sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_sequence.is_empty()
    }
}
