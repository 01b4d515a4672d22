//! Document and database identifiers
//!
//! - [`DocumentId`]: identifies one logical document, never reused
//! - [`DatabaseId`]: identifies one database instance taking part in replication

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FormatError;

/// Separator between the document id and the version in a serialized change id.
///
/// Document ids may never contain it.
pub const CHANGE_ID_SEPARATOR: char = '_';

/// Opaque identifier of a logical document
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    /// Create a document id, rejecting values that would make change ids ambiguous
    pub fn new(value: impl Into<String>) -> Result<Self, FormatError> {
        let value = value.into();
        if value.is_empty() || value.contains(CHANGE_ID_SEPARATOR) {
            return Err(FormatError::InvalidDocumentId(value));
        }
        Ok(Self(value))
    }

    /// Generate a fresh random document id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = FormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for DocumentId {
    type Error = FormatError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

/// Identity of a database instance
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DatabaseId(String);

impl DatabaseId {
    /// Create a database id from any string
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generate a fresh random database id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short display form (for logging)
    pub fn short_id(&self) -> &str {
        let end = self.0.char_indices().nth(8).map(|(i, _)| i).unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl Display for DatabaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DatabaseId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_rejects_separator() {
        assert!(DocumentId::new("some-+some").is_ok());
        assert_eq!(
            DocumentId::new("a_b"),
            Err(FormatError::InvalidDocumentId("a_b".into()))
        );
        assert!(DocumentId::new("").is_err());
    }

    #[test]
    fn test_generated_document_ids_are_valid_and_distinct() {
        let a = DocumentId::generate();
        let b = DocumentId::generate();
        assert_ne!(a, b);
        assert!(DocumentId::new(a.as_str()).is_ok());
    }

    #[test]
    fn test_database_id_short() {
        let id = DatabaseId::new("0123456789abcdef");
        assert_eq!(id.short_id(), "01234567");
        assert_eq!(DatabaseId::new("abc").short_id(), "abc");
    }
}
