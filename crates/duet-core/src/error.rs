//! Error types for Duet

use thiserror::Error;

/// Top-level error type for journal, peer, and database operations
#[derive(Debug, Error)]
pub enum DuetError {
    /// A document id or change id has no corresponding record
    #[error("Not found: {0}")]
    NotFound(String),

    /// A serialized identifier could not be parsed
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// An action/document combination violates the apply contract
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The underlying store is unavailable or failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl DuetError {
    /// Create a new NotFound error
    pub fn not_found(item: impl Into<String>) -> Self {
        Self::NotFound(item.into())
    }

    /// Create a new InvalidArgument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Whether this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type for Duet operations
pub type DuetResult<T> = Result<T, DuetError>;

/// Errors raised while parsing serialized identifiers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("Unsupported version format '{0}'")]
    InvalidVersion(String),

    #[error("Unsupported change id format '{0}'")]
    InvalidChangeId(String),

    #[error("Unsupported document id '{0}'")]
    InvalidDocumentId(String),
}

/// Infrastructure failures of the underlying stores
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupted record: {0}")]
    Corrupted(String),
}

impl StorageError {
    /// Create a new I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    /// Create a new Serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Create a new Deserialization error
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::Deserialization(message.into())
    }

    /// Create a new Database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl From<std::io::Error> for DuetError {
    fn from(err: std::io::Error) -> Self {
        DuetError::Storage(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = DuetError::not_found("doc-1");
        assert!(err.is_not_found());
        assert!(err.to_string().contains("doc-1"));
    }

    #[test]
    fn test_format_error_conversion() {
        let err: DuetError = FormatError::InvalidVersion("1_2".into()).into();
        assert!(matches!(err, DuetError::Format(FormatError::InvalidVersion(_))));
        assert!(err.to_string().contains("1_2"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DuetError = io_err.into();
        assert!(matches!(err, DuetError::Storage(StorageError::Io(_))));
    }

    #[test]
    fn test_invalid_argument_display() {
        let err = DuetError::invalid_argument("action 'SAVE' without document");
        assert!(format!("{}", err).contains("Invalid argument"));
    }
}
