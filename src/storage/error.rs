//! Storage layer error types
//!
//! All errors that can occur while reading or writing the metadata directory
//! are defined here. We use `thiserror` for ergonomic error definition.

use thiserror::Error;

use crate::storage::types::CommitId;

/// the main error type for storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// no commit record exists for the requested hash
    #[error("commit not found: {0}")]
    CommitNotFound(CommitId),

    /// the specified branch/ref was not found
    #[error("ref not found: {0}")]
    RefNotFound(String),

    /// I/O error (filesystem level)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// internal error that shouldn't happen
    #[error("internal error: {0}")]
    Internal(String),
}

impl StorageError {
    /// check if this error indicates the resource doesn't exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::CommitNotFound(_) | StorageError::RefNotFound(_)
        )
    }

    /// check if this error came from the filesystem
    pub fn is_io(&self) -> bool {
        matches!(self, StorageError::Io(_))
    }
}

/// result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let not_found = StorageError::CommitNotFound(CommitId::new("abc123"));
        assert!(not_found.is_not_found());
        assert!(!not_found.is_io());

        let io = StorageError::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert!(!io.is_not_found());
        assert!(io.is_io());
    }

    #[test]
    fn test_error_messages() {
        let err = StorageError::CommitNotFound(CommitId::new("abc123"));
        assert_eq!(err.to_string(), "commit not found: abc123");

        let err = StorageError::RefNotFound("feature".into());
        assert_eq!(err.to_string(), "ref not found: feature");
    }
}
