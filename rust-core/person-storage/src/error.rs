// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Storage error types.
//
// `AlreadyExists` and `NotFound` are the two conditions callers are expected
// to branch on. Every other variant is an opaque backend failure.

use thiserror::Error;

use crate::model::PersonId;

/// Errors that can occur when interacting with a person storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A person with this identifier is already stored.
    #[error("person already exists: {0}")]
    AlreadyExists(PersonId),

    /// Nothing matched the lookup.
    #[error("person not found: {0}")]
    NotFound(String),

    /// An I/O error occurred in the underlying storage layer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize or deserialize a stored record.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The stored data is corrupted or in an unexpected format.
    #[error("corrupted data: {0}")]
    CorruptedData(String),

    /// The storage backend is not available (e.g., file locked, feature disabled).
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl StorageError {
    pub(crate) fn not_found_id(id: PersonId) -> Self {
        Self::NotFound(format!("id {id}"))
    }

    /// True for [`StorageError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "relational-store")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        Self::BackendUnavailable(format!("sqlite: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_exists_display() {
        let id: PersonId = "02a883a3-13c4-4624-bbba-edc744f69534".parse().unwrap();
        let err = StorageError::AlreadyExists(id);
        assert_eq!(
            err.to_string(),
            "person already exists: 02a883a3-13c4-4624-bbba-edc744f69534"
        );
    }

    #[test]
    fn test_not_found_display() {
        let err = StorageError::NotFound("name Louis".to_string());
        assert_eq!(err.to_string(), "person not found: name Louis");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_io_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file gone");
        let err = StorageError::Io(io_err);
        assert!(err.to_string().contains("I/O error"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_serde_error_converts() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: StorageError = json_err.into();
        assert!(err.to_string().contains("serialization error"));
    }
}
