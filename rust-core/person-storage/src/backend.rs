// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Core storage trait.
//
// Defines the `PersonStorage` trait that all backends must satisfy. The HTTP
// layer only ever talks to this trait, so backend-specific query translation
// (table joins, document arrays, map scans) stays behind it. Backends are
// expected to be thread-safe (`Send + Sync`) and fully asynchronous.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::model::{Person, PersonId};

/// A pluggable person store.
///
/// Lookups that match nothing return [`StorageError::NotFound`] rather than
/// an empty vector. Implementations must make `add`, `update` and `delete`
/// atomic with respect to their own existence checks; callers share one
/// instance across concurrent requests without extra locking.
#[async_trait]
pub trait PersonStorage: Send + Sync {
    /// Return every stored person.
    ///
    /// Fails with `NotFound` when the store is empty.
    async fn get_all(&self) -> Result<Vec<Person>, StorageError>;

    /// Insert a new person and return the record as stored.
    ///
    /// Fails with `AlreadyExists` if the identifier is taken; the stored
    /// record is left untouched in that case.
    async fn add(&self, person: Person) -> Result<Person, StorageError>;

    /// Look up a single person by identifier.
    async fn get_by_id(&self, id: PersonId) -> Result<Person, StorageError>;

    /// All persons whose name equals `name` (exact, case-sensitive).
    async fn get_by_name(&self, name: &str) -> Result<Vec<Person>, StorageError>;

    /// All persons with at least one communication equal to `value`.
    async fn get_by_communication(&self, value: &str) -> Result<Vec<Person>, StorageError>;

    /// Replace an existing person wholesale. Never creates.
    async fn update(&self, person: Person) -> Result<Person, StorageError>;

    /// Remove a person, returning the removed record.
    async fn delete(&self, id: PersonId) -> Result<Person, StorageError>;

    /// A human-readable name for this backend, used in logging.
    fn name(&self) -> &str;
}

/// Turn an empty match list into `NotFound`.
pub(crate) fn non_empty(
    persons: Vec<Person>,
    what: impl FnOnce() -> String,
) -> Result<Vec<Person>, StorageError> {
    if persons.is_empty() {
        Err(StorageError::NotFound(what()))
    } else {
        Ok(persons)
    }
}
