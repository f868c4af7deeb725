// SPDX-License-Identifier: PMPL-1.0-or-later
//
// In-memory person storage.
//
// Uses a `BTreeMap` keyed by `PersonId` wrapped in a tokio `RwLock`. Results
// come back ordered by identifier. Intended for testing, development and the
// default zero-setup deployment; all data is lost on drop.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::backend::{non_empty, PersonStorage};
use crate::error::StorageError;
use crate::model::{Person, PersonId};

/// An in-memory person store backed by a sorted `BTreeMap`.
///
/// Thread-safe via `Arc<RwLock<...>>`; clones share the same data.
///
/// # Example
///
/// ```rust
/// use person_storage::{InMemoryStorage, Person, PersonId, PersonStorage};
///
/// # tokio_test::block_on(async {
/// let store = InMemoryStorage::new();
/// let id = PersonId::new_v4();
/// store.add(Person::new(id, "Joe", ["box@mail.ua"])).await.unwrap();
/// assert_eq!(store.get_by_id(id).await.unwrap().name, "Joe");
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    data: Arc<RwLock<BTreeMap<PersonId, Person>>>,
}

impl InMemoryStorage {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `persons`. Later duplicates win.
    pub fn with_persons(persons: impl IntoIterator<Item = Person>) -> Self {
        let data = persons.into_iter().map(|p| (p.id, p)).collect();
        Self {
            data: Arc::new(RwLock::new(data)),
        }
    }

    /// Return the number of persons currently stored.
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    /// Return true if the store holds no persons.
    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }

    async fn filter(&self, predicate: impl Fn(&Person) -> bool) -> Vec<Person> {
        let map = self.data.read().await;
        map.values().filter(|p| predicate(p)).cloned().collect()
    }
}

#[async_trait]
impl PersonStorage for InMemoryStorage {
    async fn get_all(&self) -> Result<Vec<Person>, StorageError> {
        let all = self.filter(|_| true).await;
        non_empty(all, || "store is empty".to_string())
    }

    async fn add(&self, person: Person) -> Result<Person, StorageError> {
        let mut map = self.data.write().await;
        match map.entry(person.id) {
            Entry::Occupied(_) => Err(StorageError::AlreadyExists(person.id)),
            Entry::Vacant(slot) => Ok(slot.insert(person).clone()),
        }
    }

    async fn get_by_id(&self, id: PersonId) -> Result<Person, StorageError> {
        let map = self.data.read().await;
        map.get(&id)
            .cloned()
            .ok_or_else(|| StorageError::not_found_id(id))
    }

    async fn get_by_name(&self, name: &str) -> Result<Vec<Person>, StorageError> {
        let matches = self.filter(|p| p.name == name).await;
        non_empty(matches, || format!("name {name}"))
    }

    async fn get_by_communication(&self, value: &str) -> Result<Vec<Person>, StorageError> {
        let matches = self.filter(|p| p.has_communication(value)).await;
        non_empty(matches, || format!("communication {value}"))
    }

    async fn update(&self, person: Person) -> Result<Person, StorageError> {
        let mut map = self.data.write().await;
        match map.get_mut(&person.id) {
            Some(stored) => {
                *stored = person;
                Ok(stored.clone())
            }
            None => Err(StorageError::not_found_id(person.id)),
        }
    }

    async fn delete(&self, id: PersonId) -> Result<Person, StorageError> {
        let mut map = self.data.write().await;
        map.remove(&id).ok_or_else(|| StorageError::not_found_id(id))
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
