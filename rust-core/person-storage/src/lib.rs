// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Person storage abstraction.
//
// This crate provides the Person data model and the `PersonStorage` trait
// that every persistence engine implements, so the HTTP layer can stay
// unaware of which engine sits behind it.
//
// # Modules
//
// - [`model`] -- `Person`, `Communication` and the `PersonId` identifier.
// - [`backend`] -- The `PersonStorage` trait.
// - [`error`] -- The `StorageError` enum covering all backend failure modes.
// - [`memory`] -- An in-memory `BTreeMap`-based backend.
// - [`document`] -- A redb-backed document store (feature `document-store`).
// - [`relational`] -- A SQLite-backed relational store (feature `relational-store`).
// - [`config`] -- Configuration-time backend selection.
//
// # Example
//
// ```rust
// use person_storage::{InMemoryStorage, Person, PersonId, PersonStorage};
//
// # tokio_test::block_on(async {
// let storage = InMemoryStorage::new();
// let joe = Person::new(PersonId::new_v4(), "Joe", ["box@mail.ua"]);
//
// storage.add(joe.clone()).await.unwrap();
// let found = storage.get_by_communication("box@mail.ua").await.unwrap();
// assert_eq!(found, vec![joe]);
// # });
// ```

pub mod backend;
pub mod config;
pub mod error;
pub mod memory;
pub mod model;

#[cfg(feature = "document-store")]
pub mod document;
#[cfg(feature = "relational-store")]
pub mod relational;

pub use backend::PersonStorage;
pub use config::{open_storage, BackendKind, StorageConfig};
pub use error::StorageError;
pub use memory::InMemoryStorage;
pub use model::{Communication, Person, PersonId};

#[cfg(feature = "document-store")]
pub use document::DocumentStorage;
#[cfg(feature = "relational-store")]
pub use relational::RelationalStorage;
