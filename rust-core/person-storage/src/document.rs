// SPDX-License-Identifier: PMPL-1.0-or-later
//
// redb-backed document store.
//
// Each person is one JSON document in a single redb table, keyed by the
// canonical identifier string. The document layout mirrors a classic
// document database record:
//
//   {"_id": "<uuid>", "name": "...", "communication": [{"value": "..."}]}
//
// # Design
//
// - Read transactions for lookups and scans (concurrent, lock-free).
// - Write transactions for add/update/delete; the existence check and the
//   mutation share one transaction, so `add` cannot race with itself.
// - Name and communication queries scan the table and filter decoded
//   documents; results come back in key order.
// - All redb work runs on `spawn_blocking`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::{non_empty, PersonStorage};
use crate::error::StorageError;
use crate::model::{Communication, Person, PersonId};

/// Table holding one JSON document per person.
const PERSONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("persons");

/// On-disk document shape.
#[derive(Debug, Serialize, Deserialize)]
struct PersonDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    #[serde(default)]
    communication: Vec<Communication>,
}

impl PersonDocument {
    fn from_person(person: &Person) -> Self {
        Self {
            id: person.id.to_string(),
            name: person.name.clone(),
            communication: person.communications.clone(),
        }
    }

    fn into_person(self) -> Result<Person, StorageError> {
        let id = self
            .id
            .parse::<PersonId>()
            .map_err(|e| StorageError::CorruptedData(format!("document _id {:?}: {e}", self.id)))?;
        Ok(Person {
            id,
            name: self.name,
            communications: self.communication,
        })
    }
}

fn encode(person: &Person) -> Result<Vec<u8>, StorageError> {
    Ok(serde_json::to_vec(&PersonDocument::from_person(person))?)
}

fn decode(bytes: &[u8]) -> Result<Person, StorageError> {
    serde_json::from_slice::<PersonDocument>(bytes)?.into_person()
}

fn unavailable(context: &str, err: impl Into<redb::Error>) -> StorageError {
    StorageError::BackendUnavailable(format!("{context}: {}", err.into()))
}

fn corrupted(context: &str, err: impl Into<redb::Error>) -> StorageError {
    StorageError::CorruptedData(format!("{context}: {}", err.into()))
}

/// A persistent document store powered by redb.
///
/// Thread-safe: `Database` is `Send + Sync` and serialises write
/// transactions internally.
///
/// # Example
///
/// ```rust,no_run
/// use person_storage::{DocumentStorage, Person, PersonId, PersonStorage};
///
/// # tokio_test::block_on(async {
/// let store = DocumentStorage::open("/tmp/persons.redb").unwrap();
/// let joe = Person::new(PersonId::new_v4(), "Joe", ["box@mail.ua"]);
/// store.add(joe.clone()).await.unwrap();
/// assert_eq!(store.get_by_id(joe.id).await.unwrap(), joe);
/// # });
/// ```
pub struct DocumentStorage {
    db: Arc<Database>,
    path: PathBuf,
}

impl DocumentStorage {
    /// Open or create a document store at the given path.
    ///
    /// Creates parent directories and the `persons` table if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(&path).map_err(|e| {
            StorageError::BackendUnavailable(format!(
                "failed to open redb at {}: {}",
                path.display(),
                e
            ))
        })?;

        let txn = db
            .begin_write()
            .map_err(|e| unavailable("write txn", e))?;
        txn.open_table(PERSONS_TABLE)
            .map_err(|e| unavailable("create table", e))?;
        txn.commit()
            .map_err(|e| corrupted("commit", e))?;

        debug!(path = %path.display(), "opened document store");

        Ok(Self {
            db: Arc::new(db),
            path,
        })
    }

    /// Return the filesystem path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `op` against the database on the blocking thread pool.
    async fn blocking<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, StorageError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| StorageError::BackendUnavailable(format!("task join: {e}")))?
    }
}

impl std::fmt::Debug for DocumentStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStorage")
            .field("path", &self.path)
            .finish()
    }
}

fn read_one(db: &Database, id: PersonId) -> Result<Person, StorageError> {
    let txn = db
        .begin_read()
        .map_err(|e| unavailable("read txn", e))?;
    let table = txn
        .open_table(PERSONS_TABLE)
        .map_err(|e| unavailable("open table", e))?;

    let key = id.to_string();
    match table.get(key.as_str()).map_err(|e| corrupted("get", e))? {
        Some(value) => decode(value.value()),
        None => Err(StorageError::not_found_id(id)),
    }
}

fn scan(db: &Database, predicate: impl Fn(&Person) -> bool) -> Result<Vec<Person>, StorageError> {
    let txn = db
        .begin_read()
        .map_err(|e| unavailable("read txn", e))?;
    let table = txn
        .open_table(PERSONS_TABLE)
        .map_err(|e| unavailable("open table", e))?;

    let mut results = Vec::new();
    for entry in table.iter().map_err(|e| corrupted("scan", e))? {
        let (_, value) = entry.map_err(|e| corrupted("scan entry", e))?;
        let person = decode(value.value())?;
        if predicate(&person) {
            results.push(person);
        }
    }
    Ok(results)
}

/// Write `person` under its id. `must_exist` selects update (true) or
/// insert (false) semantics; the check runs inside the write transaction.
fn write_one(db: &Database, person: &Person, must_exist: bool) -> Result<(), StorageError> {
    let key = person.id.to_string();
    let bytes = encode(person)?;

    let txn = db
        .begin_write()
        .map_err(|e| unavailable("write txn", e))?;
    {
        let mut table = txn
            .open_table(PERSONS_TABLE)
            .map_err(|e| unavailable("open table", e))?;
        let exists = table
            .get(key.as_str())
            .map_err(|e| corrupted("get", e))?
            .is_some();
        match (exists, must_exist) {
            (true, false) => return Err(StorageError::AlreadyExists(person.id)),
            (false, true) => return Err(StorageError::not_found_id(person.id)),
            _ => {}
        }
        table
            .insert(key.as_str(), bytes.as_slice())
            .map_err(|e| corrupted("insert", e))?;
    }
    txn.commit().map_err(|e| corrupted("commit", e))?;
    Ok(())
}

fn remove_one(db: &Database, id: PersonId) -> Result<Person, StorageError> {
    let key = id.to_string();

    let txn = db
        .begin_write()
        .map_err(|e| unavailable("write txn", e))?;
    let removed = {
        let mut table = txn
            .open_table(PERSONS_TABLE)
            .map_err(|e| unavailable("open table", e))?;
        let removed = table
            .remove(key.as_str())
            .map_err(|e| corrupted("remove", e))?;
        match removed {
            Some(value) => decode(value.value())?,
            None => return Err(StorageError::not_found_id(id)),
        }
    };
    txn.commit().map_err(|e| corrupted("commit", e))?;
    Ok(removed)
}

#[async_trait]
impl PersonStorage for DocumentStorage {
    async fn get_all(&self) -> Result<Vec<Person>, StorageError> {
        let all = self.blocking(|db| scan(db, |_| true)).await?;
        non_empty(all, || "store is empty".to_string())
    }

    async fn add(&self, person: Person) -> Result<Person, StorageError> {
        let id = person.id;
        self.blocking(move |db| {
            write_one(db, &person, false)?;
            read_one(db, id)
        })
        .await
        .inspect(|_| debug!(%id, "document inserted"))
    }

    async fn get_by_id(&self, id: PersonId) -> Result<Person, StorageError> {
        self.blocking(move |db| read_one(db, id)).await
    }

    async fn get_by_name(&self, name: &str) -> Result<Vec<Person>, StorageError> {
        let wanted = name.to_owned();
        let matches = self
            .blocking(move |db| scan(db, |p| p.name == wanted))
            .await?;
        non_empty(matches, || format!("name {name}"))
    }

    async fn get_by_communication(&self, value: &str) -> Result<Vec<Person>, StorageError> {
        let wanted = value.to_owned();
        let matches = self
            .blocking(move |db| scan(db, |p| p.has_communication(&wanted)))
            .await?;
        non_empty(matches, || format!("communication {value}"))
    }

    async fn update(&self, person: Person) -> Result<Person, StorageError> {
        let id = person.id;
        self.blocking(move |db| {
            write_one(db, &person, true)?;
            read_one(db, id)
        })
        .await
        .inspect(|_| debug!(%id, "document replaced"))
    }

    async fn delete(&self, id: PersonId) -> Result<Person, StorageError> {
        self.blocking(move |db| remove_one(db, id))
            .await
            .inspect(|_| debug!(%id, "document removed"))
    }

    fn name(&self) -> &str {
        "document"
    }
}
