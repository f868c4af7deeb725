// SPDX-License-Identifier: PMPL-1.0-or-later
//
// SQLite-backed relational store.
//
// Persons and their communications live in two tables joined on the person
// id. Communications keep their order through an explicit `position`
// column. Every mutation runs inside one SQL transaction, so the existence
// check and the write are atomic. The connection is shared behind a mutex
// and used from `spawn_blocking`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Params, Transaction};
use tracing::debug;

use crate::backend::{non_empty, PersonStorage};
use crate::error::StorageError;
use crate::model::{Communication, Person, PersonId};

const SCHEMA_SQL: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS person (
    id   TEXT PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS communication (
    person_id TEXT    NOT NULL REFERENCES person(id) ON DELETE CASCADE,
    position  INTEGER NOT NULL,
    value     TEXT    NOT NULL,
    PRIMARY KEY (person_id, position)
);

CREATE INDEX IF NOT EXISTS idx_person_name ON person(name);
CREATE INDEX IF NOT EXISTS idx_communication_value ON communication(value);
";

const PERSON_SELECT_SQL: &str = "SELECT id, name FROM person";

/// A relational person store on SQLite.
///
/// # Example
///
/// ```rust
/// use person_storage::{Person, PersonId, PersonStorage, RelationalStorage};
///
/// # tokio_test::block_on(async {
/// let store = RelationalStorage::in_memory().unwrap();
/// let joe = Person::new(PersonId::new_v4(), "Joe", ["box@mail.ua", "+380974583947"]);
/// store.add(joe.clone()).await.unwrap();
/// assert_eq!(store.get_by_name("Joe").await.unwrap(), vec![joe]);
/// # });
/// ```
pub struct RelationalStorage {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl RelationalStorage {
    /// Open or create a database file and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch(SCHEMA_SQL)?;

        debug!(path = %path.display(), "opened relational store");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path),
        })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Filesystem path of the database, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| {
                StorageError::BackendUnavailable("sqlite connection lock poisoned".to_string())
            })?;
            op(&mut guard)
        })
        .await
        .map_err(|e| StorageError::BackendUnavailable(format!("task join: {e}")))?
    }
}

impl std::fmt::Debug for RelationalStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationalStorage")
            .field("path", &self.path)
            .finish()
    }
}

fn load_communications(conn: &Connection, id: &str) -> Result<Vec<Communication>, StorageError> {
    let mut stmt = conn.prepare_cached(
        "SELECT value FROM communication WHERE person_id = ?1 ORDER BY position",
    )?;
    let rows = stmt.query_map(params![id], |row| Ok(Communication { value: row.get(0)? }))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn hydrate(conn: &Connection, id: String, name: String) -> Result<Person, StorageError> {
    let communications = load_communications(conn, &id)?;
    let id = id
        .parse::<PersonId>()
        .map_err(|e| StorageError::CorruptedData(format!("person.id {id:?}: {e}")))?;
    Ok(Person {
        id,
        name,
        communications,
    })
}

/// Run a `SELECT id, name ...` query and join each row with its communications.
fn query_persons(conn: &Connection, sql: &str, args: impl Params) -> Result<Vec<Person>, StorageError> {
    let mut stmt = conn.prepare_cached(sql)?;
    let heads = stmt
        .query_map(args, |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    heads
        .into_iter()
        .map(|(id, name)| hydrate(conn, id, name))
        .collect()
}

fn select_one(conn: &Connection, id: PersonId) -> Result<Person, StorageError> {
    let head = conn
        .query_row(
            &format!("{PERSON_SELECT_SQL} WHERE id = ?1"),
            params![id.to_string()],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;
    match head {
        Some((id, name)) => hydrate(conn, id, name),
        None => Err(StorageError::not_found_id(id)),
    }
}

fn insert_communications(
    tx: &Transaction<'_>,
    id: &str,
    communications: &[Communication],
) -> Result<(), StorageError> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO communication (person_id, position, value) VALUES (?1, ?2, ?3)",
    )?;
    for (position, communication) in communications.iter().enumerate() {
        stmt.execute(params![id, position as i64, communication.value])?;
    }
    Ok(())
}

fn insert_person(conn: &mut Connection, person: &Person) -> Result<(), StorageError> {
    let id = person.id.to_string();
    let tx = conn.transaction()?;
    match tx.execute(
        "INSERT INTO person (id, name) VALUES (?1, ?2)",
        params![id, person.name],
    ) {
        Ok(_) => {}
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            return Err(StorageError::AlreadyExists(person.id));
        }
        Err(e) => return Err(e.into()),
    }
    insert_communications(&tx, &id, &person.communications)?;
    tx.commit()?;
    Ok(())
}

fn replace_person(conn: &mut Connection, person: &Person) -> Result<(), StorageError> {
    let id = person.id.to_string();
    let tx = conn.transaction()?;
    let changed = tx.execute(
        "UPDATE person SET name = ?2 WHERE id = ?1",
        params![id, person.name],
    )?;
    if changed == 0 {
        return Err(StorageError::not_found_id(person.id));
    }
    tx.execute("DELETE FROM communication WHERE person_id = ?1", params![id])?;
    insert_communications(&tx, &id, &person.communications)?;
    tx.commit()?;
    Ok(())
}

fn remove_person(conn: &mut Connection, id: PersonId) -> Result<Person, StorageError> {
    let tx = conn.transaction()?;
    let person = select_one(&tx, id)?;
    let key = id.to_string();
    tx.execute("DELETE FROM communication WHERE person_id = ?1", params![key])?;
    tx.execute("DELETE FROM person WHERE id = ?1", params![key])?;
    tx.commit()?;
    Ok(person)
}

#[async_trait]
impl PersonStorage for RelationalStorage {
    async fn get_all(&self) -> Result<Vec<Person>, StorageError> {
        let all = self
            .blocking(|conn| query_persons(conn, &format!("{PERSON_SELECT_SQL} ORDER BY rowid"), params![]))
            .await?;
        non_empty(all, || "store is empty".to_string())
    }

    async fn add(&self, person: Person) -> Result<Person, StorageError> {
        let id = person.id;
        self.blocking(move |conn| {
            insert_person(conn, &person)?;
            select_one(conn, id)
        })
        .await
        .inspect(|_| debug!(%id, "person row inserted"))
    }

    async fn get_by_id(&self, id: PersonId) -> Result<Person, StorageError> {
        self.blocking(move |conn| select_one(conn, id)).await
    }

    async fn get_by_name(&self, name: &str) -> Result<Vec<Person>, StorageError> {
        let wanted = name.to_owned();
        let matches = self
            .blocking(move |conn| {
                query_persons(
                    conn,
                    &format!("{PERSON_SELECT_SQL} WHERE name = ?1 ORDER BY rowid"),
                    params![wanted],
                )
            })
            .await?;
        non_empty(matches, || format!("name {name}"))
    }

    async fn get_by_communication(&self, value: &str) -> Result<Vec<Person>, StorageError> {
        let wanted = value.to_owned();
        let matches = self
            .blocking(move |conn| {
                query_persons(
                    conn,
                    &format!(
                        "{PERSON_SELECT_SQL} WHERE id IN \
                         (SELECT person_id FROM communication WHERE value = ?1) ORDER BY rowid"
                    ),
                    params![wanted],
                )
            })
            .await?;
        non_empty(matches, || format!("communication {value}"))
    }

    async fn update(&self, person: Person) -> Result<Person, StorageError> {
        let id = person.id;
        self.blocking(move |conn| {
            replace_person(conn, &person)?;
            select_one(conn, id)
        })
        .await
        .inspect(|_| debug!(%id, "person row replaced"))
    }

    async fn delete(&self, id: PersonId) -> Result<Person, StorageError> {
        self.blocking(move |conn| remove_person(conn, id))
            .await
            .inspect(|_| debug!(%id, "person row deleted"))
    }

    fn name(&self) -> &str {
        "relational"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(id: &str, name: &str, comms: &[&str]) -> Person {
        Person::new(id.parse().unwrap(), name, comms.iter().copied())
    }

    const ID_1: &str = "02a883a3-13c4-4624-bbba-edc744f69534";
    const ID_2: &str = "02a883a3-13c4-4624-bbba-edc744f69535";

    #[tokio::test]
    async fn test_basic_crud() {
        let store = RelationalStorage::in_memory().unwrap();
        assert!(store.get_all().await.unwrap_err().is_not_found());

        let joe = person(ID_1, "Joe", &["box@mail.ua", "+380974583947"]);
        assert_eq!(store.add(joe.clone()).await.unwrap(), joe);
        assert_eq!(store.get_by_id(joe.id).await.unwrap(), joe);

        let louis = person(ID_1, "Louis", &["+380973224562"]);
        assert_eq!(store.update(louis.clone()).await.unwrap(), louis);

        assert_eq!(store.delete(joe.id).await.unwrap(), louis);
        assert!(store.get_by_id(joe.id).await.unwrap_err().is_not_found());
        assert!(store.delete(joe.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_primary_key_violation_is_already_exists() {
        let store = RelationalStorage::in_memory().unwrap();
        let joe = person(ID_1, "Joe", &["box@mail.ua"]);
        store.add(joe.clone()).await.unwrap();

        let err = store.add(person(ID_1, "Other", &["x"])).await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(id) if id == joe.id));
        // The rejected insert must not leak communications.
        assert_eq!(store.get_by_id(joe.id).await.unwrap(), joe);
        assert!(store.get_by_communication("x").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_update_absent_is_not_found() {
        let store = RelationalStorage::in_memory().unwrap();
        let err = store.update(person(ID_1, "Joe", &[])).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_communications_keep_order_and_duplicates() {
        let store = RelationalStorage::in_memory().unwrap();
        let joe = person(ID_1, "Joe", &["b", "a", "b"]);
        store.add(joe.clone()).await.unwrap();

        assert_eq!(store.get_by_id(joe.id).await.unwrap().communications, joe.communications);
        // A person matching through two rows is returned once.
        assert_eq!(store.get_by_communication("b").await.unwrap(), vec![joe]);
    }

    #[tokio::test]
    async fn test_queries_return_insertion_order() {
        let store = RelationalStorage::in_memory().unwrap();
        let p2 = person(ID_2, "Joe", &["box@mail.ua", "+380975345865"]);
        let p1 = person(ID_1, "Joe", &["box@mail.ua", "+380974583947"]);
        store.add(p2.clone()).await.unwrap();
        store.add(p1.clone()).await.unwrap();

        assert_eq!(store.get_all().await.unwrap(), vec![p2.clone(), p1.clone()]);
        assert_eq!(store.get_by_name("Joe").await.unwrap(), vec![p2.clone(), p1.clone()]);
        assert_eq!(store.get_by_communication("+380974583947").await.unwrap(), vec![p1]);
        assert!(store.get_by_name("Louis").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_open_file_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db").join("persons.sqlite3");
        let joe = person(ID_1, "Joe", &["box@mail.ua"]);

        {
            let store = RelationalStorage::open(&path).unwrap();
            store.add(joe.clone()).await.unwrap();
        }

        let store = RelationalStorage::open(&path).unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
        assert_eq!(store.get_by_id(joe.id).await.unwrap(), joe);
        assert_eq!(store.name(), "relational");
    }
}
