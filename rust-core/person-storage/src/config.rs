// SPDX-License-Identifier: PMPL-1.0-or-later
//! Storage configuration.
//!
//! The backend is chosen once at startup; [`open_storage`] turns the choice
//! into a single shared `PersonStorage` handle that is never swapped.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::backend::PersonStorage;
use crate::error::StorageError;
use crate::memory::InMemoryStorage;

/// File name of the document store inside the data directory.
pub const DOCUMENT_FILE: &str = "persons.redb";
/// File name of the relational store inside the data directory.
pub const RELATIONAL_FILE: &str = "persons.sqlite3";

/// Which persistence engine backs the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Process-local map; nothing survives a restart.
    #[default]
    Memory,
    /// One JSON document per person in a redb file.
    Document,
    /// `person` and `communication` tables in SQLite.
    Relational,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::Document => "document",
            BackendKind::Relational => "relational",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    /// Accepts the canonical names plus the engine names operators tend to
    /// type (`mongo`, `postgres`, `sql`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" | "in-memory" | "inmemory" => Ok(BackendKind::Memory),
            "document" | "mongo" => Ok(BackendKind::Document),
            "relational" | "sql" | "postgres" => Ok(BackendKind::Relational),
            other => Err(format!(
                "unknown storage backend `{other}` (expected memory, document or relational)"
            )),
        }
    }
}

/// Storage section of the service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Selected backend.
    pub backend: BackendKind,
    /// Directory holding on-disk database files.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            data_dir: PathBuf::from("./data"),
        }
    }
}

/// Build the storage handle described by `config`.
pub fn open_storage(config: &StorageConfig) -> Result<Arc<dyn PersonStorage>, StorageError> {
    let storage: Arc<dyn PersonStorage> = match config.backend {
        BackendKind::Memory => Arc::new(InMemoryStorage::new()),
        BackendKind::Document => open_document(config)?,
        BackendKind::Relational => open_relational(config)?,
    };
    info!(backend = storage.name(), "storage ready");
    Ok(storage)
}

#[cfg(feature = "document-store")]
fn open_document(config: &StorageConfig) -> Result<Arc<dyn PersonStorage>, StorageError> {
    let path = config.data_dir.join(DOCUMENT_FILE);
    Ok(Arc::new(crate::document::DocumentStorage::open(path)?))
}

#[cfg(not(feature = "document-store"))]
fn open_document(_config: &StorageConfig) -> Result<Arc<dyn PersonStorage>, StorageError> {
    Err(StorageError::BackendUnavailable(
        "built without the `document-store` feature".to_string(),
    ))
}

#[cfg(feature = "relational-store")]
fn open_relational(config: &StorageConfig) -> Result<Arc<dyn PersonStorage>, StorageError> {
    let path = config.data_dir.join(RELATIONAL_FILE);
    Ok(Arc::new(crate::relational::RelationalStorage::open(path)?))
}

#[cfg(not(feature = "relational-store"))]
fn open_relational(_config: &StorageConfig) -> Result<Arc<dyn PersonStorage>, StorageError> {
    Err(StorageError::BackendUnavailable(
        "built without the `relational-store` feature".to_string(),
    ))
}
