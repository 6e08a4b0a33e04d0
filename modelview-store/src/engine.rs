//! Storage engine interface.
//!
//! The engine is provided by the host: a browser's object store, a directory
//! on disk, or an in-process map in tests. Each call on an
//! [`EngineConnection`] is one atomic transaction over a single container.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A persisted asset record, keyed by `name`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAsset {
    pub name: String,
    pub file: Vec<u8>,
}

impl StoredAsset {
    pub fn new(name: impl Into<String>, file: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
        }
    }
}

impl std::fmt::Debug for StoredAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredAsset")
            .field("name", &self.name)
            .field("file", &format_args!("<{} bytes>", self.file.len()))
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// The host refused access to storage (permissions, disabled storage).
    #[error("access denied: {0}")]
    Denied(String),
    /// The transaction was rolled back, e.g. because the quota ran out.
    #[error("transaction aborted: {0}")]
    Aborted(String),
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A transactional key-value engine holding named containers.
#[async_trait]
pub trait StorageEngine: Send + Sync {
    type Connection: EngineConnection;

    /// Open `container` inside `database`, creating both on first use.
    async fn open(&self, database: &str, container: &str)
        -> Result<Self::Connection, EngineError>;
}

/// An open connection to one container.
#[async_trait]
pub trait EngineConnection: Send + Sync {
    /// Insert or replace the record with the same name.
    async fn put(&self, record: StoredAsset) -> Result<(), EngineError>;

    async fn get(&self, name: &str) -> Result<Option<StoredAsset>, EngineError>;

    /// Every record in the container, in no particular order.
    async fn get_all(&self) -> Result<Vec<StoredAsset>, EngineError>;

    /// Remove the record if present. Removing an absent name succeeds.
    async fn delete(&self, name: &str) -> Result<(), EngineError>;

    /// Release the connection.
    fn close(self);
}
