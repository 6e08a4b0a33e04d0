//! The asset store

use serde::{Deserialize, Serialize};

use crate::engine::{EngineConnection, StorageEngine, StoredAsset};
use crate::error::{Result, StoreError};

/// Where the store keeps its records inside the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database: String,
    pub container: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: "ModelUploaderDB".to_owned(),
            container: "models".to_owned(),
        }
    }
}

/// Asynchronous CRUD over [`StoredAsset`] records.
///
/// Holds no connection between calls. Concurrent operations each get their
/// own connection and are ordered only by the engine's transactions, so two
/// racing saves of one name end with whichever committed last.
pub struct AssetStore<E> {
    engine: E,
    config: StoreConfig,
}

impl<E: StorageEngine> AssetStore<E> {
    pub fn new(engine: E) -> Self {
        Self::with_config(engine, StoreConfig::default())
    }

    pub fn with_config(engine: E, config: StoreConfig) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Open a connection to the asset container, initializing it on first use.
    ///
    /// Callers own the connection and must close it.
    pub async fn open(&self) -> Result<E::Connection> {
        let conn = self
            .engine
            .open(&self.config.database, &self.config.container)
            .await
            .map_err(|e| {
                log::warn!("Cannot open {}/{}: {}", self.config.database, self.config.container, e);
                StoreError::StoreUnavailable(e)
            })?;
        log::debug!("Opened {}/{}", self.config.database, self.config.container);
        Ok(conn)
    }

    /// Insert or overwrite the asset called `name`.
    pub async fn save(&self, name: &str, file: impl Into<Vec<u8>>) -> Result<()> {
        check_name(name)?;
        let conn = self.open().await?;
        let result = conn.put(StoredAsset::new(name, file)).await;
        conn.close();

        result.map_err(|e| transaction_failed("save", name, e))?;
        log::debug!("Saved asset {}", name);
        Ok(())
    }

    /// Every stored asset, in no particular order.
    pub async fn list_all(&self) -> Result<Vec<StoredAsset>> {
        let conn = self.open().await?;
        let result = conn.get_all().await;
        conn.close();

        let records = result.map_err(|e| transaction_failed("list", &self.config.container, e))?;
        log::debug!("Listed {} assets", records.len());
        Ok(records)
    }

    /// The asset called `name`, if stored.
    pub async fn get(&self, name: &str) -> Result<Option<StoredAsset>> {
        check_name(name)?;
        let conn = self.open().await?;
        let result = conn.get(name).await;
        conn.close();

        result.map_err(|e| transaction_failed("get", name, e))
    }

    /// Delete the asset called `name`. Deleting an absent asset succeeds.
    pub async fn delete(&self, name: &str) -> Result<()> {
        check_name(name)?;
        let conn = self.open().await?;
        let result = conn.delete(name).await;
        conn.close();

        result.map_err(|e| transaction_failed("delete", name, e))?;
        log::debug!("Deleted asset {}", name);
        Ok(())
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(StoreError::InvalidArgument("asset name must not be empty"));
    }
    Ok(())
}

fn transaction_failed(
    operation: &'static str,
    target: &str,
    source: crate::EngineError,
) -> StoreError {
    log::warn!("{} transaction failed for {}: {}", operation, target, source);
    StoreError::Transaction {
        operation,
        target: target.to_owned(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryEngine;

    #[tokio::test]
    async fn test_save_then_get() {
        let store = AssetStore::new(MemoryEngine::new());
        store.save("cube.glb", vec![1, 2, 3]).await.unwrap();

        let asset = store.get("cube.glb").await.unwrap().unwrap();
        assert_eq!(asset.name, "cube.glb");
        assert_eq!(asset.file, vec![1, 2, 3]);
        assert!(store.get("missing.glb").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_every_operation_closes_its_connection() {
        let engine = MemoryEngine::new();
        let store = AssetStore::new(engine.clone());

        store.save("a", vec![0]).await.unwrap();
        store.list_all().await.unwrap();
        store.get("a").await.unwrap();
        store.delete("a").await.unwrap();

        assert_eq!(engine.connections_opened(), 4);
        assert_eq!(engine.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_empty_names_rejected_without_opening() {
        let engine = MemoryEngine::new();
        let store = AssetStore::new(engine.clone());

        assert!(matches!(store.delete("").await, Err(StoreError::InvalidArgument(_))));
        assert!(matches!(store.get("").await, Err(StoreError::InvalidArgument(_))));
        assert!(matches!(store.save("", vec![1]).await, Err(StoreError::InvalidArgument(_))));
        assert_eq!(engine.connections_opened(), 0);
    }

    #[tokio::test]
    async fn test_custom_container() {
        let engine = MemoryEngine::new();
        let previews = AssetStore::with_config(
            engine.clone(),
            StoreConfig {
                database: "ModelUploaderDB".to_owned(),
                container: "previews".to_owned(),
            },
        );
        let models = AssetStore::new(engine);

        previews.save("a", vec![1]).await.unwrap();
        assert!(models.list_all().await.unwrap().is_empty());
    }
}
