//! In-process storage engine.
//!
//! Keeps containers in memory behind a single lock, so each call is atomic.
//! It also counts open connections and can simulate host failures (denied
//! access, exhausted quota, failing reads or writes), which makes it the
//! engine of choice for exercising the store's error paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::engine::{EngineConnection, EngineError, StorageEngine, StoredAsset};

type Container = HashMap<String, Vec<u8>>;

#[derive(Default)]
struct Shared {
    containers: Mutex<HashMap<(String, String), Container>>,
    /// Total bytes of file data the engine accepts, across all containers
    quota: Mutex<Option<usize>>,
    denied: AtomicBool,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    open_connections: AtomicUsize,
    connections_opened: AtomicUsize,
}

/// Cloneable handle to an in-memory engine; clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryEngine {
    shared: Arc<Shared>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the total stored bytes; writes that would exceed it abort.
    pub fn set_quota(&self, bytes: Option<usize>) {
        *self.shared.quota.lock() = bytes;
    }

    /// Refuse every subsequent `open`.
    pub fn set_denied(&self, denied: bool) {
        self.shared.denied.store(denied, Ordering::SeqCst);
    }

    /// Make every subsequent read transaction fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.shared.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write transaction (put or delete) fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Connections opened and not yet closed
    pub fn open_connections(&self) -> usize {
        self.shared.open_connections.load(Ordering::SeqCst)
    }

    /// Connections opened over the engine's lifetime
    pub fn connections_opened(&self) -> usize {
        self.shared.connections_opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageEngine for MemoryEngine {
    type Connection = MemoryConnection;

    async fn open(&self, database: &str, container: &str) -> Result<MemoryConnection, EngineError> {
        if self.shared.denied.load(Ordering::SeqCst) {
            return Err(EngineError::Denied(format!("storage disabled for {database}")));
        }

        let key = (database.to_owned(), container.to_owned());
        self.shared.containers.lock().entry(key.clone()).or_default();
        self.shared.open_connections.fetch_add(1, Ordering::SeqCst);
        self.shared.connections_opened.fetch_add(1, Ordering::SeqCst);

        Ok(MemoryConnection {
            shared: Arc::clone(&self.shared),
            key,
        })
    }
}

pub struct MemoryConnection {
    shared: Arc<Shared>,
    key: (String, String),
}

impl MemoryConnection {
    fn check_reads(&self) -> Result<(), EngineError> {
        if self.shared.fail_reads.load(Ordering::SeqCst) {
            return Err(EngineError::Aborted("read failed".to_owned()));
        }
        Ok(())
    }

    fn check_writes(&self) -> Result<(), EngineError> {
        if self.shared.fail_writes.load(Ordering::SeqCst) {
            return Err(EngineError::Aborted("write failed".to_owned()));
        }
        Ok(())
    }

    fn with_container<T>(&self, f: impl FnOnce(&mut Container) -> T) -> T {
        let mut containers = self.shared.containers.lock();
        f(containers.entry(self.key.clone()).or_default())
    }
}

#[async_trait]
impl EngineConnection for MemoryConnection {
    async fn put(&self, record: StoredAsset) -> Result<(), EngineError> {
        // Let other tasks run between starting and committing the write.
        tokio::task::yield_now().await;
        self.check_writes()?;

        let quota = *self.shared.quota.lock();
        let mut containers = self.shared.containers.lock();
        if let Some(quota) = quota {
            let used: usize = containers
                .iter()
                .flat_map(|(key, c)| c.iter().map(move |(name, file)| (key, name, file)))
                .filter(|(key, name, _)| **key != self.key || **name != record.name)
                .map(|(_, _, file)| file.len())
                .sum();
            if used + record.file.len() > quota {
                return Err(EngineError::Aborted(format!(
                    "quota exceeded: {} + {} > {quota} bytes",
                    used,
                    record.file.len()
                )));
            }
        }

        containers
            .entry(self.key.clone())
            .or_default()
            .insert(record.name, record.file);
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<StoredAsset>, EngineError> {
        self.check_reads()?;
        Ok(self.with_container(|c| {
            c.get(name).map(|file| StoredAsset::new(name, file.clone()))
        }))
    }

    async fn get_all(&self) -> Result<Vec<StoredAsset>, EngineError> {
        self.check_reads()?;
        Ok(self.with_container(|c| {
            c.iter()
                .map(|(name, file)| StoredAsset::new(name.clone(), file.clone()))
                .collect()
        }))
    }

    async fn delete(&self, name: &str) -> Result<(), EngineError> {
        tokio::task::yield_now().await;
        self.check_writes()?;
        self.with_container(|c| c.remove(name));
        Ok(())
    }

    fn close(self) {}
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.shared.open_connections.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_containers_are_isolated() {
        let engine = MemoryEngine::new();
        let a = engine.open("db", "a").await.unwrap();
        let b = engine.open("db", "b").await.unwrap();

        a.put(StoredAsset::new("x", vec![1])).await.unwrap();
        assert!(b.get("x").await.unwrap().is_none());
        assert_eq!(a.get("x").await.unwrap().unwrap().file, vec![1]);
    }

    #[tokio::test]
    async fn test_connection_count_tracks_close() {
        let engine = MemoryEngine::new();
        let conn = engine.open("db", "models").await.unwrap();
        assert_eq!(engine.open_connections(), 1);

        conn.close();
        assert_eq!(engine.open_connections(), 0);
        assert_eq!(engine.connections_opened(), 1);
    }

    #[tokio::test]
    async fn test_quota_counts_replaced_record_once() {
        let engine = MemoryEngine::new();
        engine.set_quota(Some(10));
        let conn = engine.open("db", "models").await.unwrap();

        conn.put(StoredAsset::new("a", vec![0; 8])).await.unwrap();
        // Replacing "a" frees its old 8 bytes first
        conn.put(StoredAsset::new("a", vec![0; 10])).await.unwrap();

        let err = conn.put(StoredAsset::new("b", vec![0; 1])).await.unwrap_err();
        assert!(matches!(err, EngineError::Aborted(_)));
        assert!(conn.get("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failing_writes_leave_data_untouched() {
        let engine = MemoryEngine::new();
        let conn = engine.open("db", "models").await.unwrap();
        conn.put(StoredAsset::new("a", vec![1])).await.unwrap();

        engine.set_fail_writes(true);
        assert!(conn.put(StoredAsset::new("a", vec![2])).await.is_err());
        assert!(conn.delete("a").await.is_err());

        engine.set_fail_writes(false);
        assert_eq!(conn.get("a").await.unwrap().unwrap().file, vec![1]);
    }

    #[tokio::test]
    async fn test_denied_open() {
        let engine = MemoryEngine::new();
        engine.set_denied(true);
        assert!(matches!(
            engine.open("db", "models").await,
            Err(EngineError::Denied(_))
        ));
        assert_eq!(engine.open_connections(), 0);
    }
}
