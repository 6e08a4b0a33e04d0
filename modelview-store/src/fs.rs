//! Directory-backed storage engine.
//!
//! Layout: `<root>/<database>/<container>/<hex(name)>.rec`, each file holding
//! one bincode-encoded [`StoredAsset`]. Names too long to hex-encode within
//! file name limits are stored as `sha256-<digest>.rec` instead. Writes go to
//! a temporary file that is renamed over the record, so readers see either
//! the old or the new record and never a partial one.

use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::engine::{EngineConnection, EngineError, StorageEngine, StoredAsset};

const RECORD_EXT: &str = "rec";

/// Longest hex file stem kept verbatim
const MAX_HEX_STEM: usize = 200;

// Distinct temp files for concurrent writers of the same record
static NEXT_TMP: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct FsEngine {
    root: PathBuf,
}

impl FsEngine {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl StorageEngine for FsEngine {
    type Connection = FsConnection;

    async fn open(&self, database: &str, container: &str) -> Result<FsConnection, EngineError> {
        let dir = self.root.join(database).join(container);
        match tokio::fs::create_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                return Err(EngineError::Denied(format!("{}: {e}", dir.display())));
            }
            Err(e) => return Err(e.into()),
        }

        // An existing file where the container should be is not usable storage.
        let meta = tokio::fs::metadata(&dir).await?;
        if !meta.is_dir() {
            return Err(EngineError::Denied(format!("{} is not a directory", dir.display())));
        }

        Ok(FsConnection { dir })
    }
}

pub struct FsConnection {
    dir: PathBuf,
}

impl FsConnection {
    fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{RECORD_EXT}", encode_name(name)))
    }

    async fn read_record(path: &Path) -> Result<Option<StoredAsset>, EngineError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => bincode::deserialize(&bytes)
                .map(Some)
                .map_err(|e| EngineError::Corrupt(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl EngineConnection for FsConnection {
    async fn put(&self, record: StoredAsset) -> Result<(), EngineError> {
        let path = self.record_path(&record.name);
        let tmp = path.with_extension(format!("{}.tmp", NEXT_TMP.fetch_add(1, Ordering::Relaxed)));
        let bytes = bincode::serialize(&record)
            .map_err(|e| EngineError::Aborted(format!("encoding {}: {e}", record.name)))?;

        let written = match tokio::fs::write(&tmp, &bytes).await {
            Ok(()) => tokio::fs::rename(&tmp, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            // Best effort cleanup
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(EngineError::Aborted(format!("writing {}: {e}", path.display())));
        }
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<StoredAsset>, EngineError> {
        let record = Self::read_record(&self.record_path(name)).await?;
        // Hashed stems could in principle collide
        Ok(record.filter(|r| r.name == name))
    }

    async fn get_all(&self) -> Result<Vec<StoredAsset>, EngineError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXT) {
                continue;
            }
            // Deleted between listing and reading
            if let Some(record) = Self::read_record(&path).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn delete(&self, name: &str) -> Result<(), EngineError> {
        match tokio::fs::remove_file(self.record_path(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn close(self) {}
}

/// File-system safe encoding of an asset name
fn encode_name(name: &str) -> String {
    if name.len() * 2 > MAX_HEX_STEM {
        return format!("sha256-{:x}", Sha256::digest(name.as_bytes()));
    }
    name.bytes().fold(String::with_capacity(name.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
