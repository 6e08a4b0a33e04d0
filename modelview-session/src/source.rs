//! Load sources and stored-asset lookup

use std::sync::Arc;

use async_trait::async_trait;
use modelview_store::{AssetStore, StorageEngine, StoreError, StoredAsset};

/// What a load request asks the session to display.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadSource {
    /// An asset saved in the store, by name
    Stored(String),
    /// A blob handed over directly by the upload flow
    Blob { name: String, data: Arc<[u8]> },
    /// A location the loader resolves itself
    Url(String),
}

impl LoadSource {
    pub fn stored(name: impl Into<String>) -> Self {
        Self::Stored(name.into())
    }

    pub fn blob(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self::Blob {
            name: name.into(),
            data: data.into(),
        }
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }

    /// Human readable name for status lines and logs
    pub fn label(&self) -> &str {
        match self {
            Self::Stored(name) | Self::Blob { name, .. } => name,
            Self::Url(url) => url,
        }
    }
}

/// Input handed to a [`crate::SceneLoader`] once stored names are resolved.
#[derive(Debug, Clone)]
pub enum LoadInput {
    Bytes { name: String, data: Arc<[u8]> },
    Url(String),
}

impl LoadInput {
    pub fn name(&self) -> &str {
        match self {
            Self::Bytes { name, .. } => name,
            Self::Url(url) => url,
        }
    }
}

/// Read access to stored assets, as the session needs it.
#[async_trait]
pub trait AssetLookup: Send + Sync {
    async fn fetch(&self, name: &str) -> Result<Option<StoredAsset>, StoreError>;
}

#[async_trait]
impl<E: StorageEngine> AssetLookup for AssetStore<E> {
    async fn fetch(&self, name: &str) -> Result<Option<StoredAsset>, StoreError> {
        self.get(name).await
    }
}
