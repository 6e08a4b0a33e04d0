//! Error types for the viewer session

use std::sync::Arc;

use modelview_core::NormalizeError;
use modelview_store::StoreError;
use thiserror::Error;

use crate::loader::LoadError;

#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// The loader could not produce a scene.
    #[error("failed to load {source_label}: {cause}")]
    LoadFailed {
        source_label: String,
        #[source]
        cause: LoadError,
    },

    /// The scene decoded but has no extent to normalize.
    #[error("cannot frame {source_label}: {cause}")]
    DegenerateGeometry {
        source_label: String,
        #[source]
        cause: NormalizeError,
    },

    /// Resolving a stored asset failed in the store itself.
    #[error("cannot read {source_label} from the store: {cause}")]
    Store {
        source_label: String,
        #[source]
        cause: Arc<StoreError>,
    },

    #[error("no stored asset source configured")]
    NoStore,

    #[error("nothing to retry: {0}")]
    NothingToRetry(&'static str),
}

impl SessionError {
    pub fn is_load_failed(&self) -> bool {
        matches!(self, Self::LoadFailed { .. })
    }
}
