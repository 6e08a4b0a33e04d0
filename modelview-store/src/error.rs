//! Error types for the asset store

use thiserror::Error;

use crate::engine::EngineError;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Persistent storage could not be opened.
    #[error("persistent storage unavailable: {0}")]
    StoreUnavailable(#[source] EngineError),

    /// A read, write or delete transaction aborted or errored.
    #[error("{operation} transaction failed for {target}: {source}")]
    Transaction {
        operation: &'static str,
        target: String,
        #[source]
        source: EngineError,
    },

    /// Malformed call, rejected before touching storage.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

impl StoreError {
    pub fn is_transaction(&self) -> bool {
        matches!(self, Self::Transaction { .. })
    }
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
