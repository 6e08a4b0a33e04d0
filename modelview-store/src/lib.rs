//! Persistent asset store.
//!
//! [`AssetStore`] keeps uploaded model files in a single named container of a
//! host-provided transactional [`StorageEngine`]. Every operation opens its
//! own connection, runs exactly one transaction and closes the connection
//! again, whether the transaction committed or not.

pub mod engine;
pub mod error;
pub mod fs;
pub mod memory;
pub mod store;

pub use engine::{EngineConnection, EngineError, StorageEngine, StoredAsset};
pub use error::{Result, StoreError};
pub use fs::FsEngine;
pub use memory::MemoryEngine;
pub use store::{AssetStore, StoreConfig};
