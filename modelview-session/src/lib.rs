//! Viewer session.
//!
//! Sequences load -> normalize -> display for a single active model, on top
//! of an external [`SceneLoader`] (decoding) and [`RenderGraph`] (drawing).

pub mod config;
pub mod error;
pub mod loader;
pub mod render;
pub mod session;
pub mod source;

pub use config::{ConfigError, RenderConfig, ViewerConfig};
pub use error::SessionError;
pub use loader::{LoadError, ModelFormat, ModelLoader, SceneLoader};
pub use render::{NodeId, RenderGraph};
pub use session::{DisplayedAsset, LoadOutcome, SessionStatus, ViewerSession};
pub use source::{AssetLookup, LoadInput, LoadSource};
