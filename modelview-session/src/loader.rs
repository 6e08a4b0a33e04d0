//! Scene loaders
//!
//! Loaders turn raw asset data into a scene graph. They are external to the
//! session: anything implementing [`SceneLoader`] can be plugged in.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use modelview_core::{gltf_scene, stl, SceneNode};
use thiserror::Error;
use tokio::io::AsyncReadExt;

use crate::source::LoadInput;

/// Error during asset decoding
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error("asset not found: {0}")]
    NotFound(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Decodes asset data into a scene graph.
///
/// `progress` must be called with non-decreasing fractions in `[0, 1]`.
#[async_trait]
pub trait SceneLoader: Send + Sync {
    async fn decode(
        &self,
        input: &LoadInput,
        progress: &(dyn Fn(f32) + Send + Sync),
    ) -> Result<SceneNode, LoadError>;
}

/// Asset formats [`ModelLoader`] decodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    /// Binary or ASCII STL
    Stl,
    /// glTF 2.0, JSON (`.gltf`) or binary (`.glb`)
    Gltf,
}

impl ModelFormat {
    /// Format named by the extension of `name`. `Ok(None)` when there is no
    /// extension and the content has to decide.
    pub fn from_name(name: &str) -> Result<Option<Self>, LoadError> {
        let ext = match name.rsplit_once('.') {
            Some((_, ext)) if !ext.contains('/') => ext.to_ascii_lowercase(),
            _ => return Ok(None),
        };
        match ext.as_str() {
            "stl" => Ok(Some(Self::Stl)),
            "glb" | "gltf" => Ok(Some(Self::Gltf)),
            _ => Err(LoadError::UnsupportedFormat(format!(
                "{name}: expected .stl, .glb or .gltf"
            ))),
        }
    }

    /// Guess from the content: GLB magic means glTF, anything else STL.
    pub fn sniff(data: &[u8]) -> Self {
        if gltf_scene::is_glb(data) {
            Self::Gltf
        } else {
            Self::Stl
        }
    }
}

/// Loader for STL and glTF/GLB models.
///
/// URLs are resolved against the local filesystem (`file://` or a plain
/// path); other schemes are rejected. External glTF buffers are looked up
/// next to the file, so they only resolve for URL loads.
#[derive(Debug, Clone)]
pub struct ModelLoader {
    chunk_size: usize,
}

impl ModelLoader {
    pub fn new() -> Self {
        Self {
            chunk_size: 64 * 1024,
        }
    }

    /// Read granularity for progress reporting on file loads
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    fn resolve(url: &str) -> Result<PathBuf, LoadError> {
        if let Some(path) = url.strip_prefix("file://") {
            return Ok(PathBuf::from(path));
        }
        if url.contains("://") {
            return Err(LoadError::UnsupportedFormat(format!(
                "{url}: only file URLs are supported"
            )));
        }
        Ok(PathBuf::from(url))
    }

    fn parse(
        name: &str,
        format: Option<ModelFormat>,
        data: &[u8],
        base: Option<&Path>,
    ) -> Result<SceneNode, LoadError> {
        let decode_error = |e: &dyn std::fmt::Display| LoadError::Decode(format!("{name}: {e}"));
        match format.unwrap_or_else(|| ModelFormat::sniff(data)) {
            ModelFormat::Stl => stl::parse_stl(data)
                .map(|mesh| SceneNode::from_mesh(name, mesh))
                .map_err(|e| decode_error(&e)),
            ModelFormat::Gltf => {
                gltf_scene::parse_gltf(data, base, name).map_err(|e| decode_error(&e))
            }
        }
    }

    /// Read a file, mapping bytes read to progress in `[0, 0.5]`.
    async fn read_file(
        &self,
        path: &Path,
        progress: &(dyn Fn(f32) + Send + Sync),
    ) -> Result<Vec<u8>, LoadError> {
        let mut file = tokio::fs::File::open(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LoadError::NotFound(path.display().to_string()),
            _ => LoadError::Io(format!("{}: {e}", path.display())),
        })?;
        let total = file
            .metadata()
            .await
            .map_err(|e| LoadError::Io(e.to_string()))?
            .len() as usize;

        let mut data = Vec::with_capacity(total);
        let mut chunk = vec![0u8; self.chunk_size];
        loop {
            let n = file
                .read(&mut chunk)
                .await
                .map_err(|e| LoadError::Io(format!("{}: {e}", path.display())))?;
            if n == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..n]);
            if total > 0 {
                progress(0.5 * (data.len().min(total) as f32 / total as f32));
            }
        }
        Ok(data)
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SceneLoader for ModelLoader {
    async fn decode(
        &self,
        input: &LoadInput,
        progress: &(dyn Fn(f32) + Send + Sync),
    ) -> Result<SceneNode, LoadError> {
        let format = ModelFormat::from_name(input.name())?;
        progress(0.0);

        let scene = match input {
            LoadInput::Bytes { name, data } => Self::parse(name, format, data, None)?,
            LoadInput::Url(url) => {
                let path = Self::resolve(url)?;
                let data = self.read_file(&path, progress).await?;
                Self::parse(url, format, &data, path.parent())?
            }
        };

        log::debug!("Decoded {} ({} triangles)", input.name(), scene.triangle_count());
        progress(1.0);
        Ok(scene)
    }
}
