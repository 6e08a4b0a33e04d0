//! Viewer configuration
//!
//! Everything is optional in the JSON file; missing fields take the
//! defaults below.
//!
//! ```json
//! {
//!   "store": { "database": "ModelUploaderDB", "container": "models" },
//!   "store_root": "/home/me/.local/share/modelview",
//!   "normalize": { "target_fit_size": 2.0, "metric": "max_extent" },
//!   "render": { "target_fps": 30, "fov_degrees": 75.0, "camera_position": [0.0, 0.5, 2.0] }
//! }
//! ```

use std::path::{Path, PathBuf};

use modelview_core::{Camera, NormalizeConfig};
use modelview_store::StoreConfig;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config value: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub target_fps: u32,
    pub fov_degrees: f32,
    pub camera_position: [f32; 3],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            target_fps: 30,
            fov_degrees: 75.0,
            camera_position: [0.0, 0.5, 2.0],
        }
    }
}

impl RenderConfig {
    /// Camera for a viewport of the given size looking at the origin
    pub fn camera(&self, width: u32, height: u32) -> Camera {
        let mut camera = Camera::new(width, height);
        camera.fov = self.fov_degrees.to_radians();
        camera.position = Point3::from(self.camera_position);
        camera
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub store: StoreConfig,
    /// Directory for the filesystem storage engine; `None` keeps assets in
    /// memory for the lifetime of the process.
    pub store_root: Option<PathBuf>,
    pub normalize: NormalizeConfig,
    pub render: RenderConfig,
}

impl ViewerConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fit = self.normalize.target_fit_size;
        if !(fit.is_finite() && fit > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "normalize.target_fit_size must be positive, got {fit}"
            )));
        }
        if self.render.target_fps == 0 {
            return Err(ConfigError::Invalid("render.target_fps must be at least 1".to_owned()));
        }
        let fov = self.render.fov_degrees;
        if !(fov > 0.0 && fov < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "render.fov_degrees must be in (0, 180), got {fov}"
            )));
        }
        if self.store.database.is_empty() || self.store.container.is_empty() {
            return Err(ConfigError::Invalid("store names must not be empty".to_owned()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelview_core::SizeMetric;

    #[test]
    fn test_empty_object_gives_defaults() {
        let config = ViewerConfig::from_json("{}").unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.store.database, "ModelUploaderDB");
        assert_eq!(config.store.container, "models");
        assert_eq!(config.normalize.target_fit_size, 1.5);
        assert_eq!(config.normalize.metric, SizeMetric::Diagonal);
    }

    #[test]
    fn test_partial_override() {
        let config = ViewerConfig::from_json(
            r#"{ "normalize": { "metric": "max_extent", "target_fit_size": 2.0 },
                 "render": { "target_fps": 60 } }"#,
        )
        .unwrap();
        assert_eq!(config.normalize.metric, SizeMetric::MaxExtent);
        assert_eq!(config.normalize.target_fit_size, 2.0);
        assert_eq!(config.render.target_fps, 60);
        assert_eq!(config.render.fov_degrees, 75.0);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            ViewerConfig::from_json(r#"{ "normalize": { "target_fit_size": 0 } }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ViewerConfig::from_json(r#"{ "normalize": { "metric": "volume" } }"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ViewerConfig::load("/no/such/modelview.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_render_camera() {
        let config = RenderConfig::default();
        let camera = config.camera(80, 40);
        assert!((camera.fov - 75f32.to_radians()).abs() < 1e-6);
        assert_eq!(camera.position.y, 0.5);
        assert_eq!(camera.aspect, 2.0);
    }
}
