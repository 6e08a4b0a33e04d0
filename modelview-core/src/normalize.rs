//! Model normalization.
//!
//! Computes the translation and uniform scale that center a scene's bounding
//! box on the origin and resize it to a fixed target size, whatever the
//! asset's native units. Every viewer entry point goes through
//! [`normalize_bounds`] so the framing rule lives in one place.

use std::str::FromStr;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bounds::Aabb;
use crate::scene::SceneNode;
use crate::transform::NodeTransform;

/// Default fit size, matching the preview canvas framing.
pub const DEFAULT_TARGET_FIT_SIZE: f32 = 1.5;

/// Which measure of the bounding box is scaled to the target size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum SizeMetric {
    /// Length of the box diagonal; the whole box fits inside a sphere of
    /// diameter `target_fit_size`.
    #[default]
    Diagonal,
    /// Largest axis extent; frames tighter by up to a factor of sqrt(3).
    MaxExtent,
}

impl SizeMetric {
    pub const ALL: [SizeMetric; 2] = [Self::Diagonal, Self::MaxExtent];

    /// Name used in configuration files and host APIs
    pub fn name(self) -> &'static str {
        match self {
            Self::Diagonal => "diagonal",
            Self::MaxExtent => "max_extent",
        }
    }

    pub fn measure(self, aabb: &Aabb) -> f32 {
        match self {
            Self::Diagonal => aabb.diagonal(),
            Self::MaxExtent => aabb.max_extent(),
        }
    }
}

impl FromStr for SizeMetric {
    type Err = UnknownMetric;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|metric| metric.name() == name)
            .ok_or_else(|| UnknownMetric(name.to_owned()))
    }
}

impl TryFrom<String> for SizeMetric {
    type Error = UnknownMetric;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}

impl From<SizeMetric> for &'static str {
    fn from(metric: SizeMetric) -> Self {
        metric.name()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown size metric '{0}'")]
pub struct UnknownMetric(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    pub target_fit_size: f32,
    pub metric: SizeMetric,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            target_fit_size: DEFAULT_TARGET_FIT_SIZE,
            metric: SizeMetric::Diagonal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum NormalizeError {
    /// The bounding box is empty or has zero size under the chosen metric.
    #[error("degenerate geometry: bounding box has zero size")]
    DegenerateGeometry,
}

/// Translation and uniform scale mapping `p` to `scale * (p + translation)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizationTransform {
    pub translation: Vector3<f32>,
    pub scale: f32,
}

impl NormalizationTransform {
    /// Leaves the scene untouched; the fallback for degenerate geometry.
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            scale: 1.0,
        }
    }

    /// Equivalent node transform (scale after translation folded into one).
    pub fn as_node_transform(&self) -> NodeTransform {
        NodeTransform {
            translation: self.translation * self.scale,
            scale: self.scale,
        }
    }

    /// Compose onto a root node so the normalization applies after whatever
    /// transform the root already carries.
    pub fn apply_to(&self, root: &mut SceneNode) {
        root.transform = root.transform.then(&self.as_node_transform());
    }
}

/// Normalization for a bounding box.
pub fn normalize_bounds(
    aabb: &Aabb,
    target_fit_size: f32,
    metric: SizeMetric,
) -> Result<NormalizationTransform, NormalizeError> {
    if aabb.is_empty() {
        return Err(NormalizeError::DegenerateGeometry);
    }

    let size = metric.measure(aabb);
    if size <= 0.0 || !size.is_finite() {
        return Err(NormalizeError::DegenerateGeometry);
    }

    Ok(NormalizationTransform {
        translation: -aabb.center().coords,
        scale: target_fit_size / size,
    })
}

/// Normalization for a whole scene graph, using the root's bounds in its
/// parent space.
pub fn normalize_scene(
    root: &SceneNode,
    config: &NormalizeConfig,
) -> Result<NormalizationTransform, NormalizeError> {
    normalize_bounds(&root.bounds(), config.target_fit_size, config.metric)
}
