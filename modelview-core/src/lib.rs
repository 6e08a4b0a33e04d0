/// modelview core library - scene geometry and model normalization
///
/// Stateless building blocks shared by the store, session and front ends:
/// triangle meshes, scene graphs with bounding boxes, the normalization that
/// frames any model in a fixed-size viewport, STL decoding and camera
/// projection.

pub mod bounds;
pub mod geometry;
pub mod gltf_scene;
pub mod normalize;
pub mod projection;
pub mod scene;
pub mod stl;
pub mod transform;

// Re-export commonly used types
pub use bounds::Aabb;
pub use geometry::{Mesh, Triangle, Vertex};
pub use gltf_scene::GltfError;
pub use normalize::{
    normalize_bounds, normalize_scene, NormalizationTransform, NormalizeConfig, NormalizeError,
    SizeMetric, UnknownMetric,
};
pub use projection::{Camera, ProjectionMode};
pub use scene::SceneNode;
pub use stl::StlError;
pub use transform::{NodeTransform, Orbit};
