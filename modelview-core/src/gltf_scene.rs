//! glTF 2.0 decoding (`.gltf` and binary `.glb`)
//!
//! The node hierarchy is kept. A node transform made of a translation and a
//! positive uniform scale becomes that node's [`NodeTransform`]. Rotations and
//! non-uniform scales cannot be expressed that way, so from the first such
//! node down the accumulated matrix is baked into the vertices instead.

use std::path::Path;

use gltf::mesh::Mode;
use nalgebra::{Matrix4, Point3, Vector3};
use thiserror::Error;

use crate::geometry::{Mesh, Triangle, Vertex};
use crate::scene::SceneNode;
use crate::transform::NodeTransform;

const EPSILON: f32 = 1e-5;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GltfError {
    #[error("invalid glTF: {0}")]
    Invalid(String),
    #[error("glTF document has no scene")]
    NoScene,
    #[error("mesh {mesh}: index {index} out of range for {count} vertices")]
    IndexOutOfRange { mesh: usize, index: u32, count: usize },
    #[error("node hierarchy is cyclic")]
    Cyclic,
}

impl From<gltf::Error> for GltfError {
    fn from(e: gltf::Error) -> Self {
        Self::Invalid(e.to_string())
    }
}

/// Whether `data` starts with the binary glTF magic
pub fn is_glb(data: &[u8]) -> bool {
    data.starts_with(b"glTF")
}

/// Decode a glTF or GLB document into a scene graph whose root is called
/// `name` and holds the scene's root nodes.
///
/// External buffer URIs are resolved against `base`; GLB and data URI
/// buffers need none.
pub fn parse_gltf(data: &[u8], base: Option<&Path>, name: &str) -> Result<SceneNode, GltfError> {
    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(data)?;
    let buffers = gltf::import_buffers(&document, base, blob)?;
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or(GltfError::NoScene)?;

    let decoder = Decoder {
        buffers: &buffers,
        max_depth: document.nodes().count(),
    };
    let mut root = SceneNode::new(name);
    for node in scene.nodes() {
        root.children.push(decoder.node(&node, None, 0)?);
    }
    Ok(root)
}

struct Decoder<'a> {
    buffers: &'a [gltf::buffer::Data],
    max_depth: usize,
}

impl Decoder<'_> {
    fn node(
        &self,
        node: &gltf::Node,
        bake: Option<Matrix4<f32>>,
        depth: usize,
    ) -> Result<SceneNode, GltfError> {
        // A tree never nests deeper than its node count
        if depth > self.max_depth {
            return Err(GltfError::Cyclic);
        }

        let (transform, bake) = match (bake, simple_transform(node.transform())) {
            (None, Some(transform)) => (transform, None),
            (bake, _) => {
                let local = Matrix4::from(node.transform().matrix());
                let outer = bake.unwrap_or_else(Matrix4::identity);
                (NodeTransform::identity(), Some(outer * local))
            }
        };

        let name = node
            .name()
            .map_or_else(|| format!("node{}", node.index()), str::to_owned);
        let mut scene_node = SceneNode::new(name).with_transform(transform);

        if let Some(mesh) = node.mesh() {
            for primitive in mesh.primitives() {
                let decoded = self.primitive(&mesh, &primitive, bake.as_ref())?;
                if !decoded.is_empty() {
                    scene_node.meshes.push(decoded);
                }
            }
        }
        for child in node.children() {
            scene_node.children.push(self.node(&child, bake, depth + 1)?);
        }
        Ok(scene_node)
    }

    fn primitive(
        &self,
        mesh: &gltf::Mesh,
        primitive: &gltf::Primitive,
        bake: Option<&Matrix4<f32>>,
    ) -> Result<Mesh, GltfError> {
        // Points and lines have no surface
        if primitive.mode() != Mode::Triangles {
            return Ok(Mesh::new());
        }

        let reader =
            primitive.reader(|buffer| self.buffers.get(buffer.index()).map(|data| &data[..]));
        let Some(positions) = reader.read_positions() else {
            return Ok(Mesh::new());
        };
        let positions: Vec<Point3<f32>> = positions
            .map(|p| {
                let p = Point3::from(p);
                bake.map_or(p, |m| m.transform_point(&p))
            })
            .collect();
        let normals: Option<Vec<Vector3<f32>>> = reader.read_normals().map(|normals| {
            normals
                .map(|n| {
                    let n = Vector3::from(n);
                    bake.map_or(n, |m| m.transform_vector(&n))
                        .try_normalize(f32::EPSILON)
                        .unwrap_or_else(Vector3::zeros)
                })
                .collect()
        });
        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };

        let vertex = |index: u32| -> Result<Vertex, GltfError> {
            let i = index as usize;
            let position = *positions.get(i).ok_or(GltfError::IndexOutOfRange {
                mesh: mesh.index(),
                index,
                count: positions.len(),
            })?;
            let normal = normals
                .as_ref()
                .and_then(|normals| normals.get(i).copied())
                .unwrap_or_else(Vector3::zeros);
            Ok(Vertex::new(position, normal))
        };

        let mut decoded = Mesh::with_capacity(indices.len() / 3);
        for corners in indices.chunks_exact(3) {
            let mut triangle =
                Triangle::new(vertex(corners[0])?, vertex(corners[1])?, vertex(corners[2])?);
            if normals.is_none() {
                let normal = triangle.face_normal();
                for v in &mut triangle.vertices {
                    v.normal = normal;
                }
            }
            decoded.add_triangle(triangle);
        }
        Ok(decoded)
    }
}

/// The node transform, if it is only a translation and a positive uniform scale
fn simple_transform(transform: gltf::scene::Transform) -> Option<NodeTransform> {
    let (translation, [x, y, z, _], [sx, sy, sz]) = transform.decomposed();
    let rotated = x.abs() > EPSILON || y.abs() > EPSILON || z.abs() > EPSILON;
    let uniform = (sx - sy).abs() <= EPSILON && (sx - sz).abs() <= EPSILON;
    (!rotated && uniform && sx > 0.0).then(|| NodeTransform {
        translation: Vector3::from(translation),
        scale: sx,
    })
}
