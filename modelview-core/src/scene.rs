/// In-memory scene graph produced by decoding an asset
use crate::bounds::Aabb;
use crate::geometry::Mesh;
use crate::transform::NodeTransform;

/// A node of a decoded scene graph.
///
/// The root node of a graph is the handle the viewer displays; its
/// `transform` is the only one normalization touches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub transform: NodeTransform,
    pub meshes: Vec<Mesh>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Single-mesh node, the shape produced by flat formats such as STL
    pub fn from_mesh(name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            name: name.into(),
            meshes: vec![mesh],
            ..Self::default()
        }
    }

    pub fn with_transform(mut self, transform: NodeTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    /// Bounding box of this node's own meshes and all descendants, in the
    /// node's local space (before its own transform).
    pub fn local_bounds(&self) -> Aabb {
        let own = self
            .meshes
            .iter()
            .map(Mesh::bounds)
            .fold(Aabb::empty(), Aabb::union);

        self.children
            .iter()
            .fold(own, |acc, child| acc.union(child.bounds()))
    }

    /// Bounding box of the whole subtree in the parent's space.
    pub fn bounds(&self) -> Aabb {
        self.local_bounds().map(&self.transform.translation, self.transform.scale)
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.triangles.len()).sum::<usize>()
            + self.children.iter().map(SceneNode::triangle_count).sum::<usize>()
    }

    /// Visit every mesh with the transform mapping it into this node's
    /// parent space.
    pub fn for_each_mesh(&self, f: &mut impl FnMut(&Mesh, &NodeTransform)) {
        self.visit(&NodeTransform::identity(), f);
    }

    fn visit(&self, parent: &NodeTransform, f: &mut impl FnMut(&Mesh, &NodeTransform)) {
        let world = self.transform.then(parent);
        for mesh in &self.meshes {
            f(mesh, &world);
        }
        for child in &self.children {
            child.visit(&world, f);
        }
    }
}
