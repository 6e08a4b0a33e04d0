/// Triangle mesh primitives
use nalgebra::{Point3, Vector3};

use crate::bounds::Aabb;

/// A 3D vertex with position and normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
}

impl Vertex {
    pub fn new(position: Point3<f32>, normal: Vector3<f32>) -> Self {
        Self { position, normal }
    }
}

/// A triangle face defined by three vertices
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Face normal from winding order, or zero for a degenerate triangle
    pub fn face_normal(&self) -> Vector3<f32> {
        let [v0, v1, v2] = &self.vertices;
        let edge1 = v1.position - v0.position;
        let edge2 = v2.position - v0.position;

        edge1
            .cross(&edge2)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::zeros)
    }
}

/// A triangle soup mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn positions(&self) -> impl Iterator<Item = &Point3<f32>> {
        self.triangles
            .iter()
            .flat_map(|t| t.vertices.iter().map(|v| &v.position))
    }

    /// Bounding box in the mesh's own coordinates
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(self.positions())
    }

    /// Axis-aligned box mesh spanning `min..max`, two triangles per face.
    pub fn cuboid(min: Point3<f32>, max: Point3<f32>) -> Self {
        let corner = |x: bool, y: bool, z: bool| {
            Point3::new(
                if x { max.x } else { min.x },
                if y { max.y } else { min.y },
                if z { max.z } else { min.z },
            )
        };

        // Each face as counter-clockwise quad seen from outside
        let faces = [
            (
                [
                    corner(false, false, true),
                    corner(true, false, true),
                    corner(true, true, true),
                    corner(false, true, true),
                ],
                Vector3::z(),
            ),
            (
                [
                    corner(true, false, false),
                    corner(false, false, false),
                    corner(false, true, false),
                    corner(true, true, false),
                ],
                -Vector3::z(),
            ),
            (
                [
                    corner(false, true, true),
                    corner(true, true, true),
                    corner(true, true, false),
                    corner(false, true, false),
                ],
                Vector3::y(),
            ),
            (
                [
                    corner(false, false, false),
                    corner(true, false, false),
                    corner(true, false, true),
                    corner(false, false, true),
                ],
                -Vector3::y(),
            ),
            (
                [
                    corner(true, false, true),
                    corner(true, false, false),
                    corner(true, true, false),
                    corner(true, true, true),
                ],
                Vector3::x(),
            ),
            (
                [
                    corner(false, false, false),
                    corner(false, false, true),
                    corner(false, true, true),
                    corner(false, true, false),
                ],
                -Vector3::x(),
            ),
        ];

        let mut mesh = Self::with_capacity(12);
        for (quad, normal) in faces {
            let v = quad.map(|p| Vertex::new(p, normal));
            mesh.add_triangle(Triangle::new(v[0], v[1], v[2]));
            mesh.add_triangle(Triangle::new(v[0], v[2], v[3]));
        }
        mesh
    }

    /// Cube of edge length `size` centered on the origin
    pub fn cube(size: f32) -> Self {
        let half = size / 2.0;
        Self::cuboid(Point3::new(-half, -half, -half), Point3::new(half, half, half))
    }
}
