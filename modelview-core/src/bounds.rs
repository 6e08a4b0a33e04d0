/// Axis-aligned bounding boxes
use nalgebra::{Point3, Vector3};

/// An axis-aligned bounding box.
///
/// The empty box has `min = +inf` and `max = -inf` on every axis so that
/// extending it by any point yields that point's degenerate box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    /// Smallest box enclosing every point in `points`.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f32>>) -> Self {
        points.into_iter().fold(Self::empty(), |mut aabb, p| {
            aabb.extend(p);
            aabb
        })
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn extend(&mut self, point: &Point3<f32>) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Extent along each axis. Zero for an empty box.
    pub fn size(&self) -> Vector3<f32> {
        if self.is_empty() {
            return Vector3::zeros();
        }
        self.max - self.min
    }

    /// Length of the box diagonal
    pub fn diagonal(&self) -> f32 {
        self.size().norm()
    }

    /// Largest of the three axis extents
    pub fn max_extent(&self) -> f32 {
        self.size().max()
    }

    /// Box enclosing this one after `point -> scale * point + translation`.
    ///
    /// Uniform scaling and translation keep boxes axis-aligned, so mapping the
    /// two corners is exact (a negative scale swaps them).
    pub fn map(&self, translation: &Vector3<f32>, scale: f32) -> Self {
        if self.is_empty() {
            return *self;
        }
        let a = self.min * scale + *translation;
        let b = self.max * scale + *translation;
        Self::new(a.inf(&b), a.sup(&b))
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}
