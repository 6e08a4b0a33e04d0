/// Node transforms and view rotation
use nalgebra::{Matrix4, Point3, Vector3};

/// Local transform of a scene node: uniform scale followed by translation.
///
/// Maps a point `p` in node space to `scale * p + translation` in parent space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    pub translation: Vector3<f32>,
    pub scale: f32,
}

impl NodeTransform {
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            scale: 1.0,
        }
    }

    pub fn from_translation(translation: Vector3<f32>) -> Self {
        Self {
            translation,
            scale: 1.0,
        }
    }

    pub fn from_scale(scale: f32) -> Self {
        Self {
            translation: Vector3::zeros(),
            scale,
        }
    }

    pub fn transform_point(&self, point: &Point3<f32>) -> Point3<f32> {
        Point3::from(point.coords * self.scale + self.translation)
    }

    /// Transform equivalent to applying `self` first and then `outer`.
    pub fn then(&self, outer: &Self) -> Self {
        Self {
            translation: self.translation * outer.scale + outer.translation,
            scale: self.scale * outer.scale,
        }
    }

    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_translation(&self.translation) * Matrix4::new_scaling(self.scale)
    }
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Orbit rotation of the viewed model (in radians)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Orbit {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl Orbit {
    pub fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }

    /// Rotate by delta amounts (in radians)
    pub fn rotate(&mut self, d_pitch: f32, d_yaw: f32, d_roll: f32) {
        self.pitch += d_pitch;
        self.yaw += d_yaw;
        self.roll += d_roll;
    }

    /// Rotation matrix applied in order: roll (Z), yaw (Y), pitch (X)
    pub fn matrix(&self) -> Matrix4<f32> {
        let rx = Matrix4::new_rotation(Vector3::new(self.pitch, 0.0, 0.0));
        let ry = Matrix4::new_rotation(Vector3::new(0.0, self.yaw, 0.0));
        let rz = Matrix4::new_rotation(Vector3::new(0.0, 0.0, self.roll));

        rz * ry * rx
    }
}
