/// Camera and projection utilities
use nalgebra::{Matrix4, Point3, Vector3, Vector4};

/// Projection mode for rendering
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionMode {
    Orthographic,
    Perspective,
}

/// Camera configuration for 3D rendering
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view in radians
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub mode: ProjectionMode,
}

impl Camera {
    /// Perspective camera framing a normalized model at the origin from
    /// slightly above.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            position: Point3::new(0.0, 0.5, 2.0),
            target: Point3::origin(),
            up: Vector3::y(),
            fov: 75f32.to_radians(),
            aspect: aspect_ratio(width, height),
            near: 0.1,
            far: 1000.0,
            mode: ProjectionMode::Perspective,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = aspect_ratio(width, height);
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Create the projection matrix
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        match self.mode {
            ProjectionMode::Perspective => {
                Matrix4::new_perspective(self.aspect, self.fov, self.near, self.far)
            }
            ProjectionMode::Orthographic => {
                let height = (self.position - self.target).norm();
                let width = height * self.aspect;
                Matrix4::new_orthographic(
                    -width / 2.0,
                    width / 2.0,
                    -height / 2.0,
                    height / 2.0,
                    self.near,
                    self.far,
                )
            }
        }
    }

    /// Project a model-space point to screen space.
    ///
    /// Returns `(x, y, depth)` with `depth` in normalized device coordinates,
    /// or `None` if the point falls outside the view volume.
    pub fn project_to_screen(
        &self,
        point: &Point3<f32>,
        model_matrix: &Matrix4<f32>,
        width: u32,
        height: u32,
    ) -> Option<(f32, f32, f32)> {
        let mvp = self.projection_matrix() * self.view_matrix() * model_matrix;
        let clip = mvp * Vector4::new(point.x, point.y, point.z, 1.0);

        // Behind the camera or on the eye plane
        if clip.w <= 1e-6 {
            return None;
        }

        let ndc = clip.xyz() / clip.w;
        if ndc.x.abs() > 1.0 || ndc.y.abs() > 1.0 || ndc.z.abs() > 1.0 {
            return None;
        }

        let screen_x = (ndc.x + 1.0) * 0.5 * width as f32;
        let screen_y = (1.0 - ndc.y) * 0.5 * height as f32;

        Some((screen_x, screen_y, ndc.z))
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_projects_near_center() {
        let mut camera = Camera::new(100, 100);
        camera.position = Point3::new(0.0, 0.0, 2.0);

        let (x, y, depth) = camera
            .project_to_screen(&Point3::origin(), &Matrix4::identity(), 100, 100)
            .unwrap();
        assert!((x - 50.0).abs() < 1e-3);
        assert!((y - 50.0).abs() < 1e-3);
        assert!(depth > -1.0 && depth < 1.0);
    }

    #[test]
    fn test_point_behind_camera_is_clipped() {
        let camera = Camera::new(80, 40);
        let behind = Point3::new(0.0, 0.5, 5.0);
        assert!(camera
            .project_to_screen(&behind, &Matrix4::identity(), 80, 40)
            .is_none());
    }

    #[test]
    fn test_zero_height_does_not_divide_by_zero() {
        let camera = Camera::new(80, 0);
        assert!(camera.aspect.is_finite());
    }
}
