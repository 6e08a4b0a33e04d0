/// ASCII rasterizer drawing the session's render graph
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use modelview_core::{Camera, Mesh, NodeTransform, Orbit, SceneNode, Triangle};
use modelview_session::{NodeId, RenderGraph};
use nalgebra::{Matrix4, Vector3};

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Terminal renderer. Every attached node is drawn on each frame.
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    char_buffer: Vec<char>,
    nodes: BTreeMap<NodeId, Arc<SceneNode>>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            char_buffer: vec![' '; size],
            nodes: BTreeMap::new(),
        }
    }

    /// Resize the frame buffers, keeping attached nodes.
    pub fn resize(&mut self, width: usize, height: usize) {
        if (width, height) == (self.width, self.height) {
            return;
        }
        self.width = width;
        self.height = height;
        self.depth_buffer = vec![f32::INFINITY; width * height];
        self.char_buffer = vec![' '; width * height];
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.char_buffer.fill(' ');
    }

    /// Rasterize all attached nodes, rotated by `orbit`, into the buffers.
    pub fn render_frame(&mut self, camera: &Camera, orbit: &Orbit) {
        self.clear();

        let view_rotation = orbit.matrix();
        let nodes: Vec<_> = self.nodes.values().cloned().collect();
        for node in nodes {
            node.for_each_mesh(&mut |mesh: &Mesh, transform: &NodeTransform| {
                let model = view_rotation * transform.to_matrix();
                self.render_mesh(mesh, &model, camera);
            });
        }
    }

    fn render_mesh(&mut self, mesh: &Mesh, model_matrix: &Matrix4<f32>, camera: &Camera) {
        for triangle in &mesh.triangles {
            self.render_triangle(triangle, model_matrix, camera);
        }
    }

    fn render_triangle(
        &mut self,
        triangle: &Triangle,
        model_matrix: &Matrix4<f32>,
        camera: &Camera,
    ) {
        let mut screen_coords = [(0.0, 0.0, 0.0); 3];
        for (slot, vertex) in screen_coords.iter_mut().zip(&triangle.vertices) {
            match camera.project_to_screen(
                &vertex.position,
                model_matrix,
                self.width as u32,
                self.height as u32,
            ) {
                Some(coords) => *slot = coords,
                // Clipped
                None => return,
            }
        }

        // Shade by the face normal in view orientation
        let normal = model_matrix
            .transform_vector(&triangle.face_normal())
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::zeros);
        let light_dir = Vector3::new(0.0, 0.0, 1.0);
        let brightness = normal.dot(&light_dir).max(0.0);

        let char_index = (brightness * (LUMINOSITY_RAMP.len() - 1) as f32) as usize;
        let character = LUMINOSITY_RAMP[char_index.min(LUMINOSITY_RAMP.len() - 1)];

        self.rasterize_triangle(&screen_coords, character);
    }

    fn rasterize_triangle(&mut self, coords: &[(f32, f32, f32); 3], character: char) {
        let [v0, v1, v2] = *coords;

        let min_x = (v0.0.min(v1.0).min(v2.0).floor() as i32).max(0);
        let max_x = (v0.0.max(v1.0).max(v2.0).ceil() as i32).min(self.width as i32 - 1);
        let min_y = (v0.1.min(v1.1).min(v2.1).floor() as i32).max(0);
        let max_y = (v0.1.max(v1.1).max(v2.1).ceil() as i32).min(self.height as i32 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = (x as f32 + 0.5, y as f32 + 0.5);
                let Some((w0, w1, w2)) = barycentric((v0.0, v0.1), (v1.0, v1.1), (v2.0, v2.1), p)
                else {
                    continue;
                };
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;
                let idx = y as usize * self.width + x as usize;
                if depth < self.depth_buffer[idx] {
                    self.depth_buffer[idx] = depth;
                    self.char_buffer[idx] = character;
                }
            }
        }
    }

    /// Rows of the last rendered frame
    pub fn frame_text(&self) -> String {
        let mut text = String::with_capacity((self.width + 1) * self.height);
        for row in self.char_buffer.chunks(self.width.max(1)) {
            text.extend(row);
            text.push('\n');
        }
        text
    }

    /// Queue the last rendered frame, starting `top` rows down.
    pub fn draw<W: Write>(&self, writer: &mut W, top: u16) -> std::io::Result<()> {
        for (y, row) in self.char_buffer.chunks(self.width.max(1)).enumerate() {
            writer.queue(crossterm::cursor::MoveTo(0, top + y as u16))?;
            for &c in row {
                let color = match c {
                    ' ' | '.' | ':' => Color::DarkGrey,
                    '-' | '=' => Color::Grey,
                    '+' | '*' => Color::White,
                    '#' | '%' | '@' => Color::Cyan,
                    _ => Color::White,
                };
                writer.queue(SetForegroundColor(color))?;
                writer.queue(Print(c))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

impl RenderGraph for AsciiRenderer {
    fn attach(&mut self, id: NodeId, node: Arc<SceneNode>) {
        log::trace!("Attached node {:?} ({} triangles)", id, node.triangle_count());
        self.nodes.insert(id, node);
    }

    fn detach(&mut self, id: NodeId) -> Option<Arc<SceneNode>> {
        self.nodes.remove(&id)
    }
}

/// Barycentric coordinates of `p` in a screen-space triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);
    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    Some((w0, w1, 1.0 - w0 - w1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(renderer: &AsciiRenderer) -> usize {
        renderer.frame_text().chars().filter(|c| !c.is_whitespace()).count()
    }

    #[test]
    fn test_draws_attached_nodes_only() {
        let mut renderer = AsciiRenderer::new(40, 20);
        let camera = Camera::new(40, 20);
        let orbit = Orbit::new(0.3, 0.3, 0.0);

        renderer.render_frame(&camera, &orbit);
        assert_eq!(filled(&renderer), 0);

        let cube = Arc::new(SceneNode::from_mesh("cube", Mesh::cube(1.0)));
        renderer.attach(NodeId(1), cube);
        renderer.render_frame(&camera, &orbit);
        assert!(filled(&renderer) > 0);

        assert!(renderer.detach(NodeId(1)).is_some());
        assert!(renderer.detach(NodeId(1)).is_none());
        renderer.render_frame(&camera, &orbit);
        assert_eq!(filled(&renderer), 0);
    }

    #[test]
    fn test_frame_text_shape() {
        let mut renderer = AsciiRenderer::new(8, 3);
        renderer.resize(10, 4);
        let text = renderer.frame_text();
        assert_eq!(text.lines().count(), 4);
        assert!(text.lines().all(|l| l.chars().count() == 10));
    }

    #[test]
    fn test_barycentric_degenerate() {
        assert!(barycentric((0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (0.5, 0.5)).is_none());
        let (w0, w1, w2) = barycentric((0.0, 0.0), (4.0, 0.0), (0.0, 4.0), (1.0, 1.0)).unwrap();
        assert!((w0 + w1 + w2 - 1.0).abs() < 1e-5);
        assert!(w0 > 0.0 && w1 > 0.0 && w2 > 0.0);
    }
}
