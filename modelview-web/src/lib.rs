/// modelview web - WASM bindings for browser hosts
///
/// The browser keeps its own renderer, loader and asset storage; this module
/// supplies the framing rule so uploads are centered and sized the same way
/// as in the terminal viewer. Matrices are column-major, ready for WebGL.

use modelview_core::{
    normalize_scene, stl, NodeTransform, NormalizeConfig, Orbit, SceneNode, SizeMetric,
};
use wasm_bindgen::prelude::*;

/// Parse a metric name as used in the JSON config. Empty means the default.
fn parse_metric(name: &str) -> Result<SizeMetric, String> {
    if name.is_empty() {
        return Ok(SizeMetric::default());
    }
    name.parse().map_err(|e: modelview_core::UnknownMetric| e.to_string())
}

fn config(target_fit_size: f32, metric: &str) -> Result<NormalizeConfig, String> {
    if !(target_fit_size.is_finite() && target_fit_size > 0.0) {
        return Err(format!("target fit size must be positive, got {}", target_fit_size));
    }
    Ok(NormalizeConfig {
        target_fit_size,
        metric: parse_metric(metric)?,
    })
}

/// Decode STL bytes and compute the node transform that frames them.
fn frame_stl(data: &[u8], config: &NormalizeConfig) -> Result<(NodeTransform, usize), String> {
    let mesh = stl::parse_stl(data).map_err(|e| e.to_string())?;
    let scene = SceneNode::from_mesh("upload", mesh);
    let transform = normalize_scene(&scene, config).map_err(|e| e.to_string())?;
    Ok((transform.as_node_transform(), scene.triangle_count()))
}

/// Framing for STL bytes as `[tx, ty, tz, scale]`, where a vertex `p` is
/// displayed at `scale * p + t`.
#[wasm_bindgen]
pub fn normalize_stl(data: &[u8], target_fit_size: f32, metric: &str) -> Result<Vec<f32>, JsValue> {
    let config = config(target_fit_size, metric).map_err(|e| JsValue::from_str(&e))?;
    let (transform, _) = frame_stl(data, &config).map_err(|e| JsValue::from_str(&e))?;
    let t = transform.translation;
    Ok(vec![t.x, t.y, t.z, transform.scale])
}

/// Viewer state for a browser canvas: the framed model plus orbit rotation
#[wasm_bindgen]
pub struct WebViewer {
    config: NormalizeConfig,
    framing: Option<NodeTransform>,
    orbit: Orbit,
}

#[wasm_bindgen]
impl WebViewer {
    #[wasm_bindgen(constructor)]
    pub fn new(target_fit_size: f32, metric: &str) -> Result<WebViewer, JsValue> {
        let config = config(target_fit_size, metric).map_err(|e| JsValue::from_str(&e))?;
        Ok(Self::with_config(config))
    }

    /// Frame a new model, replacing the previous one. Returns its triangle count.
    pub fn load_stl(&mut self, data: &[u8]) -> Result<u32, JsValue> {
        self.load(data).map_err(|e| JsValue::from_str(&e))
    }

    pub fn rotate(&mut self, dx: f32, dy: f32, dz: f32) {
        self.orbit.rotate(dx, dy, dz);
    }

    pub fn has_model(&self) -> bool {
        self.framing.is_some()
    }

    pub fn clear(&mut self) {
        self.framing = None;
    }

    /// Model matrix (orbit after framing), 16 floats column-major
    pub fn model_matrix(&self) -> Vec<f32> {
        let framing = self.framing.unwrap_or_default();
        (self.orbit.matrix() * framing.to_matrix()).as_slice().to_vec()
    }
}

impl WebViewer {
    fn with_config(config: NormalizeConfig) -> Self {
        Self {
            config,
            framing: None,
            orbit: Orbit::default(),
        }
    }

    fn load(&mut self, data: &[u8]) -> Result<u32, String> {
        // A failed load keeps the previous model
        let (framing, triangles) = frame_stl(data, &self.config)?;
        self.framing = Some(framing);
        Ok(triangles as u32)
    }
}
