/// Render graph interface the session drives
use std::sync::Arc;

use modelview_core::SceneNode;

/// Identifies a node attached to a render graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// A renderer's scene graph. Attached nodes are drawn every frame until
/// detached; the graph only reads them.
pub trait RenderGraph: Send {
    fn attach(&mut self, id: NodeId, node: Arc<SceneNode>);

    /// Remove a node, returning it if it was attached.
    fn detach(&mut self, id: NodeId) -> Option<Arc<SceneNode>>;
}
