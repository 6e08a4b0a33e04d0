//! Integration tests for modelview-session

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use modelview_core::{Mesh, SceneNode};
use modelview_session::*;
use modelview_store::{AssetStore, MemoryEngine};
use nalgebra::{Point3, Vector3};
use parking_lot::Mutex;
use tokio::sync::oneshot;

/// Render graph that records what is attached
#[derive(Default)]
struct RecordingGraph {
    attached: HashMap<NodeId, Arc<SceneNode>>,
    most_attached: usize,
    detached: Vec<NodeId>,
}

impl RenderGraph for RecordingGraph {
    fn attach(&mut self, id: NodeId, node: Arc<SceneNode>) {
        self.attached.insert(id, node);
        self.most_attached = self.most_attached.max(self.attached.len());
    }

    fn detach(&mut self, id: NodeId) -> Option<Arc<SceneNode>> {
        self.detached.push(id);
        self.attached.remove(&id)
    }
}

type Gate = oneshot::Sender<Result<SceneNode, LoadError>>;

/// Loader whose decodes finish only when the test says so
#[derive(Default)]
struct GatedLoader {
    gates: Mutex<HashMap<String, oneshot::Receiver<Result<SceneNode, LoadError>>>>,
}

impl GatedLoader {
    fn gate(&self, name: &str) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().insert(name.to_owned(), rx);
        tx
    }
}

#[async_trait]
impl SceneLoader for GatedLoader {
    async fn decode(
        &self,
        input: &LoadInput,
        progress: &(dyn Fn(f32) + Send + Sync),
    ) -> Result<SceneNode, LoadError> {
        let rx = self.gates.lock().remove(input.name());
        let rx = rx.ok_or_else(|| LoadError::NotFound(input.name().to_owned()))?;
        progress(0.5);
        rx.await
            .unwrap_or_else(|_| Err(LoadError::Io("gate dropped".to_owned())))
    }
}

fn ascii_stl(mesh: &Mesh) -> Vec<u8> {
    let mut text = String::from("solid test\n");
    for t in &mesh.triangles {
        let n = t.vertices[0].normal;
        text.push_str(&format!("facet normal {} {} {}\nouter loop\n", n.x, n.y, n.z));
        for v in &t.vertices {
            let p = v.position;
            text.push_str(&format!("vertex {} {} {}\n", p.x, p.y, p.z));
        }
        text.push_str("endloop\nendfacet\n");
    }
    text.push_str("endsolid test\n");
    text.into_bytes()
}

/// Binary glTF with the mesh's triangles on a child node of a translated group
fn nested_glb(mesh: &Mesh, group_offset: [f32; 3]) -> Vec<u8> {
    let bin: Vec<u8> = mesh
        .positions()
        .flat_map(|p| p.coords.iter().flat_map(|c| c.to_le_bytes()).collect::<Vec<_>>())
        .collect();
    let bounds = mesh.bounds();
    let mut json = format!(
        r#"{{"asset":{{"version":"2.0"}},"scene":0,"scenes":[{{"nodes":[0]}}],
        "nodes":[{{"name":"group","translation":{:?},"children":[1]}},{{"name":"box","mesh":0}}],
        "meshes":[{{"primitives":[{{"attributes":{{"POSITION":0}}}}]}}],
        "accessors":[{{"bufferView":0,"componentType":5126,"count":{},"type":"VEC3",
            "min":{:?},"max":{:?}}}],
        "bufferViews":[{{"buffer":0,"byteLength":{}}}],
        "buffers":[{{"byteLength":{}}}]}}"#,
        group_offset,
        mesh.triangles.len() * 3,
        [bounds.min.x, bounds.min.y, bounds.min.z],
        [bounds.max.x, bounds.max.y, bounds.max.z],
        bin.len(),
        bin.len()
    )
    .into_bytes();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }

    let mut data = b"glTF".to_vec();
    data.extend_from_slice(&2u32.to_le_bytes());
    data.extend_from_slice(&((12 + 8 + json.len() + 8 + bin.len()) as u32).to_le_bytes());
    for (kind, chunk) in [(*b"JSON", &json), (*b"BIN\0", &bin)] {
        data.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
        data.extend_from_slice(&kind);
        data.extend_from_slice(chunk);
    }
    data
}

fn box_scene(name: &str, min: [f32; 3], max: [f32; 3]) -> SceneNode {
    SceneNode::from_mesh(name, Mesh::cuboid(Point3::from(min), Point3::from(max)))
}

fn attached_labels<L: SceneLoader>(session: &ViewerSession<L, RecordingGraph>) -> Vec<String> {
    session.with_graph(|g| g.attached.values().map(|n| n.name.clone()).collect())
}

#[tokio::test]
async fn test_cube_is_centered_and_scaled() {
    let session = ViewerSession::new(ModelLoader::new(), RecordingGraph::default());
    let cube = Mesh::cuboid(Point3::new(4.0, 4.0, 4.0), Point3::new(6.0, 6.0, 6.0));

    let outcome = session
        .request_load(LoadSource::blob("cube.stl", ascii_stl(&cube)))
        .await
        .unwrap();

    let LoadOutcome::Displayed(transform) = outcome else {
        panic!("expected display, got {outcome:?}");
    };
    assert!((transform.scale - 1.5 / 12f32.sqrt()).abs() < 1e-5);
    assert!((transform.scale - 0.433).abs() < 1e-3);
    assert!((transform.translation - Vector3::new(-5.0, -5.0, -5.0)).norm() < 1e-5);

    let current = session.current().unwrap();
    let bounds = current.node.bounds();
    assert!(bounds.center().coords.norm() < 1e-5);
    assert!((bounds.diagonal() - 1.5).abs() < 1e-5);
    assert!(matches!(session.status(), SessionStatus::Displayed { label } if label == "cube.stl"));
    assert_eq!(attached_labels(&session), vec!["cube.stl"]);
}

#[tokio::test]
async fn test_stale_completion_after_newer_request_is_ignored() {
    let loader = GatedLoader::default();
    let gate_a = loader.gate("a");
    let gate_b = loader.gate("b");
    let session = ViewerSession::new(loader, RecordingGraph::default());

    let driver = async {
        // Both requests are pending; "b" finishes first, "a" later.
        gate_b
            .send(Ok(box_scene("b", [0.0; 3], [1.0; 3])))
            .unwrap();
        tokio::task::yield_now().await;
        gate_a
            .send(Ok(box_scene("a", [0.0; 3], [2.0; 3])))
            .unwrap();
    };

    let (a, b, ()) = tokio::join!(
        session.request_load(LoadSource::url("a")),
        session.request_load(LoadSource::url("b")),
        driver
    );

    assert_eq!(a.unwrap(), LoadOutcome::Superseded);
    assert!(matches!(b.unwrap(), LoadOutcome::Displayed(_)));
    assert_eq!(session.current().unwrap().label, "b");
    assert_eq!(attached_labels(&session), vec!["b"]);
}

#[tokio::test]
async fn test_stale_completion_while_newer_still_loading() {
    let loader = GatedLoader::default();
    let gate_a = loader.gate("a");
    let gate_b = loader.gate("b");
    let session = ViewerSession::new(loader, RecordingGraph::default());

    let driver = async {
        gate_a
            .send(Ok(box_scene("a", [0.0; 3], [2.0; 3])))
            .unwrap();
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        // "a" finished but must not be shown; "b" is still loading
        assert!(session.current().is_none());
        assert!(matches!(session.status(), SessionStatus::Loading { label, .. } if label == "b"));
        assert_eq!(session.progress(), Some(0.5));

        gate_b
            .send(Ok(box_scene("b", [0.0; 3], [1.0; 3])))
            .unwrap();
    };

    let (a, b, ()) = tokio::join!(
        session.request_load(LoadSource::url("a")),
        session.request_load(LoadSource::url("b")),
        driver
    );

    assert_eq!(a.unwrap(), LoadOutcome::Superseded);
    assert!(b.is_ok());
    assert_eq!(session.current().unwrap().label, "b");
    session.with_graph(|g| assert_eq!(g.most_attached, 1));
}

#[tokio::test]
async fn test_failure_keeps_previous_display() {
    let session = ViewerSession::new(ModelLoader::new(), RecordingGraph::default());
    session
        .request_load(LoadSource::blob("good.stl", ascii_stl(&Mesh::cube(1.0))))
        .await
        .unwrap();

    let err = session
        .request_load(LoadSource::blob("bad.stl", b"garbage".to_vec()))
        .await
        .unwrap_err();

    assert!(err.is_load_failed());
    assert!(matches!(session.status(), SessionStatus::Error { label, .. } if label == "bad.stl"));
    assert_eq!(session.current().unwrap().label, "good.stl");
    assert_eq!(attached_labels(&session), vec!["good.stl"]);
}

#[tokio::test]
async fn test_degenerate_geometry_is_an_error_state() {
    let loader = GatedLoader::default();
    let gate = loader.gate("point");
    let session = ViewerSession::new(loader, RecordingGraph::default());

    gate.send(Ok(box_scene("point", [1.0; 3], [1.0; 3]))).unwrap();
    let err = session.request_load(LoadSource::url("point")).await.unwrap_err();

    assert!(matches!(err, SessionError::DegenerateGeometry { .. }));
    assert!(matches!(session.status(), SessionStatus::Error { .. }));
    assert!(session.current().is_none());
    assert!(attached_labels(&session).is_empty());
}

#[tokio::test]
async fn test_new_load_replaces_displayed_asset() {
    let session = ViewerSession::new(ModelLoader::new(), RecordingGraph::default());
    session
        .request_load(LoadSource::blob("first.stl", ascii_stl(&Mesh::cube(1.0))))
        .await
        .unwrap();
    let first = session.current().unwrap().id;

    session
        .request_load(LoadSource::blob("second.stl", ascii_stl(&Mesh::cube(10.0))))
        .await
        .unwrap();

    assert_eq!(attached_labels(&session), vec!["second.stl"]);
    session.with_graph(|g| {
        assert_eq!(g.detached, vec![first]);
        assert_eq!(g.most_attached, 1);
    });
}

#[tokio::test]
async fn test_stored_asset_load_and_retry() {
    let engine = MemoryEngine::new();
    let store = Arc::new(AssetStore::new(engine.clone()));
    let session = ViewerSession::new(ModelLoader::new(), RecordingGraph::default())
        .with_assets(store.clone());

    let err = session
        .request_load(LoadSource::stored("late.stl"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::LoadFailed { cause: LoadError::NotFound(_), .. }
    ));

    store.save("late.stl", ascii_stl(&Mesh::cube(3.0))).await.unwrap();
    let outcome = session.retry().await.unwrap();

    assert!(matches!(outcome, LoadOutcome::Displayed(_)));
    assert_eq!(session.current().unwrap().label, "late.stl");
    assert_eq!(engine.open_connections(), 0);
}

#[tokio::test]
async fn test_stored_glb_is_centered_and_scaled() {
    let store = Arc::new(AssetStore::new(MemoryEngine::new()));
    let session = ViewerSession::new(ModelLoader::new(), RecordingGraph::default())
        .with_assets(store.clone());
    let cube = Mesh::cuboid(Point3::new(4.0, 4.0, 4.0), Point3::new(6.0, 6.0, 6.0));
    store.save("cube.glb", nested_glb(&cube, [1.0, 0.0, 0.0])).await.unwrap();

    let outcome = session
        .request_load(LoadSource::stored("cube.glb"))
        .await
        .unwrap();

    let LoadOutcome::Displayed(transform) = outcome else {
        panic!("expected display, got {outcome:?}");
    };
    assert!((transform.scale - 1.5 / 12f32.sqrt()).abs() < 1e-5);
    assert!((transform.translation - Vector3::new(-6.0, -5.0, -5.0)).norm() < 1e-5);

    let node = session.current().unwrap().node;
    assert_eq!(node.children[0].name, "group");
    assert_eq!(node.children[0].children[0].name, "box");
    assert_eq!(node.triangle_count(), 12);
    let bounds = node.bounds();
    assert!(bounds.center().coords.norm() < 1e-5);
    assert!((bounds.diagonal() - 1.5).abs() < 1e-5);
}

#[tokio::test]
async fn test_store_failure_surfaces_as_session_error() {
    let engine = MemoryEngine::new();
    engine.set_denied(true);
    let session = ViewerSession::new(ModelLoader::new(), RecordingGraph::default())
        .with_assets(Arc::new(AssetStore::new(engine)));

    let err = session
        .request_load(LoadSource::stored("any.stl"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Store { .. }));
    assert!(matches!(session.status(), SessionStatus::Error { .. }));
}

#[tokio::test]
async fn test_stored_source_without_store() {
    let session = ViewerSession::new(ModelLoader::new(), RecordingGraph::default());
    assert!(matches!(
        session.request_load(LoadSource::stored("a.stl")).await,
        Err(SessionError::NoStore)
    ));
}

#[tokio::test]
async fn test_retry_requires_error_state() {
    let session = ViewerSession::new(ModelLoader::new(), RecordingGraph::default());
    assert!(matches!(
        session.retry().await,
        Err(SessionError::NothingToRetry(_))
    ));
}

#[tokio::test]
async fn test_clear_detaches_and_supersedes() {
    let loader = GatedLoader::default();
    let gate = loader.gate("slow");
    let session = ViewerSession::new(loader, RecordingGraph::default());

    let driver = async {
        session.clear();
        gate.send(Ok(box_scene("slow", [0.0; 3], [1.0; 3]))).unwrap();
    };
    let (outcome, ()) = tokio::join!(session.request_load(LoadSource::url("slow")), driver);

    assert_eq!(outcome.unwrap(), LoadOutcome::Superseded);
    assert!(matches!(session.status(), SessionStatus::Empty));
    assert!(attached_labels(&session).is_empty());
}

#[tokio::test]
async fn test_max_extent_framing() {
    let session = ViewerSession::new(ModelLoader::new(), RecordingGraph::default())
        .with_normalize_config(modelview_core::NormalizeConfig {
            target_fit_size: 2.0,
            metric: modelview_core::SizeMetric::MaxExtent,
        });
    let slab = Mesh::cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(8.0, 2.0, 1.0));

    let outcome = session
        .request_load(LoadSource::blob("slab.stl", ascii_stl(&slab)))
        .await
        .unwrap();

    assert!(matches!(outcome, LoadOutcome::Displayed(t) if (t.scale - 0.25).abs() < 1e-6));
    let bounds = session.current().unwrap().node.bounds();
    assert!((bounds.max_extent() - 2.0).abs() < 1e-5);
}
