//! The viewer session.
//!
//! One asset is displayed at a time. Each load request gets a sequence
//! number; when a decode finishes, its result is applied only if no newer
//! request has been made since. In-flight decodes are never aborted, their
//! results are just dropped.
//!
//! All session state sits behind one lock that is never held across an
//! await, so swapping the displayed node is a single critical section and
//! the renderer can draw from the same graph between loads.

use std::sync::Arc;

use modelview_core::{normalize_scene, NormalizationTransform, NormalizeConfig, SceneNode};
use parking_lot::Mutex;

use crate::error::SessionError;
use crate::loader::{LoadError, SceneLoader};
use crate::render::{NodeId, RenderGraph};
use crate::source::{AssetLookup, LoadInput, LoadSource};

/// Observable session state
#[derive(Debug, Clone)]
pub enum SessionStatus {
    Empty,
    Loading {
        request: u64,
        label: String,
        progress: f32,
    },
    Displayed {
        label: String,
    },
    Error {
        label: String,
        cause: SessionError,
    },
}

/// How a load request ended for its caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadOutcome {
    /// The asset is now on screen with this normalization.
    Displayed(NormalizationTransform),
    /// A newer request (or a clear) arrived first; the result was dropped.
    Superseded,
}

/// The asset currently on screen.
#[derive(Debug, Clone)]
pub struct DisplayedAsset {
    pub id: NodeId,
    pub label: String,
    pub transform: NormalizationTransform,
    pub node: Arc<SceneNode>,
}

enum State {
    Empty,
    Loading { label: String, progress: f32 },
    Displayed,
    Error { source: LoadSource, cause: SessionError },
}

struct Inner<R> {
    graph: R,
    /// Sequence number of the newest request; only it may change the display
    latest: u64,
    state: State,
    displayed: Option<DisplayedAsset>,
}

pub struct ViewerSession<L, R> {
    loader: L,
    assets: Option<Arc<dyn AssetLookup>>,
    normalize: NormalizeConfig,
    inner: Mutex<Inner<R>>,
}

impl<L: SceneLoader, R: RenderGraph> ViewerSession<L, R> {
    pub fn new(loader: L, graph: R) -> Self {
        Self {
            loader,
            assets: None,
            normalize: NormalizeConfig::default(),
            inner: Mutex::new(Inner {
                graph,
                latest: 0,
                state: State::Empty,
                displayed: None,
            }),
        }
    }

    /// Resolve [`LoadSource::Stored`] requests through `assets`.
    pub fn with_assets(mut self, assets: Arc<dyn AssetLookup>) -> Self {
        self.assets = Some(assets);
        self
    }

    pub fn with_normalize_config(mut self, config: NormalizeConfig) -> Self {
        self.normalize = config;
        self
    }

    pub fn normalize_config(&self) -> &NormalizeConfig {
        &self.normalize
    }

    /// Load, normalize and display `source`, replacing whatever is shown.
    ///
    /// Returns `Superseded` if another request or a clear happened while this
    /// one was decoding. Failures leave the current display untouched and
    /// put the session in the error state.
    pub async fn request_load(&self, source: LoadSource) -> Result<LoadOutcome, SessionError> {
        let request = self.begin(&source);
        log::debug!("Request {} for {}", request, source.label());

        let result = self.fetch_and_decode(request, &source).await;
        self.finish(request, source, result)
    }

    /// Repeat the request that put the session in the error state.
    pub async fn retry(&self) -> Result<LoadOutcome, SessionError> {
        let source = match &self.inner.lock().state {
            State::Error { source, .. } => source.clone(),
            _ => return Err(SessionError::NothingToRetry("session is not in the error state")),
        };
        self.request_load(source).await
    }

    /// Remove the displayed asset and return to `Empty`, dropping the
    /// result of any in-flight request.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.latest += 1;
        if let Some(old) = inner.displayed.take() {
            inner.graph.detach(old.id);
        }
        inner.state = State::Empty;
    }

    pub fn status(&self) -> SessionStatus {
        let inner = self.inner.lock();
        match &inner.state {
            State::Empty => SessionStatus::Empty,
            State::Loading { label, progress } => SessionStatus::Loading {
                request: inner.latest,
                label: label.clone(),
                progress: *progress,
            },
            State::Displayed => SessionStatus::Displayed {
                label: inner
                    .displayed
                    .as_ref()
                    .map(|d| d.label.clone())
                    .unwrap_or_default(),
            },
            State::Error { source, cause } => SessionStatus::Error {
                label: source.label().to_owned(),
                cause: cause.clone(),
            },
        }
    }

    /// Decode progress of the pending request, if one is loading.
    pub fn progress(&self) -> Option<f32> {
        match self.inner.lock().state {
            State::Loading { progress, .. } => Some(progress),
            _ => None,
        }
    }

    /// The asset on screen. Unchanged by failed or pending loads.
    pub fn current(&self) -> Option<DisplayedAsset> {
        self.inner.lock().displayed.clone()
    }

    /// Run `f` against the render graph, e.g. to draw a frame.
    pub fn with_graph<T>(&self, f: impl FnOnce(&mut R) -> T) -> T {
        f(&mut self.inner.lock().graph)
    }

    fn begin(&self, source: &LoadSource) -> u64 {
        let mut inner = self.inner.lock();
        inner.latest += 1;
        inner.state = State::Loading {
            label: source.label().to_owned(),
            progress: 0.0,
        };
        inner.latest
    }

    fn report_progress(&self, request: u64, fraction: f32) {
        let mut inner = self.inner.lock();
        if inner.latest != request {
            return;
        }
        if let State::Loading { progress, .. } = &mut inner.state {
            // Keep it monotonic even if a loader misbehaves
            *progress = progress.max(fraction.clamp(0.0, 1.0));
            log::trace!("Request {} at {:.0}%", request, *progress * 100.0);
        }
    }

    async fn resolve(&self, source: &LoadSource) -> Result<LoadInput, SessionError> {
        match source {
            LoadSource::Blob { name, data } => Ok(LoadInput::Bytes {
                name: name.clone(),
                data: Arc::clone(data),
            }),
            LoadSource::Url(url) => Ok(LoadInput::Url(url.clone())),
            LoadSource::Stored(name) => {
                let assets = self.assets.as_ref().ok_or(SessionError::NoStore)?;
                let asset = assets.fetch(name).await.map_err(|e| SessionError::Store {
                    source_label: name.clone(),
                    cause: Arc::new(e),
                })?;
                let asset = asset.ok_or_else(|| SessionError::LoadFailed {
                    source_label: name.clone(),
                    cause: LoadError::NotFound(name.clone()),
                })?;
                Ok(LoadInput::Bytes {
                    name: asset.name,
                    data: asset.file.into(),
                })
            }
        }
    }

    async fn fetch_and_decode(
        &self,
        request: u64,
        source: &LoadSource,
    ) -> Result<(SceneNode, NormalizationTransform), SessionError> {
        let input = self.resolve(source).await?;
        let progress = |fraction: f32| self.report_progress(request, fraction);
        let scene = self
            .loader
            .decode(&input, &progress)
            .await
            .map_err(|cause| SessionError::LoadFailed {
                source_label: source.label().to_owned(),
                cause,
            })?;

        let transform =
            normalize_scene(&scene, &self.normalize).map_err(|cause| {
                SessionError::DegenerateGeometry {
                    source_label: source.label().to_owned(),
                    cause,
                }
            })?;
        Ok((scene, transform))
    }

    fn finish(
        &self,
        request: u64,
        source: LoadSource,
        result: Result<(SceneNode, NormalizationTransform), SessionError>,
    ) -> Result<LoadOutcome, SessionError> {
        let mut inner = self.inner.lock();
        if inner.latest != request {
            log::debug!(
                "Discarding result of request {} for {} (latest is {})",
                request,
                source.label(),
                inner.latest
            );
            return Ok(LoadOutcome::Superseded);
        }

        match result {
            Ok((mut scene, transform)) => {
                transform.apply_to(&mut scene);
                let node = Arc::new(scene);
                let id = NodeId(request);

                if let Some(old) = inner.displayed.take() {
                    inner.graph.detach(old.id);
                }
                inner.graph.attach(id, Arc::clone(&node));
                inner.displayed = Some(DisplayedAsset {
                    id,
                    label: source.label().to_owned(),
                    transform,
                    node,
                });
                inner.state = State::Displayed;

                log::info!("Displaying {} (scale {:.4})", source.label(), transform.scale);
                Ok(LoadOutcome::Displayed(transform))
            }
            Err(cause) => {
                log::warn!("Load of {} failed: {}", source.label(), cause);
                inner.state = State::Error {
                    source,
                    cause: cause.clone(),
                };
                Err(cause)
            }
        }
    }
}
