/// Terminal model viewer: stores files, browses stored assets, renders them as ASCII
use std::io::{self, stdout, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use modelview_core::{Camera, Orbit};
use modelview_session::{
    LoadSource, ModelLoader, RenderConfig, SessionStatus, ViewerConfig, ViewerSession,
};
use modelview_store::{AssetStore, StorageEngine};
use tokio::time::{interval, MissedTickBehavior};

pub mod renderer;

pub use renderer::AsciiRenderer;

/// Rows above the viewport: title/status and notices
const HEADER_ROWS: u16 = 2;

pub type TerminalSession = ViewerSession<ModelLoader, AsciiRenderer>;

/// Interactive viewer over an asset store
pub struct TerminalApp<E> {
    session: Arc<TerminalSession>,
    store: Arc<AssetStore<E>>,
    render: RenderConfig,
    camera: Camera,
    orbit: Orbit,
    /// Names in the store, sorted
    stored: Vec<String>,
    /// Last save/delete/list failure shown under the status line
    notice: Option<String>,
    running: bool,
    last_fps_sample: Instant,
    frame_count: u32,
    fps: f32,
}

impl<E: StorageEngine + 'static> TerminalApp<E> {
    pub fn new(store: AssetStore<E>, config: &ViewerConfig) -> io::Result<Self> {
        let (width, height) = viewport(terminal::size()?);
        let store = Arc::new(store);
        let session = ViewerSession::new(ModelLoader::new(), AsciiRenderer::new(width, height))
            .with_assets(store.clone())
            .with_normalize_config(config.normalize);

        Ok(Self {
            session: Arc::new(session),
            store,
            render: config.render.clone(),
            camera: config.render.camera(width as u32, height as u32),
            orbit: Orbit::new(0.3, 0.3, 0.0),
            stored: Vec::new(),
            notice: None,
            running: true,
            last_fps_sample: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        })
    }

    pub fn session(&self) -> &Arc<TerminalSession> {
        &self.session
    }

    /// Save each file to the store under its file name, then show the first
    /// one that was saved.
    pub async fn import_files(&mut self, paths: &[PathBuf]) {
        let mut first = None;
        for path in paths {
            match self.import_file(path).await {
                Ok(name) => {
                    log::info!("Stored {} as {}", path.display(), name);
                    first.get_or_insert(name);
                }
                Err(message) => {
                    log::error!("{}", message);
                    self.notice = Some(message);
                }
            }
        }

        self.refresh_assets().await;
        if let Some(name) = first {
            self.show(LoadSource::stored(name));
        }
    }

    async fn import_file(&self, path: &Path) -> Result<String, String> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| format!("{} is not a file", path.display()))?;
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        self.store
            .save(&name, data)
            .await
            .map_err(|e| format!("cannot save {}: {}", name, e))?;
        Ok(name)
    }

    async fn refresh_assets(&mut self) {
        match self.store.list_all().await {
            Ok(assets) => {
                self.stored = assets.into_iter().map(|a| a.name).collect();
                self.stored.sort();
            }
            Err(e) => {
                log::error!("Cannot list stored assets: {}", e);
                self.notice = Some(format!("cannot list assets: {}", e));
            }
        }
    }

    /// Start loading `source` without blocking the render loop.
    fn show(&self, source: LoadSource) {
        let session = Arc::clone(&self.session);
        tokio::spawn(async move {
            // Failures are reflected in the session status
            let _ = session.request_load(source).await;
        });
    }

    async fn show_next(&mut self) {
        self.refresh_assets().await;
        let current = self.session.current().map(|d| d.label);
        if let Some(name) = next_asset(&self.stored, current.as_deref()) {
            let source = LoadSource::stored(name);
            self.show(source);
        }
    }

    async fn delete_displayed(&mut self) {
        let Some(displayed) = self.session.current() else {
            return;
        };
        if !self.stored.contains(&displayed.label) {
            return;
        }

        match self.store.delete(&displayed.label).await {
            Ok(()) => {
                log::info!("Deleted {}", displayed.label);
                self.session.clear();
                self.notice = None;
            }
            Err(e) => {
                log::error!("Cannot delete {}: {}", displayed.label, e);
                self.notice = Some(format!("cannot delete {}: {}", displayed.label, e));
            }
        }
        self.refresh_assets().await;
    }

    pub async fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop().await;

        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    async fn main_loop(&mut self) -> io::Result<()> {
        let frame_time = Duration::from_secs(1) / self.render.target_fps.max(1);
        let mut ticker = interval(frame_time);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while self.running {
            // Also lets spawned loads make progress
            ticker.tick().await;

            while event::poll(Duration::ZERO)? {
                match event::read()? {
                    Event::Key(key) => self.handle_key(key).await,
                    Event::Resize(..) => execute!(stdout(), terminal::Clear(ClearType::All))?,
                    _ => {}
                }
            }

            // Slow idle spin
            self.orbit.rotate(0.0, 0.01, 0.0);
            self.render()?;

            self.frame_count += 1;
            let elapsed = self.last_fps_sample.elapsed();
            if elapsed >= Duration::from_secs(1) {
                self.fps = self.frame_count as f32 / elapsed.as_secs_f32();
                self.frame_count = 0;
                self.last_fps_sample = Instant::now();
            }
        }

        Ok(())
    }

    async fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Tab => self.show_next().await,
            KeyCode::Char('x') => self.delete_displayed().await,
            KeyCode::Char('c') => self.session.clear(),
            KeyCode::Char('t') => {
                let session = Arc::clone(&self.session);
                tokio::spawn(async move {
                    let _ = session.retry().await;
                });
            }
            KeyCode::Char('w') | KeyCode::Up => self.orbit.rotate(0.1, 0.0, 0.0),
            KeyCode::Char('s') | KeyCode::Down => self.orbit.rotate(-0.1, 0.0, 0.0),
            KeyCode::Char('a') | KeyCode::Left => self.orbit.rotate(0.0, -0.1, 0.0),
            KeyCode::Char('d') | KeyCode::Right => self.orbit.rotate(0.0, 0.1, 0.0),
            KeyCode::Char('e') => self.orbit.rotate(0.0, 0.0, 0.1),
            KeyCode::Char('r') => self.orbit.rotate(0.0, 0.0, -0.1),
            _ => {}
        }
    }

    fn render(&mut self) -> io::Result<()> {
        let (columns, rows) = terminal::size()?;
        let (width, height) = viewport((columns, rows));
        self.camera.resize(width as u32, height as u32);

        let mut stdout = stdout();
        let camera = &self.camera;
        let orbit = &self.orbit;
        self.session.with_graph(|renderer| {
            renderer.resize(width, height);
            renderer.render_frame(camera, orbit);
            renderer.draw(&mut stdout, HEADER_ROWS)
        })?;

        let status = status_text(&self.session.status());
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            terminal::Clear(ClearType::CurrentLine),
            SetForegroundColor(Color::Yellow),
            Print(fit(
                &format!(
                    "modelview | {} | {} stored | FPS {:.1} | Tab=next x=delete t=retry c=clear WASD=orbit q=quit",
                    status,
                    self.stored.len(),
                    self.fps
                ),
                columns
            )),
            cursor::MoveTo(0, 1),
            terminal::Clear(ClearType::CurrentLine),
            SetForegroundColor(Color::Red),
            Print(fit(self.notice.as_deref().unwrap_or(""), columns)),
            ResetColor
        )?;

        stdout.flush()
    }
}

/// Renderer size for a terminal of `(columns, rows)`
fn viewport((columns, rows): (u16, u16)) -> (usize, usize) {
    (
        columns.max(1) as usize,
        rows.saturating_sub(HEADER_ROWS).max(1) as usize,
    )
}

fn fit(text: &str, columns: u16) -> String {
    text.chars().take(columns as usize).collect()
}

/// One-line summary of the session for the status bar
pub fn status_text(status: &SessionStatus) -> String {
    match status {
        SessionStatus::Empty => "no model".to_owned(),
        SessionStatus::Loading {
            label, progress, ..
        } => format!("loading {} {:.0}%", label, progress * 100.0),
        SessionStatus::Displayed { label } => format!("showing {}", label),
        SessionStatus::Error { cause, .. } => format!("error: {}", cause),
    }
}

/// The stored asset after `current`, wrapping around; the first one if
/// nothing stored is displayed.
pub fn next_asset<'a>(stored: &'a [String], current: Option<&str>) -> Option<&'a str> {
    if stored.is_empty() {
        return None;
    }
    let next = current
        .and_then(|name| stored.iter().position(|n| n == name))
        .map_or(0, |i| (i + 1) % stored.len());
    Some(&stored[next])
}
