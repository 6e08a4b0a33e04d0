/// modelview - terminal model viewer
///
/// Usage: modelview [--config PATH] [FILE ...]
///
/// Files given on the command line are saved to the asset store and the first
/// one is displayed. Stored assets persist when `store_root` is configured.
/// Controls:
///   - Tab: next stored asset
///   - x: delete the displayed asset from the store
///   - t: retry a failed load, c: clear the viewport
///   - WASD / Arrow Keys: orbit, E/R: roll
///   - Q/ESC: Quit
///
/// Logs go to the file named by `MODELVIEW_LOG` (verbosity from `RUST_LOG`).
use std::error::Error;
use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use modelview_session::ViewerConfig;
use modelview_store::{AssetStore, FsEngine, MemoryEngine, StorageEngine};
use modelview_terminal::TerminalApp;

#[derive(Parser, Debug)]
#[command(name = "modelview")]
#[command(about = "View 3D models in the terminal", long_about = None)]
struct CliArgs {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model files (.stl, .glb, .gltf) to save to the store; the first one is shown
    files: Vec<PathBuf>,
}

fn init_logging() -> Result<(), Box<dyn Error>> {
    // The alternate screen hides stderr, so only errors go there by default
    let mut builder = match std::env::var_os("MODELVIEW_LOG") {
        Some(path) => {
            let mut builder =
                env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
            builder.target(env_logger::Target::Pipe(Box::new(File::create(path)?)));
            builder
        }
        None => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("error"))
        }
    };
    builder.init();
    Ok(())
}

async fn run<E: StorageEngine + 'static>(
    engine: E,
    config: ViewerConfig,
    files: Vec<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let store = AssetStore::with_config(engine, config.store.clone());
    let mut app = TerminalApp::new(store, &config)?;
    app.import_files(&files).await;
    app.run().await?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = CliArgs::parse();
    init_logging()?;

    let config = match &args.config {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };
    log::info!("Starting with {:?}", config);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    match config.store_root.clone() {
        Some(root) => runtime.block_on(run(FsEngine::new(root), config, args.files)),
        None => runtime.block_on(run(MemoryEngine::new(), config, args.files)),
    }
}
