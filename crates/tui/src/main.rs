mod app;

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};

use steamscape_core::{
    config::{self, AppConfig},
    demo,
    steam::parse_steam_id,
    store::LibraryStore,
};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;
    let demo_mode = config.demo_mode();

    let (store, steam_id) = if demo_mode {
        let store = LibraryStore::new(config.cache_root.join("demo"));
        demo::seed_store(&store).context("failed to seed demo library")?;
        (store, demo::DEMO_STEAM_ID.to_string())
    } else {
        let raw = config.steam_id.as_deref().unwrap_or_default();
        let steam_id = parse_steam_id(raw).context("invalid steam_id in configuration")?;
        (LibraryStore::from_config(&config), steam_id)
    };
    info!(steam_id = %steam_id, demo = demo_mode, "Starting steamscape");

    let (sync_tx, sync_rx) = mpsc::channel(8);
    let mut app = app::SteamscapeApp::new(config, store, steam_id, demo_mode);
    app.attach_sync(sync_tx, sync_rx);
    if !demo_mode {
        app.start_sync();
    }
    app.run().await
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("steamscape.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // the terminal UI owns stdout, so logs only go to the file
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(std::sync::Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
