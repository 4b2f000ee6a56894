//! airliftd - self-hosted file drop daemon
//!
//! Accepts uploads over HTTP, hands back short stable URLs, and serves
//! the files (and lazy image thumbnails) until a size, age, or count
//! budget evicts them.

mod cache;
mod config;
mod http;
mod shortid;
mod thumb;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cache::FileCache;
use crate::config::SharedConfig;
use crate::http::server::UploadStore;
use crate::http::AppState;
use crate::thumb::{JpegEncoder, ThumbCache};

const APP_DIR_NAME: &str = ".airliftd";

/// JPEG quality for generated thumbnails.
const THUMB_QUALITY: u8 = 88;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let home = dirs::home_dir().context("cannot locate home directory")?;
    let app_dir = home.join(APP_DIR_NAME);
    std::fs::create_dir_all(&app_dir).context("creating app directory")?;

    let config = SharedConfig::load_or_create(app_dir.join("config.json"))?;
    let settings = config.snapshot();

    let files = Arc::new(FileCache::new(&settings.directory)?);
    let thumbs = ThumbCache::start(
        app_dir.join("thumb-cache"),
        JpegEncoder {
            quality: THUMB_QUALITY,
        },
        Arc::new(UploadStore(files.clone())),
    )?;

    // removing an upload drops its renditions with it
    let hook_thumbs = thumbs.clone();
    files.on_remove(move |id| hook_thumbs.remove_detached(id));

    // daily age pruning
    {
        let files = files.clone();
        let conf = config.clone();
        tokio::spawn(async move { files.watch_ages(&conf).await });
    }

    // SIGHUP re-reads the config file
    #[cfg(unix)]
    {
        let conf = config.clone();
        tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};
            let mut hup = match signal(SignalKind::hangup()) {
                Ok(stream) => stream,
                Err(e) => {
                    error!(error = %e, "cannot install SIGHUP handler");
                    return;
                }
            };
            while hup.recv().await.is_some() {
                info!("SIGHUP received, reloading config");
                if let Err(e) = conf.reload() {
                    error!(error = %e, "config reload failed, keeping previous settings");
                }
            }
        });
    }

    let app = http::router(AppState {
        files,
        thumbs,
        config,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    info!(addr = %addr, "airliftd listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("binding listen socket")?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down...");
        })
        .await
        .context("server error")?;

    Ok(())
}
