//! chunkport upload server.

mod config;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chunkport_server::UploadServer;
use chunkport_sink::FsSink;

use crate::config::DaemonConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "starting chunkport server");

    let path = DaemonConfig::locate();
    let config = match DaemonConfig::load(path.as_deref()) {
        Ok(c) => {
            info!(path = ?path, "configuration loaded");
            c
        }
        Err(e) => {
            warn!(error = %e, path = ?path, "failed to load config, using defaults");
            DaemonConfig::default()
        }
    };

    std::fs::create_dir_all(&config.storage_root)?;
    info!(root = %config.storage_root.display(), "storing uploads");

    let sink = Arc::new(FsSink::new(config.storage_root.clone()));
    let server = UploadServer::new(config.server, sink)?;

    let runner = Arc::clone(&server);
    let mut serve = tokio::spawn(async move { runner.run().await });

    tokio::select! {
        _ = shutdown_signal() => {}
        result = &mut serve => {
            result??;
            return Ok(());
        }
    }

    // Running uploads still complete and get their status.
    server.shutdown();
    serve.await??;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                ctrl_c.await.ok();
                info!("received Ctrl+C, shutting down");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("received Ctrl+C, shutting down");
    }
}
