//! bf-server: HTTP API for the photo booth.
//!
//! This crate ties the bf-* crates together into a running server:
//!
//! - Axum HTTP API for capture, restyle, listing, wipe, and bulk export
//! - Per-event SSE live updates fed by the shared event bus
//! - Local media serving under `/media`
//! - Graceful shutdown via signal handling

pub mod context;
pub mod error;
pub mod router;
pub mod routes;
pub mod service;

use std::net::SocketAddr;

use bf_core::config::Config;
use bf_core::Error;

use crate::context::AppContext;

/// Start the boothforge server.
///
/// Opens the database, prepares the media directory, discovers external
/// tools, builds the [`AppContext`], and serves until a shutdown signal.
pub async fn start(config: Config) -> bf_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    // Initialize database.
    let db_path = &config.server.db_path;
    let existed = db_path.exists();
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| Error::Io { source: e })?;
            tracing::info!("Created database directory {}", parent.display());
        }
    }
    let db_str = db_path.to_string_lossy();
    let db = bf_db::SqliteStore::open(&db_str)?;
    if existed {
        tracing::info!("Database opened (existing) at {db_str}");
    } else {
        tracing::info!("Database created (new) at {db_str}");
    }

    std::fs::create_dir_all(&config.server.media_dir).map_err(|e| Error::Io { source: e })?;

    // Discover external tools.
    let tools = bf_av::ToolRegistry::discover(&config.tools);
    for info in tools.check_all() {
        if info.available {
            tracing::info!(
                "Tool found: {} ({})",
                info.name,
                info.version.as_deref().unwrap_or("unknown version")
            );
        } else {
            tracing::warn!("Tool not found: {}; GIF and boomerang capture will fail", info.name);
        }
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| Error::Internal(format!("Invalid server address: {e}")))?;
    let static_dir = config.server.static_dir.clone();

    let ctx = AppContext::new(config, db, tools)?;
    tracing::info!(styles = ctx.styles.len(), "Style catalog ready");
    let app = router::build_router(ctx, static_dir);

    tracing::info!("Starting server on {addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Io { source: e })?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}
