// crates/server/src/main.rs
//! cclog server binary.
//!
//! Opens the store, regroups projects, kicks off the catch-up scan in the
//! background and serves the API right away. Scan progress is visible at
//! `/api/scan/status` while it runs.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use cclog_core::FileSessionSource;
use cclog_db::{sync_project_groups, Database};
use cclog_server::{create_app, AppState, FileWatcher, IncrementalSync, ServerConfig};
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = ServerConfig::from_env();
    tracing::debug!(?config, "Loaded configuration");

    let db = match &config.db_path {
        Some(path) => Database::new(path).await,
        None => Database::open_default().await,
    }
    .context("failed to open database")?;

    let projects_dir = config
        .projects_dir
        .clone()
        .context("cannot locate the Claude projects directory; set CLAUDE_PROJECTS_DIR")?;
    tracing::info!(path = %projects_dir.display(), "Reading sessions");
    let source = Arc::new(FileSessionSource::new(projects_dir));

    match sync_project_groups(&db).await {
        Ok(summary) => tracing::info!(
            groups_created = summary.groups_created,
            memberships_added = summary.memberships_added,
            "Project groups synchronized"
        ),
        Err(e) => tracing::warn!(error = %e, "Failed to synchronize project groups"),
    }

    let state = AppState::new(db.clone(), source.clone());

    if config.skip_initial_sync {
        tracing::info!("Skipping initial sync");
    } else if let Err(e) = state.scan.start_scan() {
        tracing::warn!(error = %e, "Initial scan not started");
    }

    let watcher = config.watcher.enabled.then(|| {
        let watcher = FileWatcher::new(Arc::new(IncrementalSync::new(db, source)), &config.watcher);
        watcher.start();
        watcher
    });

    let app = create_app(state.clone(), !config.disable_cors);
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(watcher) = watcher {
        watcher.stop().await;
    }
    state.scan.stop().await;
    tracing::info!("Server stopped");
    Ok(())
}
