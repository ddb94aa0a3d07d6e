// crates/server/src/lib.rs
//! cclog server library.
//!
//! Axum HTTP API over the session store, plus the background scan manager
//! and the polling watcher that keep the store current.

pub mod config;
pub mod error;
pub mod routes;
pub mod scan_manager;
pub mod state;
pub mod watcher;

pub use config::{ServerConfig, WatcherConfig};
pub use error::*;
pub use routes::api_routes;
pub use scan_manager::{ScanError, ScanManager, ScanProgress, ScanStatus};
pub use state::AppState;
pub use watcher::{FileWatcher, IncrementalSync, SyncTrigger};

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes under `/api`
/// - CORS allowing any origin, when `cors` is set
/// - Request tracing
pub fn create_app(state: Arc<AppState>, cors: bool) -> Router {
    let mut app = Router::new().merge(api_routes(state));

    if cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    app.layer(TraceLayer::new_for_http())
}

// ============================================================================
// Integration Tests
// ============================================================================
