// crates/server/src/routes/debug.rs
//! Diagnostics: store counts and a synchronous full sync.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use cclog_db::{sync_all, SyncResult};
use serde::Serialize;
use ts_rs::TS;

use crate::error::ApiResult;
use crate::scan_manager::ScanProgress;
use crate::state::AppState;

#[derive(Debug, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct DebugStatusResponse {
    #[ts(type = "number")]
    pub project_count: i64,
    #[ts(type = "number")]
    pub session_count: i64,
    #[ts(type = "number")]
    pub group_count: i64,
    pub db_path: String,
    pub scan: ScanProgress,
}

/// GET /api/debug/status
pub async fn debug_status(State(state): State<Arc<AppState>>) -> ApiResult<Json<DebugStatusResponse>> {
    let db = &state.db;
    Ok(Json(DebugStatusResponse {
        project_count: db.count_projects().await?,
        session_count: db.count_sessions(None).await?,
        group_count: db.count_project_groups().await?,
        db_path: db.db_path().display().to_string(),
        scan: state.scan.progress(),
    }))
}

/// POST /api/debug/sync - Full sync in the request; returns its result.
pub async fn debug_sync(State(state): State<Arc<AppState>>) -> ApiResult<Json<SyncResult>> {
    let result = sync_all(&state.db, state.source.as_ref()).await?;
    tracing::info!(
        synced = result.sessions_synced,
        skipped = result.sessions_skipped,
        errors = result.error_count,
        "Manual sync finished"
    );
    Ok(Json(result))
}

/// Create the debug routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/debug/status", get(debug_status))
        .route("/debug/sync", post(debug_sync))
}
