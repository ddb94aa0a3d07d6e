// crates/server/src/routes/scan.rs
//! Background scan trigger and progress polling.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use ts_rs::TS;

use crate::error::ApiResult;
use crate::scan_manager::ScanProgress;
use crate::state::AppState;

#[derive(Debug, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
pub struct ScanStartedResponse {
    pub message: String,
    pub status: String,
}

/// GET /api/scan/status - Copy of the current scan progress.
pub async fn scan_status(State(state): State<Arc<AppState>>) -> Json<ScanProgress> {
    Json(state.scan.progress())
}

/// POST /api/scan - Start a background scan; 409 while one is running.
pub async fn start_scan(
    State(state): State<Arc<AppState>>,
) -> ApiResult<(StatusCode, Json<ScanStartedResponse>)> {
    state.scan.start_scan()?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ScanStartedResponse {
            message: "Scan started".to_string(),
            status: "accepted".to_string(),
        }),
    ))
}

/// Create the scan routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/scan/status", get(scan_status))
        .route("/scan", post(start_scan))
}
