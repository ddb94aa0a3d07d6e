// crates/server/src/routes/analyze.rs
//! On-demand synchronization of all projects or a chosen few.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use cclog_db::{sync_all, sync_project, sync_project_groups, SyncIssue, SyncResult};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    /// Empty means every project.
    #[serde(default)]
    pub project_names: Vec<String>,
}

#[derive(Debug, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub status: String,
    #[ts(type = "number")]
    pub projects_processed: usize,
    #[ts(type = "number")]
    pub sessions_found: usize,
    #[ts(type = "number")]
    pub sessions_parsed: usize,
    #[ts(type = "number")]
    pub sessions_skipped: usize,
    #[ts(type = "number")]
    pub error_count: usize,
    pub errors: Vec<SyncIssue>,
    pub message: String,
}

impl From<SyncResult> for AnalyzeResponse {
    fn from(result: SyncResult) -> Self {
        Self {
            status: "completed".to_string(),
            message: format!(
                "Synced {} sessions from {} projects",
                result.sessions_synced, result.projects_processed
            ),
            projects_processed: result.projects_processed,
            sessions_found: result.sessions_found,
            sessions_parsed: result.sessions_synced,
            sessions_skipped: result.sessions_skipped,
            error_count: result.error_count,
            errors: result.errors,
        }
    }
}

/// POST /api/analyze - Sync every project, one project, or several in turn.
///
/// A single named project that cannot be synced fails the request. With
/// several names each failure is recorded in the result instead.
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let db = &state.db;
    let source = state.source.as_ref();

    let result = match request.project_names.as_slice() {
        [] => sync_all(db, source).await?,
        [name] => sync_project(db, source, name).await?,
        names => {
            let mut merged = SyncResult::default();
            for name in names {
                match sync_project(db, source, name).await {
                    Ok(result) => merged.absorb(result),
                    Err(e) => {
                        tracing::warn!(project = %name, error = %e, "Failed to analyze project");
                        merged.record(name, None, e.to_string());
                    }
                }
            }
            merged
        }
    };

    if !request.project_names.is_empty() {
        if let Err(e) = sync_project_groups(db).await {
            tracing::warn!(error = %e, "Failed to sync project groups");
        }
    }

    tracing::info!(
        projects = result.projects_processed,
        synced = result.sessions_synced,
        errors = result.error_count,
        "Analyze finished"
    );
    Ok(Json(result.into()))
}

/// Create the analyze routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/analyze", post(analyze))
}
