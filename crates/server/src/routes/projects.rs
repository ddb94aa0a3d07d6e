// crates/server/src/routes/projects.rs
//! Project list, per-project stats, timeline and daily drill-down.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use cclog_db::{BranchStats, Database, ProjectRow, ProjectStats};
use chrono::NaiveDate;
use serde::Serialize;
use ts_rs::TS;

use super::sessions::SessionSummary;
use super::{display_name, parse_date, TimeSeriesResponse, TimelineQuery};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub name: String,
    pub decoded_path: String,
    pub display_name: String,
    pub git_root: Option<String>,
    #[ts(type = "number")]
    pub session_count: i64,
}

#[derive(Debug, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
pub struct ProjectListResponse {
    pub projects: Vec<ProjectResponse>,
}

#[derive(Debug, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatsResponse {
    #[serde(flatten)]
    pub stats: ProjectStats,
    /// Input plus output tokens.
    #[ts(type = "number")]
    pub total_tokens: i64,
    pub branches: Vec<BranchStats>,
}

#[derive(Debug, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
pub struct DailySessionsResponse {
    #[ts(type = "string")]
    pub date: NaiveDate,
    pub sessions: Vec<SessionSummary>,
}

/// Load a project by its encoded name or answer 404.
pub(crate) async fn project_by_name(db: &Database, name: &str) -> ApiResult<ProjectRow> {
    db.get_project_by_name(name)
        .await?
        .ok_or_else(|| ApiError::ProjectNotFound(name.to_string()))
}

/// Base name of the project's recorded working directory, else its encoded name.
pub(crate) async fn project_display_name(db: &Database, project: &ProjectRow) -> String {
    match db.project_working_directory(project.id).await {
        Ok(Some(cwd)) => display_name(&cwd),
        Ok(None) => project.name.clone(),
        Err(e) => {
            tracing::warn!(project = %project.name, error = %e, "Failed to load working directory");
            project.name.clone()
        }
    }
}

pub(crate) async fn project_response(db: &Database, project: ProjectRow) -> ProjectResponse {
    let session_count = match db.count_sessions(Some(project.id)).await {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(project = %project.name, error = %e, "Failed to count sessions");
            0
        }
    };
    ProjectResponse {
        display_name: project_display_name(db, &project).await,
        name: project.name,
        decoded_path: project.decoded_path,
        git_root: project.git_root,
        session_count,
    }
}

/// GET /api/projects - All projects with display names and session counts.
pub async fn list_projects(State(state): State<Arc<AppState>>) -> ApiResult<Json<ProjectListResponse>> {
    let rows = state.db.list_projects().await?;
    let mut projects = Vec::with_capacity(rows.len());
    for row in rows {
        projects.push(project_response(&state.db, row).await);
    }
    Ok(Json(ProjectListResponse { projects }))
}

/// GET /api/projects/{name}/stats - Totals plus a per-branch breakdown.
pub async fn project_stats(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<ProjectStatsResponse>> {
    let project = project_by_name(&state.db, &name).await?;
    let stats = state.db.project_stats(project.id).await?;
    let branches = state.db.branch_stats(project.id).await?;
    Ok(Json(ProjectStatsResponse {
        total_tokens: stats.total_input_tokens + stats.total_output_tokens,
        stats,
        branches,
    }))
}

/// GET /api/projects/{name}/timeline?period=&limit=
pub async fn project_timeline(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<TimelineQuery>,
) -> ApiResult<Json<TimeSeriesResponse>> {
    let (period, limit) = query.parse()?;
    let project = project_by_name(&state.db, &name).await?;
    let data = state.db.project_timeline(project.id, period, limit).await?;
    Ok(Json(TimeSeriesResponse { period, data }))
}

/// GET /api/projects/{name}/daily/{date} - Sessions touching that date.
pub async fn project_daily(
    State(state): State<Arc<AppState>>,
    Path((name, date)): Path<(String, String)>,
) -> ApiResult<Json<DailySessionsResponse>> {
    let date = parse_date(&date)?;
    let project = project_by_name(&state.db, &name).await?;
    let rows = state.db.project_daily_sessions(project.id, date).await?;
    let sessions = rows
        .into_iter()
        .map(|row| SessionSummary::from_row(row, &project.name))
        .collect();
    Ok(Json(DailySessionsResponse { date, sessions }))
}

/// Create the projects routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/projects", get(list_projects))
        .route("/projects/{name}/stats", get(project_stats))
        .route("/projects/{name}/timeline", get(project_timeline))
        .route("/projects/{name}/daily/{date}", get(project_daily))
}
