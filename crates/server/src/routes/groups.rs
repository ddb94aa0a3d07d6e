// crates/server/src/routes/groups.rs
//! Project group endpoints: list, detail, stats, timeline and daily breakdown.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use cclog_db::{DailyProjectStats, Database, GroupStats, ProjectGroupRow, ProjectRow};
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;
use ts_rs::TS;

use super::projects::{project_display_name, project_response, ProjectResponse};
use super::{display_name, parse_date, parse_group_id, TimeSeriesResponse, TimelineQuery};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct GroupResponse {
    #[ts(type = "number")]
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub git_root: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<FixedOffset>,
    #[ts(type = "string")]
    pub updated_at: DateTime<FixedOffset>,
}

#[derive(Debug, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
pub struct GroupListResponse {
    pub groups: Vec<GroupResponse>,
}

#[derive(Debug, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
pub struct GroupDetailResponse {
    #[serde(flatten)]
    pub group: GroupResponse,
    pub projects: Vec<ProjectResponse>,
}

#[derive(Debug, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
pub struct GroupDailyResponse {
    #[ts(type = "string")]
    pub date: NaiveDate,
    pub projects: Vec<DailyProjectStats>,
}

/// Repository name for rooted groups, else the first member's directory name.
async fn group_display_name(db: &Database, group: &ProjectGroupRow, members: &[ProjectRow]) -> String {
    if let Some(root) = &group.git_root {
        return display_name(root);
    }
    match members.first() {
        Some(project) => project_display_name(db, project).await,
        None => group.name.clone(),
    }
}

async fn group_response(db: &Database, group: ProjectGroupRow, members: &[ProjectRow]) -> GroupResponse {
    GroupResponse {
        display_name: group_display_name(db, &group, members).await,
        id: group.id,
        name: group.name,
        git_root: group.git_root,
        created_at: group.created_at,
        updated_at: group.updated_at,
    }
}

/// Load a group by path id, answering 400 for a non-number and 404 for a miss.
async fn group_by_path(db: &Database, raw_id: &str) -> ApiResult<ProjectGroupRow> {
    let id = parse_group_id(raw_id)?;
    db.get_project_group_by_id(id)
        .await?
        .ok_or(ApiError::GroupNotFound(id))
}

/// GET /api/groups - Repository groups first, then standalone, each by name.
pub async fn list_groups(State(state): State<Arc<AppState>>) -> ApiResult<Json<GroupListResponse>> {
    let db = &state.db;
    let mut rows = db.list_project_groups().await?;
    rows.sort_by(|a, b| {
        b.git_root
            .is_some()
            .cmp(&a.git_root.is_some())
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut groups = Vec::with_capacity(rows.len());
    for row in rows {
        let members = db.get_projects_by_group_id(row.id).await?;
        groups.push(group_response(db, row, &members).await);
    }
    Ok(Json(GroupListResponse { groups }))
}

/// GET /api/groups/{id} - Group with its member projects.
pub async fn get_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<GroupDetailResponse>> {
    let db = &state.db;
    let id = parse_group_id(&id)?;
    let (group, members) = db.get_group_with_projects(id).await?;
    let group = group_response(db, group, &members).await;

    let mut projects = Vec::with_capacity(members.len());
    for project in members {
        projects.push(project_response(db, project).await);
    }
    Ok(Json(GroupDetailResponse { group, projects }))
}

/// GET /api/groups/{id}/stats
pub async fn group_stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<GroupStats>> {
    let id = parse_group_id(&id)?;
    Ok(Json(state.db.group_stats(id).await?))
}

/// GET /api/groups/{id}/timeline?period=&limit=
pub async fn group_timeline(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<TimelineQuery>,
) -> ApiResult<Json<TimeSeriesResponse>> {
    let (period, limit) = query.parse()?;
    let group = group_by_path(&state.db, &id).await?;
    let data = state.db.group_timeline(group.id, period, limit).await?;
    Ok(Json(TimeSeriesResponse { period, data }))
}

/// GET /api/groups/{id}/daily/{date} - Per-project totals for sessions touching `date`.
pub async fn group_daily(
    State(state): State<Arc<AppState>>,
    Path((id, date)): Path<(String, String)>,
) -> ApiResult<Json<GroupDailyResponse>> {
    let date = parse_date(&date)?;
    let group = group_by_path(&state.db, &id).await?;
    let projects = state.db.group_daily_project_stats(group.id, date).await?;
    Ok(Json(GroupDailyResponse { date, projects }))
}

/// Create the groups routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/groups", get(list_groups))
        .route("/groups/{id}", get(get_group))
        .route("/groups/{id}/stats", get(group_stats))
        .route("/groups/{id}/timeline", get(group_timeline))
        .route("/groups/{id}/daily/{date}", get(group_daily))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{empty_app, get, seeded_app};
    use axum::http::StatusCode;
    use pretty_assertions::assert_eq;

    async fn group_id(app: axum::Router, name: &str) -> i64 {
        let (_, json) = get(app, "/api/groups").await;
        json["groups"]
            .as_array()
            .unwrap()
            .iter()
            .find(|g| g["name"] == name)
            .and_then(|g| g["id"].as_i64())
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_groups() {
        let (app, _state, _dir) = seeded_app().await;
        let (status, json) = get(app, "/api/groups").await;
        assert_eq!(status, StatusCode::OK);

        let groups = json["groups"].as_array().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0]["name"], "-work-app");
        assert_eq!(groups[0]["displayName"], "app");
        assert!(groups[0]["gitRoot"].is_null());
        assert_eq!(groups[1]["name"], "-work-notes");
    }

    #[tokio::test]
    async fn test_rooted_groups_listed_first() {
        let (app, state, _dir) = empty_app().await;
        let db = &state.db;
        db.create_project_group("alpha", None).await.unwrap();
        db.create_project_group("zeta", Some("/src/zeta")).await.unwrap();

        let (_, json) = get(app, "/api/groups").await;
        let names: Vec<_> = json["groups"]
            .as_array()
            .unwrap()
            .iter()
            .map(|g| g["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert_eq!(json["groups"][0]["displayName"], "zeta");
        // No members and no root: falls back to the group name.
        assert_eq!(json["groups"][1]["displayName"], "alpha");
    }

    #[tokio::test]
    async fn test_group_detail() {
        let (app, _state, _dir) = seeded_app().await;
        let id = group_id(app.clone(), "-work-app").await;

        let (status, json) = get(app, &format!("/api/groups/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["id"], id);
        assert_eq!(json["name"], "-work-app");
        let projects = json["projects"].as_array().unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0]["name"], "-work-app");
        assert_eq!(projects[0]["sessionCount"], 2);
    }

    #[tokio::test]
    async fn test_group_id_validation() {
        let (app, _state, _dir) = seeded_app().await;

        let (status, json) = get(app.clone(), "/api/groups/abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Bad request");

        for uri in [
            "/api/groups/9999",
            "/api/groups/9999/stats",
            "/api/groups/9999/timeline",
            "/api/groups/9999/daily/2026-01-20",
        ] {
            let (status, json) = get(app.clone(), uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(json["error"], "Project group not found");
        }
    }

    #[tokio::test]
    async fn test_group_stats_and_timeline() {
        let (app, _state, _dir) = seeded_app().await;
        let id = group_id(app.clone(), "-work-app").await;

        let (status, json) = get(app.clone(), &format!("/api/groups/{id}/stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["totalProjects"], 1);
        assert_eq!(json["totalSessions"], 2);
        assert_eq!(json["totalInputTokens"], 1100);

        let (status, json) =
            get(app, &format!("/api/groups/{id}/timeline?period=month")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["period"], "month");
        let data = json["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["periodStart"], "2026-01-01");
        assert_eq!(data[0]["sessionCount"], 2);
    }

    #[tokio::test]
    async fn test_group_daily() {
        let (app, _state, _dir) = seeded_app().await;
        let id = group_id(app.clone(), "-work-app").await;

        let (status, json) = get(app.clone(), &format!("/api/groups/{id}/daily/2026-01-21")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["date"], "2026-01-21");
        let projects = json["projects"].as_array().unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0]["projectName"], "-work-app");
        assert_eq!(projects[0]["sessionCount"], 1);

        let (status, _) = get(app, &format!("/api/groups/{id}/daily/not-a-date")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
