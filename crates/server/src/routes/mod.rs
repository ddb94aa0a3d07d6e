//! API route handlers for the cclog server.

pub mod analyze;
pub mod debug;
pub mod groups;
pub mod health;
pub mod projects;
pub mod scan;
pub mod sessions;
pub mod stats;

use std::path::Path;
use std::sync::{Arc, OnceLock};

use axum::Router;
use cclog_db::{Period, TimeSeriesStats, DEFAULT_PERIOD_LIMIT};
use chrono::NaiveDate;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET  /api/health - Health check
/// - GET  /api/projects - Projects with session counts
/// - GET  /api/projects/{name}/stats - Project stats with branch breakdown
/// - GET  /api/projects/{name}/timeline - Project time series
/// - GET  /api/projects/{name}/daily/{date} - Sessions touching a date
/// - GET  /api/sessions - Session summaries, optionally for one project
/// - GET  /api/sessions/{project}/{id} - Session detail
/// - GET  /api/groups - Project groups
/// - GET  /api/groups/{id} - Group with member projects
/// - GET  /api/groups/{id}/stats - Group stats
/// - GET  /api/groups/{id}/timeline - Group time series
/// - GET  /api/groups/{id}/daily/{date} - Per-project breakdown for a date
/// - GET  /api/stats/total - Totals across everything
/// - GET  /api/stats/timeline - Overall time series
/// - GET  /api/stats/daily/{date} - Per-group breakdown for a date
/// - GET  /api/scan/status - Background scan progress
/// - POST /api/scan - Start a background scan
/// - POST /api/analyze - Sync all projects or the named ones
/// - GET  /api/debug/status - Store counts and scan status
/// - POST /api/debug/sync - Run a full sync and return its result
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", projects::router())
        .nest("/api", sessions::router())
        .nest("/api", groups::router())
        .nest("/api", stats::router())
        .nest("/api", scan::router())
        .nest("/api", analyze::router())
        .nest("/api", debug::router())
        .with_state(state)
}

// ============================================================================
// Shared query handling
// ============================================================================

/// `?period=&limit=` for timeline endpoints. Kept as strings so bad values
/// produce our own 400 body.
#[derive(Debug, Default, Deserialize)]
pub struct TimelineQuery {
    pub period: Option<String>,
    pub limit: Option<String>,
}

impl TimelineQuery {
    pub fn parse(&self) -> ApiResult<(Period, usize)> {
        Ok((
            parse_period(self.period.as_deref())?,
            parse_limit(self.limit.as_deref())?,
        ))
    }
}

/// Time series response shared by project, group and total timelines.
#[derive(Debug, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesResponse {
    pub period: Period,
    pub data: Vec<TimeSeriesStats>,
}

/// Missing or empty → `day`; anything but day/week/month is rejected.
pub fn parse_period(raw: Option<&str>) -> ApiResult<Period> {
    match raw {
        None | Some("") => Ok(Period::Day),
        Some(value) => value.parse().map_err(|_| {
            ApiError::BadRequest("period must be 'day', 'week', or 'month'".to_string())
        }),
    }
}

/// Missing or empty → the default; otherwise a positive integer.
pub fn parse_limit(raw: Option<&str>) -> ApiResult<usize> {
    match raw {
        None | Some("") => Ok(DEFAULT_PERIOD_LIMIT),
        Some(value) => match value.parse::<i64>() {
            Ok(limit) if limit > 0 => Ok(limit as usize),
            _ => Err(ApiError::BadRequest(
                "limit must be a positive integer".to_string(),
            )),
        },
    }
}

fn date_regex() -> Option<&'static Regex> {
    static DATE: OnceLock<Option<Regex>> = OnceLock::new();
    DATE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").ok())
        .as_ref()
}

/// A `YYYY-MM-DD` calendar date.
pub fn parse_date(raw: &str) -> ApiResult<NaiveDate> {
    let shaped = date_regex().is_some_and(|re| re.is_match(raw));
    if !shaped {
        return Err(ApiError::BadRequest(format!(
            "invalid date '{}': expected YYYY-MM-DD",
            raw
        )));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("invalid date '{}'", raw)))
}

/// Group ids arrive as path strings so a non-number is a 400 with our body.
pub fn parse_group_id(raw: &str) -> ApiResult<i64> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest("invalid group ID".to_string()))
}

/// Last path component, accepting `/` or `\` separators.
///
/// `C:\Users\me\projects\app` → `app`, `/home/me/app/` → `app`.
pub fn display_name(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    let trimmed = normalized.trim_end_matches('/');
    match Path::new(trimmed).file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => path.to_string(),
    }
}

/// Human duration: `45s`, `3m 20s`, `2h 5m`.
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Request helpers and a seeded app for route tests.

    use std::path::Path;
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        response::Response,
        Router,
    };
    use cclog_core::FileSessionSource;
    use cclog_db::Database;
    use tower::ServiceExt;

    use crate::state::AppState;

    pub async fn send(app: Router, method: Method, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        into_json(response).await
    }

    async fn into_json(response: Response) -> (StatusCode, serde_json::Value) {
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    pub async fn get(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        send(app, Method::GET, uri).await
    }

    pub async fn post(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        send(app, Method::POST, uri).await
    }

    pub async fn post_json(
        app: Router,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        into_json(app.oneshot(request).await.unwrap()).await
    }

    /// Write a two-line session (user prompt, assistant reply with usage).
    pub fn write_session(
        root: &Path,
        project: &str,
        id: &str,
        cwd: &str,
        start: &str,
        end: &str,
        input_tokens: u64,
    ) {
        let dir = root.join(project);
        std::fs::create_dir_all(&dir).unwrap();
        let user = serde_json::json!({
            "type": "user",
            "timestamp": start,
            "sessionId": id,
            "uuid": format!("{id}-u"),
            "cwd": cwd,
            "gitBranch": "main",
            "message": { "role": "user", "content": format!("please fix {id}") }
        });
        let assistant = serde_json::json!({
            "type": "assistant",
            "timestamp": end,
            "sessionId": id,
            "uuid": format!("{id}-a"),
            "cwd": cwd,
            "gitBranch": "main",
            "message": {
                "model": "claude-sonnet",
                "role": "assistant",
                "content": [
                    { "type": "text", "text": "on it" },
                    { "type": "tool_use", "id": "t1", "name": "Bash", "input": { "command": "ls" } }
                ],
                "usage": { "input_tokens": input_tokens, "output_tokens": 50 }
            }
        });
        std::fs::write(dir.join(format!("{id}.jsonl")), format!("{user}\n{assistant}\n")).unwrap();
    }

    /// An app over an empty in-memory store and a temp projects directory.
    pub async fn empty_app() -> (Router, Arc<AppState>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new_in_memory().await.unwrap();
        let state = AppState::new(db, Arc::new(FileSessionSource::new(dir.path())));
        (crate::create_app(state.clone(), true), state, dir)
    }

    /// Two projects with sessions, synced and grouped:
    /// `-work-app` (2 sessions, one crossing midnight) and `-work-notes` (1).
    pub async fn seeded_app() -> (Router, Arc<AppState>, tempfile::TempDir) {
        let (app, state, dir) = empty_app().await;
        let root = dir.path();
        write_session(
            root,
            "-work-app",
            "s1",
            "/work/app",
            "2026-01-20T10:00:00.000Z",
            "2026-01-20T10:30:00.000Z",
            100,
        );
        write_session(
            root,
            "-work-app",
            "s2",
            "/work/app",
            "2026-01-20T23:00:00.000Z",
            "2026-01-21T02:00:00.000Z",
            1000,
        );
        write_session(
            root,
            "-work-notes",
            "n1",
            "/work/notes",
            "2026-01-21T09:00:00.000Z",
            "2026-01-21T09:00:45.000Z",
            10,
        );
        let result = cclog_db::sync_all(&state.db, state.source.as_ref()).await.unwrap();
        assert_eq!(result.sessions_synced, 3);
        (app, state, dir)
    }
}
