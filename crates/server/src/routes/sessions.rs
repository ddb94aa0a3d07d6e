// crates/server/src/routes/sessions.rs
//! Session list and session detail endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use cclog_core::{Content, Session, TokenSummary};
use cclog_db::SessionRow;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::format_duration;
use super::projects::project_by_name;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Upper bound on rows returned by the session list.
const SESSION_LIST_LIMIT: i64 = 1000;

#[derive(Debug, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub project_name: String,
    pub git_branch: String,
    #[ts(type = "string")]
    pub start_time: DateTime<FixedOffset>,
    #[ts(type = "string")]
    pub end_time: DateTime<FixedOffset>,
    #[ts(type = "number")]
    pub duration_seconds: i64,
    /// Input plus output tokens.
    #[ts(type = "number")]
    pub total_tokens: i64,
    #[ts(type = "number")]
    pub error_count: i64,
    pub first_user_message: String,
}

impl SessionSummary {
    pub fn from_row(row: SessionRow, project_name: &str) -> Self {
        Self {
            total_tokens: row.total_input_tokens + row.total_output_tokens,
            id: row.id,
            project_name: project_name.to_string(),
            git_branch: row.git_branch,
            start_time: row.start_time,
            end_time: row.end_time,
            duration_seconds: row.duration_seconds,
            error_count: row.error_count,
            first_user_message: row.first_user_message,
        }
    }
}

#[derive(Debug, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct TokenSummaryResponse {
    #[ts(type = "number")]
    pub input_tokens: u64,
    #[ts(type = "number")]
    pub output_tokens: u64,
    #[ts(type = "number")]
    pub cache_creation_input_tokens: u64,
    #[ts(type = "number")]
    pub cache_read_input_tokens: u64,
    #[ts(type = "number")]
    pub total_tokens: u64,
}

impl From<&TokenSummary> for TokenSummaryResponse {
    fn from(tokens: &TokenSummary) -> Self {
        Self {
            input_tokens: tokens.input_tokens,
            output_tokens: tokens.output_tokens,
            cache_creation_input_tokens: tokens.cache_creation_input_tokens,
            cache_read_input_tokens: tokens.cache_read_input_tokens,
            total_tokens: tokens.total(),
        }
    }
}

#[derive(Debug, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
pub struct ModelUsageResponse {
    pub model: String,
    pub tokens: TokenSummaryResponse,
}

#[derive(Debug, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResponse {
    #[ts(type = "string")]
    pub timestamp: DateTime<FixedOffset>,
    pub name: String,
    #[ts(type = "unknown")]
    pub input: serde_json::Value,
    pub is_error: bool,
    pub result: Option<String>,
}

#[derive(Debug, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    #[serde(rename = "type")]
    pub message_type: String,
    #[ts(type = "string | null")]
    pub timestamp: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[ts(type = "unknown[]")]
    pub content: Vec<Content>,
}

#[derive(Debug, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct SessionDetailResponse {
    pub id: String,
    pub project_name: String,
    pub project_path: String,
    pub git_branch: String,
    #[ts(type = "string")]
    pub start_time: DateTime<FixedOffset>,
    #[ts(type = "string")]
    pub end_time: DateTime<FixedOffset>,
    /// Human readable, e.g. `3m 20s`.
    pub duration: String,
    #[ts(type = "number")]
    pub duration_seconds: i64,
    pub total_tokens: TokenSummaryResponse,
    pub model_usage: Vec<ModelUsageResponse>,
    pub tool_calls: Vec<ToolCallResponse>,
    pub messages: Vec<MessageResponse>,
    pub error_count: u32,
}

impl SessionDetailResponse {
    fn new(session: Session, project_name: &str) -> Self {
        let model_usage = session
            .model_usage
            .iter()
            .map(|(model, tokens)| ModelUsageResponse {
                model: model.clone(),
                tokens: tokens.into(),
            })
            .collect();

        let tool_calls = session
            .tool_calls
            .iter()
            .map(|call| ToolCallResponse {
                timestamp: call.timestamp,
                name: call.name.clone(),
                input: call.input.clone(),
                is_error: call.is_error,
                result: call.result.clone(),
            })
            .collect();

        // Conversation only: user and assistant turns.
        let messages = session
            .entries
            .iter()
            .filter(|entry| entry.is_user() || entry.is_assistant())
            .map(|entry| MessageResponse {
                message_type: entry.entry_type.clone(),
                timestamp: entry.timestamp,
                model: entry.message.as_ref().and_then(|m| m.model.clone()),
                content: entry
                    .message
                    .as_ref()
                    .map(|m| m.content.clone())
                    .unwrap_or_default(),
            })
            .collect();

        let duration_seconds = session.duration_seconds();
        Self {
            duration: format_duration(duration_seconds),
            duration_seconds,
            total_tokens: (&session.total_tokens).into(),
            model_usage,
            tool_calls,
            messages,
            error_count: session.error_count,
            project_name: project_name.to_string(),
            project_path: session.project_path,
            git_branch: session.git_branch,
            start_time: session.start_time,
            end_time: session.end_time,
            id: session.id,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionsListQuery {
    pub project: Option<String>,
}

/// GET /api/sessions?project= - Most recent sessions first.
///
/// An unknown project yields an empty list rather than 404.
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionsListQuery>,
) -> ApiResult<Json<SessionListResponse>> {
    let db = &state.db;
    let names: HashMap<i64, String> = db
        .list_projects()
        .await?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();

    let project_id = match query.project.as_deref().filter(|p| !p.is_empty()) {
        Some(name) => match names.iter().find(|(_, n)| n.as_str() == name) {
            Some((id, _)) => Some(*id),
            None => {
                tracing::warn!(project = %name, "Project not found in database");
                return Ok(Json(SessionListResponse { sessions: Vec::new() }));
            }
        },
        None => None,
    };

    let rows = db.list_sessions(project_id, SESSION_LIST_LIMIT, 0).await?;
    let sessions = rows
        .into_iter()
        .filter_map(|row| {
            let name = names.get(&row.project_id)?.clone();
            Some(SessionSummary::from_row(row, &name))
        })
        .collect();
    Ok(Json(SessionListResponse { sessions }))
}

/// GET /api/sessions/{project}/{id} - Full session rebuilt from the store.
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path((project_name, session_id)): Path<(String, String)>,
) -> ApiResult<Json<SessionDetailResponse>> {
    let project = project_by_name(&state.db, &project_name).await?;
    let row = state
        .db
        .get_session_row(&session_id)
        .await?
        .filter(|row| row.project_id == project.id)
        .ok_or_else(|| ApiError::SessionNotFound(session_id.clone()))?;

    let session = state.db.get_session(&row.id).await?;
    Ok(Json(SessionDetailResponse::new(session, &project.name)))
}

/// Create the sessions routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", get(list_sessions))
        .route("/sessions/{project}/{id}", get(get_session))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{get, seeded_app};
    use axum::http::StatusCode;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_list_all_sessions_most_recent_first() {
        let (app, _state, _dir) = seeded_app().await;
        let (status, json) = get(app, "/api/sessions").await;
        assert_eq!(status, StatusCode::OK);

        let ids: Vec<_> = json["sessions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["n1", "s2", "s1"]);
        assert_eq!(json["sessions"][0]["projectName"], "-work-notes");
        assert_eq!(json["sessions"][1]["totalTokens"], 1050);
        assert_eq!(json["sessions"][1]["firstUserMessage"], "please fix s2");
    }

    #[tokio::test]
    async fn test_list_sessions_for_project() {
        let (app, _state, _dir) = seeded_app().await;
        let (_, json) = get(app.clone(), "/api/sessions?project=-work-app").await;
        assert_eq!(json["sessions"].as_array().unwrap().len(), 2);

        let (status, json) = get(app, "/api/sessions?project=-missing").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["sessions"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_session_detail() {
        let (app, _state, _dir) = seeded_app().await;
        let (status, json) = get(app, "/api/sessions/-work-app/s2").await;
        assert_eq!(status, StatusCode::OK);

        assert_eq!(json["id"], "s2");
        assert_eq!(json["projectName"], "-work-app");
        assert_eq!(json["duration"], "3h 0m");
        assert_eq!(json["durationSeconds"], 3 * 3600);
        assert_eq!(json["totalTokens"]["inputTokens"], 1000);
        assert_eq!(json["totalTokens"]["totalTokens"], 1050);
        assert_eq!(json["modelUsage"][0]["model"], "claude-sonnet");
        assert_eq!(json["toolCalls"][0]["name"], "Bash");
        assert_eq!(json["toolCalls"][0]["input"]["command"], "ls");

        let messages = json["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["type"], "user");
        assert_eq!(messages[1]["type"], "assistant");
        assert_eq!(messages[1]["model"], "claude-sonnet");
    }

    #[tokio::test]
    async fn test_session_detail_not_found() {
        let (app, _state, _dir) = seeded_app().await;

        let (status, json) = get(app.clone(), "/api/sessions/-work-app/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Session not found");

        // Exists, but under another project.
        let (status, _) = get(app.clone(), "/api/sessions/-work-notes/s1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, json) = get(app, "/api/sessions/-nope/s1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Project not found");
    }
}
