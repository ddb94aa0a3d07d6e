// crates/server/src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cclog_core::DiscoveryError;
use cclog_db::DbError;
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

use crate::scan_manager::ScanError;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Project group not found: {0}")]
    GroupNotFound(i64),

    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Database error: {0}")]
    Database(DbError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Store misses and bad input keep their meaning at the HTTP layer.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::ProjectNotFound(name) => ApiError::ProjectNotFound(name),
            DbError::SessionNotFound(id) => ApiError::SessionNotFound(id),
            DbError::GroupNotFound(id) => ApiError::GroupNotFound(id),
            DbError::InvalidPeriod(_) | DbError::InvalidInput(_) => {
                ApiError::BadRequest(err.to_string())
            }
            DbError::Duplicate(what) => ApiError::Conflict(format!("{} already exists", what)),
            DbError::Discovery(e) => ApiError::Discovery(e),
            other => ApiError::Database(other),
        }
    }
}

impl From<ScanError> for ApiError {
    fn from(err: ScanError) -> Self {
        ApiError::Conflict(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::SessionNotFound(id) => {
                tracing::warn!(session_id = %id, "Session not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details("Session not found", format!("Session ID: {}", id)),
                )
            }
            ApiError::ProjectNotFound(name) => {
                tracing::warn!(project = %name, "Project not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details("Project not found", format!("Project: {}", name)),
                )
            }
            ApiError::GroupNotFound(id) => {
                tracing::warn!(group_id = id, "Project group not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details("Project group not found", format!("Group ID: {}", id)),
                )
            }
            ApiError::Discovery(discovery_err) => {
                let error_msg = match discovery_err {
                    DiscoveryError::ProjectsDirNotFound { path } => {
                        tracing::error!(path = %path.display(), "Projects directory not found");
                        "Claude projects directory not found"
                    }
                    DiscoveryError::PermissionDenied { path } => {
                        tracing::error!(path = %path.display(), "Permission denied accessing projects");
                        "Cannot access Claude projects directory"
                    }
                    DiscoveryError::Io { path, source } => {
                        tracing::error!(path = %path.display(), error = %source, "IO error during discovery");
                        "IO error accessing projects"
                    }
                    DiscoveryError::HomeDirNotFound => {
                        tracing::error!("Home directory not found");
                        "Home directory not found"
                    }
                    DiscoveryError::NoWorkingDirectory { project } => {
                        tracing::error!(project = %project, "No working directory recorded");
                        "No working directory recorded for project"
                    }
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_details(error_msg, discovery_err.to_string()),
                )
            }
            ApiError::Database(db_err) => {
                tracing::error!(error = %db_err, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_details("Database error", db_err.to_string()),
                )
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(message = %msg, "Bad request");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Bad request", msg.clone()),
                )
            }
            ApiError::Conflict(msg) => {
                tracing::warn!(message = %msg, "Conflict");
                (
                    StatusCode::CONFLICT,
                    ErrorResponse::with_details("Conflict", msg.clone()),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
