// crates/db/src/queries/mod.rs
// Row types and `impl Database` query blocks for the cclog SQLite store.

mod groups;
mod projects;
mod sessions;
mod stats;

pub use sessions::first_user_message;
pub use stats::{BranchStats, DailyGroupStats, DailyProjectStats, GroupStats, ProjectStats, TotalStats};

use crate::period::SessionSpan;
use crate::timestamps::decode_timestamp;
use cclog_core::TokenSummary;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use sqlx::Row;
use ts_rs::TS;

// ============================================================================
// Projects
// ============================================================================

/// A stored project: one directory under the projects root.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct ProjectRow {
    #[ts(type = "number")]
    pub id: i64,
    pub name: String,
    pub decoded_path: String,
    pub git_root: Option<String>,
    #[ts(type = "string | null")]
    pub last_scan_time: Option<DateTime<FixedOffset>>,
    #[ts(type = "string")]
    pub created_at: DateTime<FixedOffset>,
    #[ts(type = "string")]
    pub updated_at: DateTime<FixedOffset>,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for ProjectRow {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        let last_scan_time: Option<String> = row.try_get("last_scan_time")?;
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            decoded_path: row.try_get("decoded_path")?,
            git_root: row.try_get("git_root")?,
            last_scan_time: last_scan_time.as_deref().map(decode_timestamp).transpose()?,
            created_at: decode_timestamp(row.try_get("created_at")?)?,
            updated_at: decode_timestamp(row.try_get("updated_at")?)?,
        })
    }
}

// ============================================================================
// Project groups
// ============================================================================

/// A logical repository grouping of projects.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct ProjectGroupRow {
    #[ts(type = "number")]
    pub id: i64,
    pub name: String,
    pub git_root: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<FixedOffset>,
    #[ts(type = "string")]
    pub updated_at: DateTime<FixedOffset>,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for ProjectGroupRow {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            git_root: row.try_get("git_root")?,
            created_at: decode_timestamp(row.try_get("created_at")?)?,
            updated_at: decode_timestamp(row.try_get("updated_at")?)?,
        })
    }
}

// ============================================================================
// Sessions
// ============================================================================

/// Summary row of a stored session (no entries or tool calls).
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct SessionRow {
    pub id: String,
    #[ts(type = "number")]
    pub project_id: i64,
    pub git_branch: String,
    #[ts(type = "string")]
    pub start_time: DateTime<FixedOffset>,
    #[ts(type = "string")]
    pub end_time: DateTime<FixedOffset>,
    #[ts(type = "number")]
    pub duration_seconds: i64,
    #[ts(type = "number")]
    pub total_input_tokens: i64,
    #[ts(type = "number")]
    pub total_output_tokens: i64,
    #[ts(type = "number")]
    pub total_cache_creation_tokens: i64,
    #[ts(type = "number")]
    pub total_cache_read_tokens: i64,
    #[ts(type = "number")]
    pub error_count: i64,
    pub first_user_message: String,
    #[ts(type = "string")]
    pub created_at: DateTime<FixedOffset>,
    #[ts(type = "string")]
    pub updated_at: DateTime<FixedOffset>,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for SessionRow {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            project_id: row.try_get("project_id")?,
            git_branch: row.try_get("git_branch")?,
            start_time: decode_timestamp(row.try_get("start_time")?)?,
            end_time: decode_timestamp(row.try_get("end_time")?)?,
            duration_seconds: row.try_get("duration_seconds")?,
            total_input_tokens: row.try_get("total_input_tokens")?,
            total_output_tokens: row.try_get("total_output_tokens")?,
            total_cache_creation_tokens: row.try_get("total_cache_creation_tokens")?,
            total_cache_read_tokens: row.try_get("total_cache_read_tokens")?,
            error_count: row.try_get("error_count")?,
            first_user_message: row.try_get("first_user_message")?,
            created_at: decode_timestamp(row.try_get("created_at")?)?,
            updated_at: decode_timestamp(row.try_get("updated_at")?)?,
        })
    }
}

impl SessionRow {
    pub fn tokens(&self) -> TokenSummary {
        TokenSummary {
            input_tokens: self.total_input_tokens.max(0) as u64,
            output_tokens: self.total_output_tokens.max(0) as u64,
            cache_creation_input_tokens: self.total_cache_creation_tokens.max(0) as u64,
            cache_read_input_tokens: self.total_cache_read_tokens.max(0) as u64,
        }
    }

    pub fn span(&self) -> SessionSpan {
        SessionSpan {
            id: self.id.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            tokens: self.tokens(),
        }
    }
}

/// Column list matching [`SessionRow`]'s `FromRow`, for `sessions s`.
pub(crate) const SESSION_COLUMNS: &str = "s.id, s.project_id, s.git_branch, s.start_time, s.end_time, \
     s.duration_seconds, s.total_input_tokens, s.total_output_tokens, \
     s.total_cache_creation_tokens, s.total_cache_read_tokens, s.error_count, \
     s.first_user_message, s.created_at, s.updated_at";

pub(crate) fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
