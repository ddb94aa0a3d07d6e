// crates/db/src/queries/sessions.rs
// Session writes (one transaction per session) and read-back.

use super::{to_i64, SessionRow, SESSION_COLUMNS};
use crate::timestamps::{decode_timestamp, format_timestamp};
use crate::{Database, DbError, DbResult};
use cclog_core::{Content, LogEntry, Message, Session, TokenSummary, ToolCall};
use sqlx::Row;
use std::collections::BTreeMap;
use tracing::debug;

/// Longest `first_user_message`, in characters.
pub const FIRST_MESSAGE_MAX_CHARS: usize = 100;

/// Warm-up prompt some clients send before the real first message.
const WARMUP_MESSAGE: &str = "Warmup";

/// Text of the text blocks, newline-joined. Empty blocks are skipped.
fn content_text(content: &[Content]) -> String {
    content
        .iter()
        .filter(|c| c.is_text())
        .filter_map(|c| c.text.as_deref())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Summary line shown in session lists.
///
/// The first user text, unless it is the warm-up prompt: then the second
/// user text, falling back to the first assistant text.
pub fn first_user_message(session: &Session) -> String {
    let mut user_texts: Vec<String> = Vec::with_capacity(2);
    let mut assistant_text: Option<String> = None;

    for entry in &session.entries {
        let Some(message) = &entry.message else {
            continue;
        };
        if entry.is_user() && user_texts.len() < 2 {
            user_texts.push(content_text(&message.content));
        } else if entry.is_assistant() && assistant_text.is_none() {
            assistant_text = Some(content_text(&message.content));
        }
        if user_texts.len() >= 2 && assistant_text.is_some() {
            break;
        }
    }

    let first = user_texts.first().cloned().unwrap_or_default();
    let chosen = if first == WARMUP_MESSAGE {
        match (user_texts.get(1), assistant_text.as_ref()) {
            (Some(second), _) if !second.is_empty() => second.clone(),
            (_, Some(assistant)) if !assistant.is_empty() => assistant.clone(),
            _ => first,
        }
    } else {
        first
    };
    truncate_chars(&chosen, FIRST_MESSAGE_MAX_CHARS)
}

impl Database {
    /// Persist a parsed session and everything hanging off it in one transaction.
    ///
    /// A session id that already exists yields [`DbError::Duplicate`]; an
    /// unknown project yields [`DbError::ProjectNotFound`]. Nothing is written
    /// in either case.
    pub async fn create_session(&self, session: &Session, project_name: &str) -> DbResult<()> {
        let project_id: i64 = sqlx::query_scalar("SELECT id FROM projects WHERE name = ?1")
            .bind(project_name)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DbError::ProjectNotFound(project_name.to_string()))?;

        // First statement is a write so the busy timeout covers lock waits.
        let mut tx = self.pool().begin().await?;
        let totals = &session.total_tokens;
        sqlx::query(
            r#"
            INSERT INTO sessions (
                id, project_id, git_branch, start_time, end_time, duration_seconds,
                total_input_tokens, total_output_tokens,
                total_cache_creation_tokens, total_cache_read_tokens,
                error_count, first_user_message
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&session.id)
        .bind(project_id)
        .bind(&session.git_branch)
        .bind(format_timestamp(&session.start_time))
        .bind(format_timestamp(&session.end_time))
        .bind(session.duration_seconds())
        .bind(to_i64(totals.input_tokens))
        .bind(to_i64(totals.output_tokens))
        .bind(to_i64(totals.cache_creation_input_tokens))
        .bind(to_i64(totals.cache_read_input_tokens))
        .bind(session.error_count as i64)
        .bind(first_user_message(session))
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::from_insert(e, || format!("session {}", session.id)))?;

        for (model, tokens) in &session.model_usage {
            sqlx::query(
                r#"
                INSERT INTO model_usage (
                    session_id, model, input_tokens, output_tokens,
                    cache_creation_tokens, cache_read_tokens
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&session.id)
            .bind(model)
            .bind(to_i64(tokens.input_tokens))
            .bind(to_i64(tokens.output_tokens))
            .bind(to_i64(tokens.cache_creation_input_tokens))
            .bind(to_i64(tokens.cache_read_input_tokens))
            .execute(&mut *tx)
            .await?;
        }

        for entry in &session.entries {
            let result = sqlx::query(
                r#"
                INSERT INTO log_entries (
                    session_id, uuid, parent_uuid, entry_type, timestamp,
                    cwd, version, request_id
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&session.id)
            .bind(&entry.uuid)
            .bind(entry.parent_uuid.as_deref())
            .bind(&entry.entry_type)
            .bind(entry.timestamp.as_ref().map(format_timestamp))
            .bind(&entry.cwd)
            .bind(&entry.version)
            .bind(entry.request_id.as_deref())
            .execute(&mut *tx)
            .await?;

            if let Some(message) = &entry.message {
                sqlx::query(
                    r#"
                    INSERT INTO messages (log_entry_id, model, role, content_text, content_json)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                )
                .bind(result.last_insert_rowid())
                .bind(message.model.as_deref())
                .bind(&message.role)
                .bind(content_text(&message.content))
                .bind(serde_json::to_string(&message.content)?)
                .execute(&mut *tx)
                .await?;
            }
        }

        for call in &session.tool_calls {
            sqlx::query(
                r#"
                INSERT INTO tool_calls (session_id, timestamp, tool_name, input_json, is_error, result_text)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&session.id)
            .bind(format_timestamp(&call.timestamp))
            .bind(&call.name)
            .bind(serde_json::to_string(&call.input)?)
            .bind(call.is_error)
            .bind(call.result.as_deref())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(
            session_id = %session.id,
            project = project_name,
            entries = session.entries.len(),
            tool_calls = session.tool_calls.len(),
            "Stored session"
        );
        Ok(())
    }

    pub async fn session_exists(&self, id: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE id = ?1")
            .bind(id)
            .fetch_one(self.pool())
            .await?;
        Ok(count > 0)
    }

    pub async fn get_session_row(&self, id: &str) -> DbResult<Option<SessionRow>> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions s WHERE s.id = ?1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    /// Rebuild the full session: totals, per-model usage, entries with
    /// their messages, and tool calls.
    ///
    /// `project_path` is the first recorded cwd; the project's decoded
    /// folder name only stands in when no entry has one.
    pub async fn get_session(&self, id: &str) -> DbResult<Session> {
        let row = sqlx::query(
            r#"
            SELECT s.id, s.git_branch, s.start_time, s.end_time,
                   COALESCE(
                       (SELECT le.cwd FROM log_entries le
                        WHERE le.session_id = s.id AND le.cwd <> ''
                        ORDER BY le.id LIMIT 1),
                       p.decoded_path
                   ) AS project_path,
                   s.total_input_tokens, s.total_output_tokens,
                   s.total_cache_creation_tokens, s.total_cache_read_tokens,
                   s.error_count
            FROM sessions s
            JOIN projects p ON s.project_id = p.id
            WHERE s.id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DbError::SessionNotFound(id.to_string()))?;

        let git_branch: String = row.try_get("git_branch")?;
        let mut session = Session {
            id: row.try_get("id")?,
            project_path: row.try_get("project_path")?,
            git_branch: git_branch.clone(),
            start_time: decode_timestamp(row.try_get("start_time")?)?,
            end_time: decode_timestamp(row.try_get("end_time")?)?,
            entries: Vec::new(),
            total_tokens: TokenSummary {
                input_tokens: row.try_get::<i64, _>("total_input_tokens")?.max(0) as u64,
                output_tokens: row.try_get::<i64, _>("total_output_tokens")?.max(0) as u64,
                cache_creation_input_tokens: row
                    .try_get::<i64, _>("total_cache_creation_tokens")?
                    .max(0) as u64,
                cache_read_input_tokens: row.try_get::<i64, _>("total_cache_read_tokens")?.max(0)
                    as u64,
            },
            model_usage: BTreeMap::new(),
            tool_calls: Vec::new(),
            error_count: row.try_get::<i64, _>("error_count")?.max(0) as u32,
        };

        let usage_rows: Vec<(String, i64, i64, i64, i64)> = sqlx::query_as(
            r#"
            SELECT model, input_tokens, output_tokens, cache_creation_tokens, cache_read_tokens
            FROM model_usage WHERE session_id = ?1
            "#,
        )
        .bind(id)
        .fetch_all(self.pool())
        .await?;
        for (model, input, output, cache_creation, cache_read) in usage_rows {
            session.model_usage.insert(
                model,
                TokenSummary {
                    input_tokens: input.max(0) as u64,
                    output_tokens: output.max(0) as u64,
                    cache_creation_input_tokens: cache_creation.max(0) as u64,
                    cache_read_input_tokens: cache_read.max(0) as u64,
                },
            );
        }

        let entry_rows = sqlx::query(
            r#"
            SELECT le.uuid, le.parent_uuid, le.entry_type, le.timestamp,
                   le.cwd, le.version, le.request_id,
                   m.model, m.role, m.content_json
            FROM log_entries le
            LEFT JOIN messages m ON m.log_entry_id = le.id
            WHERE le.session_id = ?1
            ORDER BY le.id
            "#,
        )
        .bind(id)
        .fetch_all(self.pool())
        .await?;
        for row in entry_rows {
            let timestamp: Option<String> = row.try_get("timestamp")?;
            let content_json: Option<String> = row.try_get("content_json")?;
            let message = match content_json {
                Some(json) => Some(Message {
                    model: row.try_get("model")?,
                    id: None,
                    role: row.try_get::<Option<String>, _>("role")?.unwrap_or_default(),
                    content: serde_json::from_str(&json)?,
                    usage: None,
                }),
                None => None,
            };
            session.entries.push(LogEntry {
                entry_type: row.try_get("entry_type")?,
                timestamp: timestamp.as_deref().map(decode_timestamp).transpose()?,
                session_id: id.to_string(),
                uuid: row.try_get("uuid")?,
                parent_uuid: row.try_get("parent_uuid")?,
                cwd: row.try_get("cwd")?,
                version: row.try_get("version")?,
                git_branch: git_branch.clone(),
                message,
                request_id: row.try_get("request_id")?,
            });
        }

        let tool_rows = sqlx::query(
            r#"
            SELECT timestamp, tool_name, input_json, is_error, result_text
            FROM tool_calls WHERE session_id = ?1
            ORDER BY id
            "#,
        )
        .bind(id)
        .fetch_all(self.pool())
        .await?;
        for row in tool_rows {
            let input_json: String = row.try_get("input_json")?;
            session.tool_calls.push(ToolCall {
                timestamp: decode_timestamp(row.try_get("timestamp")?)?,
                name: row.try_get("tool_name")?,
                input: serde_json::from_str(&input_json)?,
                is_error: row.try_get::<i64, _>("is_error")? != 0,
                result: row.try_get("result_text")?,
            });
        }

        Ok(session)
    }

    /// Session summaries, most recent start first.
    pub async fn list_sessions(
        &self,
        project_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<SessionRow>> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM sessions s
            WHERE (?1 IS NULL OR s.project_id = ?1)
            ORDER BY julianday(s.start_time) DESC, s.id
            LIMIT ?2 OFFSET ?3
            "#
        ))
        .bind(project_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Number of sessions, for one project or overall.
    pub async fn count_sessions(&self, project_id: Option<i64>) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE (?1 IS NULL OR project_id = ?1)")
                .bind(project_id)
                .fetch_one(self.pool())
                .await?;
        Ok(count)
    }
}
