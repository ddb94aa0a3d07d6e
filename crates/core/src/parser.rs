// crates/core/src/parser.rs
//! Async JSONL parser for Claude Code session files.
//!
//! Each line of a session file is one [`LogEntry`]. The parser streams the
//! file with a tokio `BufReader`, skips lines it cannot decode, and folds the
//! remaining entries into a [`Session`] with token totals, per-model usage,
//! tool calls and an error count.

use crate::error::ParseError;
use crate::types::*;
use chrono::{DateTime, FixedOffset};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

/// Parse a session JSONL file into a [`Session`].
///
/// - The first decoded entry fixes the session id, working directory and branch.
/// - Start time is the first timestamp seen; end time is the latest.
/// - Assistant entries carrying `usage` feed both the session and per-model totals.
/// - `tool_use` blocks on those entries become [`ToolCall`]s.
/// - `tool_result` blocks with `is_error: true` on user entries count as errors.
///
/// Malformed lines are logged and skipped. If the file has no sessionId the
/// file stem is used instead.
///
/// # Errors
/// - `ParseError::NotFound` / `PermissionDenied` / `Io` for read failures
/// - `ParseError::EmptyFile` if no line carried a timestamp
pub async fn parse_session_file(file_path: &Path) -> Result<Session, ParseError> {
    let file = File::open(file_path)
        .await
        .map_err(|e| ParseError::io(file_path, e))?;

    let mut reader = BufReader::new(file);
    let mut builder = SessionBuilder::default();
    let mut buf = Vec::new();
    let mut line_number: usize = 0;

    // Lines are decoded from raw bytes so invalid UTF-8 only costs that line.
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .await
            .map_err(|e| ParseError::io(file_path, e))?;
        if read == 0 {
            break;
        }
        line_number += 1;
        let line = buf.trim_ascii();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_slice::<LogEntry>(line) {
            Ok(entry) => builder.push(entry),
            Err(e) => {
                warn!(
                    path = %file_path.display(),
                    line = line_number,
                    error = %e,
                    "Skipping malformed session line"
                );
            }
        }
    }

    let fallback_id = file_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    builder
        .finish(fallback_id)
        .ok_or_else(|| ParseError::EmptyFile {
            path: file_path.to_path_buf(),
        })
}

/// Decode an encoded project folder name: `--` becomes `/`.
///
/// Only a display hint. The real path comes from the session `cwd`.
pub fn decode_project_path(encoded_name: &str) -> String {
    encoded_name.replace("--", "/")
}

#[derive(Default)]
struct SessionBuilder {
    id: Option<String>,
    project_path: Option<String>,
    git_branch: Option<String>,
    start_time: Option<DateTime<FixedOffset>>,
    end_time: Option<DateTime<FixedOffset>>,
    entries: Vec<LogEntry>,
    total_tokens: TokenSummary,
    model_usage: BTreeMap<String, TokenSummary>,
    tool_calls: Vec<ToolCall>,
    error_count: u32,
}

impl SessionBuilder {
    fn push(&mut self, entry: LogEntry) {
        if self.id.is_none() && !entry.session_id.is_empty() {
            self.id = Some(entry.session_id.clone());
            self.project_path = Some(entry.cwd.clone());
            self.git_branch = Some(entry.git_branch.clone());
        }

        if let Some(ts) = entry.timestamp {
            if self.start_time.is_none() {
                self.start_time = Some(ts);
            }
            self.end_time = Some(match self.end_time {
                Some(end) if end > ts => end,
                _ => ts,
            });
        }

        if let Some(message) = &entry.message {
            if entry.is_assistant() {
                if let Some(usage) = &message.usage {
                    self.total_tokens.add_usage(usage);
                    let model = message.model.clone().unwrap_or_default();
                    self.model_usage.entry(model).or_default().add_usage(usage);

                    if let Some(ts) = entry.timestamp.or(self.end_time) {
                        for block in message.content.iter().filter(|c| c.content_type == "tool_use") {
                            self.tool_calls.push(ToolCall {
                                timestamp: ts,
                                name: block.name.clone().unwrap_or_default(),
                                input: block.input.clone().unwrap_or(serde_json::Value::Null),
                                is_error: false,
                                result: None,
                            });
                        }
                    }
                }
            } else if entry.is_user() {
                let errors = message
                    .content
                    .iter()
                    .filter(|c| c.content_type == "tool_result" && c.is_error)
                    .count();
                self.error_count += errors as u32;
            }
        }

        self.entries.push(entry);
    }

    fn finish(self, fallback_id: String) -> Option<Session> {
        let start_time = self.start_time?;
        let end_time = self.end_time.unwrap_or(start_time);
        Some(Session {
            id: self.id.unwrap_or(fallback_id),
            project_path: self.project_path.unwrap_or_default(),
            git_branch: self.git_branch.unwrap_or_default(),
            start_time,
            end_time,
            entries: self.entries,
            total_tokens: self.total_tokens,
            model_usage: self.model_usage,
            tool_calls: self.tool_calls,
            error_count: self.error_count,
        })
    }
}
