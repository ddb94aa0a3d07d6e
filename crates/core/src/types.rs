// crates/core/src/types.rs
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Token usage reported on a single assistant message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_creation_input_tokens: u64,
    #[serde(default)]
    pub cache_read_input_tokens: u64,
}

/// Aggregated token counters. Additive, never negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSummary {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_creation_input_tokens: u64,
    pub cache_read_input_tokens: u64,
}

impl TokenSummary {
    pub fn add_usage(&mut self, usage: &Usage) {
        self.input_tokens += usage.input_tokens;
        self.output_tokens += usage.output_tokens;
        self.cache_creation_input_tokens += usage.cache_creation_input_tokens;
        self.cache_read_input_tokens += usage.cache_read_input_tokens;
    }

    pub fn merge(&mut self, other: &TokenSummary) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cache_creation_input_tokens += other.cache_creation_input_tokens;
        self.cache_read_input_tokens += other.cache_read_input_tokens;
    }

    /// Input + output. Cache counters are reported separately.
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    /// All four counters summed.
    pub fn grand_total(&self) -> u64 {
        self.total() + self.cache_creation_input_tokens + self.cache_read_input_tokens
    }
}

/// One content block of a message (text, tool_use, tool_result, thinking, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use_id: Option<String>,
    /// tool_result payload; either a string or an array of blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content_type: "text".to_string(),
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn is_text(&self) -> bool {
        self.content_type == "text"
    }
}

/// The `message` payload of a user or assistant entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub role: String,
    #[serde(default, deserialize_with = "deserialize_content")]
    pub content: Vec<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl Message {
    /// Text blocks joined with newlines; empty blocks are ignored.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|c| c.is_text())
            .filter_map(|c| c.text.as_deref())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// User messages are sometimes a bare string instead of a block array.
fn deserialize_content<'de, D>(deserializer: D) -> Result<Vec<Content>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawContent {
        Text(String),
        Blocks(Vec<Content>),
    }

    Ok(match Option::<RawContent>::deserialize(deserializer)? {
        Some(RawContent::Text(text)) => vec![Content::text(text)],
        Some(RawContent::Blocks(blocks)) => blocks,
        None => Vec::new(),
    })
}

/// A single line of a session JSONL file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    #[serde(rename = "type")]
    pub entry_type: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub parent_uuid: Option<String>,
    #[serde(default)]
    pub cwd: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub git_branch: String,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub request_id: Option<String>,
}

impl LogEntry {
    pub fn is_user(&self) -> bool {
        self.entry_type == "user"
    }

    pub fn is_assistant(&self) -> bool {
        self.entry_type == "assistant"
    }
}

/// A single tool invocation extracted from an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub timestamp: DateTime<FixedOffset>,
    pub name: String,
    pub input: serde_json::Value,
    pub is_error: bool,
    pub result: Option<String>,
}

/// A fully parsed session with aggregated data.
///
/// `end_time >= start_time` always holds, and `total_tokens` equals the sum
/// of every `model_usage` value.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: String,
    pub project_path: String,
    pub git_branch: String,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    pub entries: Vec<LogEntry>,
    pub total_tokens: TokenSummary,
    pub model_usage: BTreeMap<String, TokenSummary>,
    pub tool_calls: Vec<ToolCall>,
    pub error_count: u32,
}

impl Session {
    pub fn duration_seconds(&self) -> i64 {
        (self.end_time - self.start_time).num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_summary_add_and_total() {
        let mut summary = TokenSummary::default();
        summary.add_usage(&Usage {
            input_tokens: 10,
            output_tokens: 5,
            cache_creation_input_tokens: 100,
            cache_read_input_tokens: 1000,
        });
        summary.add_usage(&Usage {
            input_tokens: 1,
            ..Default::default()
        });

        assert_eq!(summary.input_tokens, 11);
        assert_eq!(summary.total(), 16);
        assert_eq!(summary.grand_total(), 1116);
    }

    #[test]
    fn test_message_content_accepts_plain_string() {
        let msg: Message =
            serde_json::from_str(r#"{"role":"user","content":"hello there"}"#).unwrap();
        assert_eq!(msg.content.len(), 1);
        assert_eq!(msg.text(), "hello there");
    }

    #[test]
    fn test_message_text_joins_text_blocks_only() {
        let msg: Message = serde_json::from_str(
            r#"{"role":"assistant","content":[
                {"type":"text","text":"first"},
                {"type":"tool_use","id":"t1","name":"Read","input":{"path":"a"}},
                {"type":"text","text":"second"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(msg.text(), "first\nsecond");
    }

    #[test]
    fn test_log_entry_camel_case_fields() {
        let entry: LogEntry = serde_json::from_str(
            r#"{"type":"user","timestamp":"2026-01-20T23:00:00.000Z","sessionId":"s1",
                "uuid":"u1","parentUuid":null,"cwd":"/work/app","version":"1.0.0",
                "gitBranch":"main","requestId":"req_1"}"#,
        )
        .unwrap();
        assert!(entry.is_user());
        assert_eq!(entry.session_id, "s1");
        assert_eq!(entry.git_branch, "main");
        assert_eq!(entry.request_id.as_deref(), Some("req_1"));
        assert!(entry.parent_uuid.is_none());
        assert!(entry.timestamp.is_some());
    }

    #[test]
    fn test_content_serialization_skips_empty_fields() {
        let json = serde_json::to_string(&Content::text("hi")).unwrap();
        assert_eq!(json, r#"{"type":"text","text":"hi"}"#);
    }
}
