/// Inline SQL migrations for the cclog database schema.
///
/// One statement per entry; `Database::run_migrations` records each applied
/// index in `_migrations`. Timestamps are RFC 3339 text.

pub const MIGRATIONS: &[&str] = &[
    // Migration 1: projects
    r#"
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    decoded_path TEXT NOT NULL,
    git_root TEXT,
    last_scan_time TEXT,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);
"#,
    // Migration 2: project groups
    r#"
CREATE TABLE IF NOT EXISTS project_groups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    git_root TEXT UNIQUE,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);
"#,
    // Migration 3: project → group membership
    r#"
CREATE TABLE IF NOT EXISTS project_group_mappings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    group_id INTEGER NOT NULL REFERENCES project_groups(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    UNIQUE(project_id, group_id)
);
"#,
    // Migration 4: sessions
    r#"
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    git_branch TEXT NOT NULL DEFAULT '',
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL,
    duration_seconds INTEGER NOT NULL DEFAULT 0,
    total_input_tokens INTEGER NOT NULL DEFAULT 0,
    total_output_tokens INTEGER NOT NULL DEFAULT 0,
    total_cache_creation_tokens INTEGER NOT NULL DEFAULT 0,
    total_cache_read_tokens INTEGER NOT NULL DEFAULT 0,
    error_count INTEGER NOT NULL DEFAULT 0,
    first_user_message TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);
"#,
    // Migration 5: per-model token usage
    r#"
CREATE TABLE IF NOT EXISTS model_usage (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    model TEXT NOT NULL,
    input_tokens INTEGER NOT NULL DEFAULT 0,
    output_tokens INTEGER NOT NULL DEFAULT 0,
    cache_creation_tokens INTEGER NOT NULL DEFAULT 0,
    cache_read_tokens INTEGER NOT NULL DEFAULT 0,
    UNIQUE(session_id, model)
);
"#,
    // Migration 6: raw log entries
    r#"
CREATE TABLE IF NOT EXISTS log_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    uuid TEXT NOT NULL DEFAULT '',
    parent_uuid TEXT,
    entry_type TEXT NOT NULL,
    timestamp TEXT,
    cwd TEXT NOT NULL DEFAULT '',
    version TEXT NOT NULL DEFAULT '',
    request_id TEXT
);
"#,
    // Migration 7: message payloads of log entries
    r#"
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    log_entry_id INTEGER NOT NULL REFERENCES log_entries(id) ON DELETE CASCADE,
    model TEXT,
    role TEXT NOT NULL DEFAULT '',
    content_text TEXT NOT NULL DEFAULT '',
    content_json TEXT NOT NULL DEFAULT '[]'
);
"#,
    // Migration 8: tool calls
    r#"
CREATE TABLE IF NOT EXISTS tool_calls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    timestamp TEXT NOT NULL,
    tool_name TEXT NOT NULL,
    input_json TEXT NOT NULL DEFAULT 'null',
    is_error INTEGER NOT NULL DEFAULT 0,
    result_text TEXT
);
"#,
    // Migration 9+: indexes
    r#"CREATE INDEX IF NOT EXISTS idx_sessions_project ON sessions(project_id);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_sessions_start_time ON sessions(start_time DESC);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_log_entries_session ON log_entries(session_id);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_messages_log_entry ON messages(log_entry_id);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_tool_calls_session ON tool_calls(session_id);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_group_mappings_group ON project_group_mappings(group_id);"#,
];
