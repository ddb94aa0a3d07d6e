// crates/server/src/config.rs
//! Server configuration, read once from the environment at startup.
//!
//! Bad values never abort startup: they fall back to defaults, and the
//! watcher timings are clamped into range.

use std::path::PathBuf;
use std::time::Duration;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;

const DEFAULT_WATCH_INTERVAL_SECS: u64 = 15;
const MIN_WATCH_INTERVAL_SECS: u64 = 5;
const MAX_WATCH_INTERVAL_SECS: u64 = 3600;

const DEFAULT_WATCH_DEBOUNCE_SECS: u64 = 5;
const MIN_WATCH_DEBOUNCE_SECS: u64 = 1;
const MAX_WATCH_DEBOUNCE_SECS: u64 = 60;

/// File watcher settings (`ENABLE_FILE_WATCH`, `FILE_WATCH_INTERVAL`,
/// `FILE_WATCH_DEBOUNCE`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherConfig {
    pub enabled: bool,
    pub interval: Duration,
    pub debounce: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: Duration::from_secs(DEFAULT_WATCH_INTERVAL_SECS),
            debounce: Duration::from_secs(DEFAULT_WATCH_DEBOUNCE_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Root of the JSONL session tree. `None` when the home directory is unknown.
    pub projects_dir: Option<PathBuf>,
    /// SQLite file. `None` means the default cache location.
    pub db_path: Option<PathBuf>,
    pub skip_initial_sync: bool,
    pub disable_cors: bool,
    pub watcher: WatcherConfig,
}

impl ServerConfig {
    /// Read the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key → value lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup("PORT")
            .and_then(|p| p.trim().parse::<u16>().ok())
            .filter(|p| *p != 0)
            .unwrap_or(DEFAULT_PORT);

        let projects_dir = non_empty(lookup("CLAUDE_PROJECTS_DIR"))
            .map(PathBuf::from)
            .or_else(|| cclog_core::paths::claude_projects_dir().ok());

        Self {
            port,
            projects_dir,
            db_path: non_empty(lookup("DB_PATH")).map(PathBuf::from),
            skip_initial_sync: is_true(lookup("SKIP_INITIAL_SYNC")),
            disable_cors: is_true(lookup("DISABLE_CORS")),
            watcher: WatcherConfig {
                enabled: is_true(lookup("ENABLE_FILE_WATCH")),
                interval: Duration::from_secs(clamped_secs(
                    lookup("FILE_WATCH_INTERVAL"),
                    DEFAULT_WATCH_INTERVAL_SECS,
                    MIN_WATCH_INTERVAL_SECS,
                    MAX_WATCH_INTERVAL_SECS,
                )),
                debounce: Duration::from_secs(clamped_secs(
                    lookup("FILE_WATCH_DEBOUNCE"),
                    DEFAULT_WATCH_DEBOUNCE_SECS,
                    MIN_WATCH_DEBOUNCE_SECS,
                    MAX_WATCH_DEBOUNCE_SECS,
                )),
            },
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn is_true(value: Option<String>) -> bool {
    value.as_deref() == Some("true")
}

/// Whole seconds: unset, unparseable or negative → `default`; else clamp.
fn clamped_secs(value: Option<String>, default: u64, min: u64, max: u64) -> u64 {
    let Some(raw) = value else {
        return default;
    };
    match raw.trim().parse::<i64>() {
        Ok(secs) if secs >= 0 => (secs as u64).clamp(min, max),
        _ => default,
    }
}
