//! Centralized path functions for all app storage locations.

use crate::error::DiscoveryError;
use std::path::PathBuf;

/// App cache root: `~/Library/Caches/cclog/` (macOS) or `~/.cache/cclog/` (Linux).
pub fn app_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join("cclog"))
}

/// SQLite database file: `<app_cache_dir>/cclog.db`.
pub fn db_path() -> Option<PathBuf> {
    app_cache_dir().map(|d| d.join("cclog.db"))
}

/// Returns the path to the Claude projects directory (~/.claude/projects).
///
/// # Errors
/// Returns `DiscoveryError::HomeDirNotFound` if the home directory cannot be determined.
pub fn claude_projects_dir() -> Result<PathBuf, DiscoveryError> {
    let home = dirs::home_dir().ok_or(DiscoveryError::HomeDirNotFound)?;
    Ok(home.join(".claude").join("projects"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_path_under_cache_dir() {
        if let Some(path) = db_path() {
            assert!(path.ends_with("cclog/cclog.db"));
        }
    }

    #[test]
    fn test_claude_projects_dir_suffix() {
        if let Ok(path) = claude_projects_dir() {
            assert!(path.ends_with(".claude/projects"));
        }
    }
}
