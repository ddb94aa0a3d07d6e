// crates/core/src/source.rs
//! Session sources: where projects and session logs come from.
//!
//! The sync engine only talks to [`SessionSource`]. [`FileSessionSource`] is
//! the on-disk implementation over `~/.claude/projects/<project>/<id>.jsonl`.

use crate::error::{DiscoveryError, ParseError};
use crate::parser::parse_session_file;
use crate::paths::claude_projects_dir;
use crate::types::Session;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Enumerates projects and sessions and parses individual sessions.
#[async_trait]
pub trait SessionSource: Send + Sync {
    /// All project identifiers currently visible.
    async fn list_projects(&self) -> Result<Vec<String>, DiscoveryError>;

    /// Session identifiers belonging to `project`.
    async fn list_sessions(&self, project: &str) -> Result<Vec<String>, DiscoveryError>;

    /// Parse one session.
    async fn parse_session(&self, project: &str, session_id: &str) -> Result<Session, ParseError>;

    /// The working directory recorded by the first session that has one.
    ///
    /// Sessions that fail to parse are skipped.
    async fn project_working_directory(&self, project: &str) -> Result<PathBuf, DiscoveryError> {
        for session_id in self.list_sessions(project).await? {
            match self.parse_session(project, &session_id).await {
                Ok(session) if !session.project_path.is_empty() => {
                    return Ok(PathBuf::from(session.project_path));
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(project, session_id = %session_id, error = %e, "Failed to parse session while resolving cwd");
                }
            }
        }
        Err(DiscoveryError::NoWorkingDirectory {
            project: project.to_string(),
        })
    }
}

/// JSONL files under a projects directory, one sub-directory per project.
#[derive(Debug, Clone)]
pub struct FileSessionSource {
    root: PathBuf,
}

impl FileSessionSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Source rooted at `~/.claude/projects`.
    pub fn open_default() -> Result<Self, DiscoveryError> {
        Ok(Self::new(claude_projects_dir()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn session_path(&self, project: &str, session_id: &str) -> PathBuf {
        self.root.join(project).join(format!("{}.jsonl", session_id))
    }
}

#[async_trait]
impl SessionSource for FileSessionSource {
    async fn list_projects(&self) -> Result<Vec<String>, DiscoveryError> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| DiscoveryError::io(&self.root, e))?;

        let mut projects = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| DiscoveryError::io(&self.root, e))?
        {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                projects.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        debug!(root = %self.root.display(), count = projects.len(), "Listed projects");
        Ok(projects)
    }

    async fn list_sessions(&self, project: &str) -> Result<Vec<String>, DiscoveryError> {
        let dir = self.root.join(project);
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| DiscoveryError::io(&dir, e))?;

        let mut sessions = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| DiscoveryError::io(&dir, e))?
        {
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(stem) = name.strip_suffix(".jsonl") {
                sessions.push(stem.to_string());
            }
        }
        Ok(sessions)
    }

    async fn parse_session(&self, project: &str, session_id: &str) -> Result<Session, ParseError> {
        parse_session_file(&self.session_path(project, session_id)).await
    }
}
