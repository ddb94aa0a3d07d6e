// crates/db/src/sync.rs
//! Synchronization engine: brings the store up to date with a session source.
//!
//! Every session id is created at most once. The existence pre-check is only
//! a fast path; the store's uniqueness constraint is what makes repeated or
//! concurrent passes safe, so a `Duplicate` on create counts as a skip.

use crate::grouping::sync_project_groups;
use crate::store::SessionStore;
use crate::{DbError, DbResult, ProjectRow};
use cclog_core::{decode_project_path, detect_git_root, SessionSource};
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use ts_rs::TS;

/// One per-item failure recorded during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct SyncIssue {
    pub project: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    pub message: String,
}

impl std::fmt::Display for SyncIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.session {
            Some(session) => write!(f, "{}/{}: {}", self.project, session, self.message),
            None => write!(f, "{}: {}", self.project, self.message),
        }
    }
}

/// Summary of one synchronization call. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub projects_processed: usize,
    pub sessions_found: usize,
    pub sessions_synced: usize,
    pub sessions_skipped: usize,
    pub error_count: usize,
    pub errors: Vec<SyncIssue>,
    /// The pass stopped early because cancellation was requested.
    pub cancelled: bool,
}

impl SyncResult {
    /// Count one failure against `project` (and `session`, when known).
    pub fn record(&mut self, project: &str, session: Option<&str>, message: impl Into<String>) {
        self.error_count += 1;
        self.errors.push(SyncIssue {
            project: project.to_string(),
            session: session.map(str::to_string),
            message: message.into(),
        });
    }

    /// Add another pass's totals and issues to these.
    pub fn absorb(&mut self, other: SyncResult) {
        self.projects_processed += other.projects_processed;
        self.sessions_found += other.sessions_found;
        self.sessions_synced += other.sessions_synced;
        self.sessions_skipped += other.sessions_skipped;
        self.error_count += other.error_count;
        self.errors.extend(other.errors);
    }
}

/// Synchronize every project the source knows about, then regroup.
pub async fn sync_all<S, Src>(store: &S, source: &Src) -> DbResult<SyncResult>
where
    S: SessionStore + ?Sized,
    Src: SessionSource + ?Sized,
{
    sync_all_with(store, source, &CancellationToken::new(), |_| {}).await
}

/// Same as [`sync_all`]: already-stored sessions are detected and skipped.
pub async fn sync_incremental<S, Src>(store: &S, source: &Src) -> DbResult<SyncResult>
where
    S: SessionStore + ?Sized,
    Src: SessionSource + ?Sized,
{
    sync_all(store, source).await
}

/// [`sync_all`] with cooperative cancellation and a progress callback.
///
/// `cancel` is checked before each project; `on_progress` sees the running
/// totals after each one. Only failing to enumerate projects is an error.
pub async fn sync_all_with<S, Src, F>(
    store: &S,
    source: &Src,
    cancel: &CancellationToken,
    mut on_progress: F,
) -> DbResult<SyncResult>
where
    S: SessionStore + ?Sized,
    Src: SessionSource + ?Sized,
    F: FnMut(&SyncResult) + Send,
{
    let projects = source.list_projects().await?;
    let mut result = SyncResult::default();

    for name in &projects {
        if cancel.is_cancelled() {
            info!(
                processed = result.projects_processed,
                total = projects.len(),
                "Sync cancelled"
            );
            result.cancelled = true;
            break;
        }

        match sync_one(store, source, name).await {
            Ok(project_result) => {
                result.projects_processed += 1;
                result.absorb(project_result);
            }
            Err(e) => {
                warn!(project = %name, error = %e, "Failed to sync project");
                result.record(name, None, e.to_string());
            }
        }
        on_progress(&result);
    }

    if let Err(e) = sync_project_groups(store).await {
        warn!(error = %e, "Failed to sync project groups");
    }

    info!(
        projects = result.projects_processed,
        found = result.sessions_found,
        synced = result.sessions_synced,
        skipped = result.sessions_skipped,
        errors = result.error_count,
        "Sync finished"
    );
    Ok(result)
}

/// Synchronize a single project. Groups are not recomputed.
pub async fn sync_project<S, Src>(store: &S, source: &Src, project: &str) -> DbResult<SyncResult>
where
    S: SessionStore + ?Sized,
    Src: SessionSource + ?Sized,
{
    let mut result = sync_one(store, source, project).await?;
    result.projects_processed = 1;
    Ok(result)
}

async fn sync_one<S, Src>(store: &S, source: &Src, name: &str) -> DbResult<SyncResult>
where
    S: SessionStore + ?Sized,
    Src: SessionSource + ?Sized,
{
    let session_ids = source.list_sessions(name).await?;
    let project = ensure_project(store, source, name).await?;

    let mut result = SyncResult {
        sessions_found: session_ids.len(),
        ..Default::default()
    };
    let mut synced_cwd: Option<PathBuf> = None;

    for session_id in &session_ids {
        match store.session_exists(session_id).await {
            Ok(true) => {
                result.sessions_skipped += 1;
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                result.record(name, Some(session_id), e.to_string());
                continue;
            }
        }

        let session = match source.parse_session(name, session_id).await {
            Ok(session) => session,
            Err(e) => {
                warn!(project = %name, session_id = %session_id, error = %e, "Failed to parse session");
                result.record(name, Some(session_id), e.to_string());
                continue;
            }
        };

        match store.create_session(&session, name).await {
            Ok(()) => {
                result.sessions_synced += 1;
                if synced_cwd.is_none() && !session.project_path.is_empty() {
                    synced_cwd = Some(PathBuf::from(&session.project_path));
                }
            }
            Err(e) if e.is_duplicate() => {
                debug!(session_id = %session_id, "Session stored concurrently, skipping");
                result.sessions_skipped += 1;
            }
            Err(e) => {
                warn!(project = %name, session_id = %session_id, error = %e, "Failed to store session");
                result.record(name, Some(session_id), e.to_string());
            }
        }
    }

    if result.sessions_synced > 0 || project.git_root.is_none() {
        backfill_git_root(store, source, &project, synced_cwd.as_deref()).await;
    }

    if let Err(e) = store
        .update_project_last_scan_time(project.id, &Utc::now().fixed_offset())
        .await
    {
        warn!(project = %name, error = %e, "Failed to record last scan time");
    }

    Ok(result)
}

/// Load the project row, creating it (with a detected git root) on first sight.
async fn ensure_project<S, Src>(store: &S, source: &Src, name: &str) -> DbResult<ProjectRow>
where
    S: SessionStore + ?Sized,
    Src: SessionSource + ?Sized,
{
    if let Some(project) = store.get_project_by_name(name).await? {
        return Ok(project);
    }

    let decoded = decode_project_path(name);
    let git_root = match source.project_working_directory(name).await {
        Ok(cwd) => detect_root(name, &cwd).await,
        Err(e) => {
            warn!(project = %name, error = %e, "Could not determine working directory");
            None
        }
    };

    let created = match &git_root {
        Some(root) => store.create_project_with_git_root(name, &decoded, root).await,
        None => store.create_project(name, &decoded).await,
    };
    match created {
        Ok(_) => {}
        Err(e) if e.is_duplicate() => debug!(project = %name, "Project created concurrently"),
        Err(e) => return Err(e),
    }

    store
        .get_project_by_name(name)
        .await?
        .ok_or_else(|| DbError::ProjectNotFound(name.to_string()))
}

/// Re-detect the project's git root and store it when it changed.
///
/// A "not under version control" or failed detection never clears a stored
/// root.
async fn backfill_git_root<S, Src>(
    store: &S,
    source: &Src,
    project: &ProjectRow,
    known_cwd: Option<&Path>,
) where
    S: SessionStore + ?Sized,
    Src: SessionSource + ?Sized,
{
    let cwd = match known_cwd {
        Some(cwd) => cwd.to_path_buf(),
        None => match source.project_working_directory(&project.name).await {
            Ok(cwd) => cwd,
            Err(e) => {
                debug!(project = %project.name, error = %e, "No working directory for git root back-fill");
                return;
            }
        },
    };

    let Some(root) = detect_root(&project.name, &cwd).await else {
        return;
    };
    if project.git_root.as_deref() == Some(root.as_str()) {
        return;
    }

    match store.update_project_git_root(project.id, &root).await {
        Ok(()) => info!(project = %project.name, git_root = %root, "Updated project git root"),
        Err(e) => warn!(project = %project.name, error = %e, "Failed to update git root"),
    }
}

async fn detect_root(project: &str, cwd: &Path) -> Option<String> {
    match detect_git_root(cwd).await {
        Ok(Some(root)) => Some(root.to_string_lossy().into_owned()),
        Ok(None) => None,
        Err(e) => {
            warn!(project, cwd = %cwd.display(), error = %e, "Failed to detect git root");
            None
        }
    }
}
