// crates/db/src/grouping.rs
//! Derives project groups from the projects' git roots.
//!
//! Projects sharing a git root land in one group named after the repository;
//! projects without a root each get a standalone group named after
//! themselves. Safe to run any number of times.

use crate::store::SessionStore;
use crate::{DbError, DbResult, ProjectRow};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Name used when a git root has no usable final segment.
pub const UNKNOWN_GROUP_NAME: &str = "unknown";

/// Upper bound on `-N` suffixes tried when a repository name is taken.
const MAX_NAME_SUFFIX: u32 = 100;

/// Outcome of one grouping pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingSummary {
    pub groups_created: usize,
    pub memberships_added: usize,
    pub memberships_removed: u64,
    pub groups_pruned: u64,
    pub projects_skipped: usize,
}

/// Group name for a repository root: its last path segment minus `.git`.
///
/// `/src/app` → `app`, `/srv/app.git` → `app`, `/` → `unknown`.
pub fn group_name_for_root(git_root: &str) -> String {
    let base = Path::new(git_root)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");
    let base = base.strip_suffix(".git").unwrap_or(base);
    if base.is_empty() || base == "." || base == "/" {
        UNKNOWN_GROUP_NAME.to_string()
    } else {
        base.to_string()
    }
}

/// Recompute every project's group membership from its current git root.
///
/// Per-project failures are logged and skipped; only failing to list the
/// projects aborts the pass.
pub async fn sync_project_groups<S>(store: &S) -> DbResult<GroupingSummary>
where
    S: SessionStore + ?Sized,
{
    let projects = store.list_projects().await?;
    let mut summary = GroupingSummary::default();

    let mut by_root: BTreeMap<String, Vec<&ProjectRow>> = BTreeMap::new();
    let mut standalone: Vec<&ProjectRow> = Vec::new();
    for project in &projects {
        match project.git_root.as_deref() {
            Some(root) if !root.is_empty() => by_root.entry(root.to_string()).or_default().push(project),
            _ => standalone.push(project),
        }
    }

    for (root, members) in &by_root {
        let group_id = match rooted_group(store, root, &mut summary).await {
            Ok(id) => id,
            Err(e) => {
                warn!(git_root = %root, error = %e, "Failed to resolve project group");
                summary.projects_skipped += members.len();
                continue;
            }
        };
        for project in members {
            assign(store, project, group_id, &mut summary).await;
        }
    }

    for project in standalone {
        let group_id = match standalone_group(store, &project.name, &mut summary).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                warn!(
                    project = %project.name,
                    "Group name already used by a repository group; leaving project ungrouped"
                );
                summary.projects_skipped += 1;
                continue;
            }
            Err(e) => {
                warn!(project = %project.name, error = %e, "Failed to resolve standalone group");
                summary.projects_skipped += 1;
                continue;
            }
        };
        assign(store, project, group_id, &mut summary).await;
    }

    match store.prune_empty_standalone_groups().await {
        Ok(n) => summary.groups_pruned = n,
        Err(e) => warn!(error = %e, "Failed to prune empty standalone groups"),
    }

    info!(
        projects = projects.len(),
        groups_created = summary.groups_created,
        memberships_added = summary.memberships_added,
        groups_pruned = summary.groups_pruned,
        "Project groups synchronized"
    );
    Ok(summary)
}

/// Find or create the group for `root`, suffixing the name on collisions.
async fn rooted_group<S>(store: &S, root: &str, summary: &mut GroupingSummary) -> DbResult<i64>
where
    S: SessionStore + ?Sized,
{
    if let Some(group) = store.get_project_group_by_git_root(root).await? {
        return Ok(group.id);
    }

    let base = group_name_for_root(root);
    for attempt in 1..=MAX_NAME_SUFFIX {
        let name = if attempt == 1 {
            base.clone()
        } else {
            format!("{}-{}", base, attempt)
        };
        match store.create_project_group(&name, Some(root)).await {
            Ok(id) => {
                summary.groups_created += 1;
                debug!(group = %name, git_root = root, "Created repository group");
                return Ok(id);
            }
            Err(e) if e.is_duplicate() => {
                // Another caller may have just created this root's group.
                if let Some(group) = store.get_project_group_by_git_root(root).await? {
                    return Ok(group.id);
                }
            }
            Err(e) => return Err(e),
        }
    }
    Err(DbError::Duplicate(format!("group name for {}", root)))
}

/// Find or create the standalone group named after a project.
///
/// `None` when the name is already held by a repository group.
async fn standalone_group<S>(
    store: &S,
    name: &str,
    summary: &mut GroupingSummary,
) -> DbResult<Option<i64>>
where
    S: SessionStore + ?Sized,
{
    if let Some(group) = store.get_standalone_group_by_name(name).await? {
        return Ok(Some(group.id));
    }
    match store.create_project_group(name, None).await {
        Ok(id) => {
            summary.groups_created += 1;
            Ok(Some(id))
        }
        Err(e) if e.is_duplicate() => Ok(store
            .get_standalone_group_by_name(name)
            .await?
            .map(|g| g.id)),
        Err(e) => Err(e),
    }
}

async fn assign<S>(store: &S, project: &ProjectRow, group_id: i64, summary: &mut GroupingSummary)
where
    S: SessionStore + ?Sized,
{
    match store.add_project_to_group(project.id, group_id).await {
        Ok(()) => summary.memberships_added += 1,
        Err(e) if e.is_duplicate() => {}
        Err(e) => {
            warn!(project = %project.name, group_id, error = %e, "Failed to add project to group");
            summary.projects_skipped += 1;
            return;
        }
    }
    match store.remove_project_from_other_groups(project.id, group_id).await {
        Ok(n) => summary.memberships_removed += n,
        Err(e) => warn!(project = %project.name, error = %e, "Failed to drop stale group memberships"),
    }
}
