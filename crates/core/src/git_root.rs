// crates/core/src/git_root.rs
//! Git root detection from the `.git` marker.
//!
//! Only the marker itself is read: a `.git` directory means the project is the
//! repository root, a `.git` file (`gitdir: <path>`) means a worktree whose
//! main repository is reconstructed from the `worktrees` segment of the target.

use crate::error::GitRootError;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

const GITDIR_PREFIX: &str = "gitdir: ";

/// Detect the git root for `project_path`.
///
/// Returns `Ok(None)` when there is no `.git` marker (not under version
/// control). Fails when `project_path` does not exist or the marker file is
/// malformed or points somewhere without a `worktrees` segment.
pub async fn detect_git_root(project_path: &Path) -> Result<Option<PathBuf>, GitRootError> {
    tokio::fs::metadata(project_path)
        .await
        .map_err(|e| GitRootError::io(project_path, e))?;

    let marker = project_path.join(".git");
    let meta = match tokio::fs::symlink_metadata(&marker).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %project_path.display(), "No .git marker");
            return Ok(None);
        }
        Err(e) => return Err(GitRootError::Io { path: marker, source: e }),
    };

    // Follow a symlinked marker to whatever it points at.
    let is_dir = if meta.file_type().is_symlink() {
        tokio::fs::metadata(&marker)
            .await
            .map_err(|e| GitRootError::Io {
                path: marker.clone(),
                source: e,
            })?
            .is_dir()
    } else {
        meta.is_dir()
    };

    if is_dir {
        return Ok(Some(project_path.to_path_buf()));
    }

    let content = tokio::fs::read_to_string(&marker)
        .await
        .map_err(|e| GitRootError::Io {
            path: marker.clone(),
            source: e,
        })?;

    let target = parse_gitdir_file(&content).map_err(|reason| GitRootError::malformed(&marker, reason))?;
    let target = if target.is_absolute() {
        target
    } else {
        project_path.join(target)
    };

    root_from_worktree_target(&target)
        .map(Some)
        .ok_or(GitRootError::UnsupportedMarker { target })
}

/// Extract the target of a `gitdir: <path>` marker file.
pub fn parse_gitdir_file(content: &str) -> Result<PathBuf, &'static str> {
    let rest = content
        .strip_prefix(GITDIR_PREFIX)
        .ok_or("missing 'gitdir:' prefix")?;
    let target = rest.trim();
    if target.is_empty() {
        return Err("empty gitdir path");
    }
    Ok(PathBuf::from(target))
}

/// Reconstruct the main repository root from a worktree gitdir target.
///
/// Everything before the last `worktrees` segment is kept and a trailing
/// `.git` segment is dropped:
/// - `/repo.git/worktrees/feature` → `/repo.git`
/// - `/repo/.git/worktrees/feature` → `/repo`
///
/// Returns `None` if there is no `worktrees` segment or nothing precedes it.
pub fn root_from_worktree_target(target: &Path) -> Option<PathBuf> {
    let components: Vec<Component<'_>> = normalize(target);
    let idx = components
        .iter()
        .rposition(|c| matches!(c, Component::Normal(s) if *s == "worktrees"))?;

    let mut kept = &components[..idx];
    if let Some(Component::Normal(last)) = kept.last() {
        if *last == ".git" {
            kept = &kept[..kept.len() - 1];
        }
    }

    if !kept.iter().any(|c| matches!(c, Component::Normal(_))) {
        return None;
    }

    Some(kept.iter().collect())
}

/// Lexically clean a path: drop `.` and fold `..` into the parent.
fn normalize(path: &Path) -> Vec<Component<'_>> {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_worktree_target_bare_repo() {
        assert_eq!(
            root_from_worktree_target(Path::new("/repo.git/worktrees/feature")),
            Some(PathBuf::from("/repo.git"))
        );
    }

    #[test]
    fn test_worktree_target_regular_repo() {
        assert_eq!(
            root_from_worktree_target(Path::new("/repo/.git/worktrees/feature")),
            Some(PathBuf::from("/repo"))
        );
    }

    #[test]
    fn test_worktree_target_uses_last_segment() {
        assert_eq!(
            root_from_worktree_target(Path::new("/srv/worktrees/repo/.git/worktrees/x")),
            Some(PathBuf::from("/srv/worktrees/repo"))
        );
    }

    #[test]
    fn test_worktree_target_without_segment() {
        assert_eq!(root_from_worktree_target(Path::new("/repo/.git/modules/sub")), None);
        assert_eq!(root_from_worktree_target(Path::new("/worktrees/x")), None);
    }

    #[test]
    fn test_worktree_target_is_normalized() {
        assert_eq!(
            root_from_worktree_target(Path::new("/a/b/../repo/./.git/worktrees/f")),
            Some(PathBuf::from("/a/repo"))
        );
    }

    #[test]
    fn test_parse_gitdir_file() {
        assert_eq!(
            parse_gitdir_file("gitdir: /repo/.git/worktrees/f\n").unwrap(),
            PathBuf::from("/repo/.git/worktrees/f")
        );
        assert!(parse_gitdir_file("/repo/.git").is_err());
        assert!(parse_gitdir_file("gitdir:    \n").is_err());
    }

    #[tokio::test]
    async fn test_detect_not_under_version_control() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(detect_git_root(tmp.path()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_detect_git_directory() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join(".git")).unwrap();
        assert_eq!(
            detect_git_root(tmp.path()).await.unwrap(),
            Some(tmp.path().to_path_buf())
        );
    }

    #[tokio::test]
    async fn test_detect_worktree_file() {
        let tmp = TempDir::new().unwrap();
        let main = tmp.path().join("main");
        let wt = tmp.path().join("wt");
        std::fs::create_dir_all(main.join(".git/worktrees/wt")).unwrap();
        std::fs::create_dir_all(&wt).unwrap();
        std::fs::write(
            wt.join(".git"),
            format!("gitdir: {}\n", main.join(".git/worktrees/wt").display()),
        )
        .unwrap();

        assert_eq!(detect_git_root(&wt).await.unwrap(), Some(main));
    }

    #[tokio::test]
    async fn test_detect_relative_worktree_file() {
        let tmp = TempDir::new().unwrap();
        let wt = tmp.path().join("wt");
        std::fs::create_dir_all(&wt).unwrap();
        std::fs::write(wt.join(".git"), "gitdir: ../main/.git/worktrees/wt\n").unwrap();

        assert_eq!(
            detect_git_root(&wt).await.unwrap(),
            Some(tmp.path().join("main"))
        );
    }

    #[tokio::test]
    async fn test_detect_malformed_marker() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(".git"), "not a gitdir line").unwrap();
        let err = detect_git_root(tmp.path()).await.unwrap_err();
        assert!(matches!(err, GitRootError::MalformedMarker { .. }));
    }

    #[tokio::test]
    async fn test_detect_unsupported_marker_target() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(".git"), "gitdir: /repo/.git/modules/sub\n").unwrap();
        let err = detect_git_root(tmp.path()).await.unwrap_err();
        assert!(matches!(err, GitRootError::UnsupportedMarker { .. }));
    }

    #[tokio::test]
    async fn test_detect_missing_path() {
        let err = detect_git_root(Path::new("/no/such/project/dir"))
            .await
            .unwrap_err();
        assert!(matches!(err, GitRootError::PathNotFound { .. }));
    }
}
