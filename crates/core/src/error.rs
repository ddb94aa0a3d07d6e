// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when parsing a JSONL session file
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Session file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Permission denied reading file: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON at line {line} in {path}: {message}")]
    MalformedJson {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Empty session file: {path}")]
    EmptyFile { path: PathBuf },
}

/// Errors that can occur while enumerating projects and sessions on disk
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Claude projects directory not found: {path}")]
    ProjectsDirNotFound { path: PathBuf },

    #[error("Cannot access Claude projects directory: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("No working directory recorded for project {project}")]
    NoWorkingDirectory { project: String },
}

/// Errors from git root detection.
///
/// "Not under version control" is not an error; see
/// [`detect_git_root`](crate::git_root::detect_git_root).
#[derive(Debug, Error)]
pub enum GitRootError {
    #[error("Project path does not exist: {path}")]
    PathNotFound { path: PathBuf },

    #[error("IO error reading git marker at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed .git file at {path}: {reason}")]
    MalformedMarker { path: PathBuf, reason: String },

    #[error("Unsupported gitdir target {target} (no 'worktrees' segment)")]
    UnsupportedMarker { target: PathBuf },
}

impl ParseError {
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }
}

impl DiscoveryError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::ProjectsDirNotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }
}

impl GitRootError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::PathNotFound { path },
            _ => Self::Io { path, source },
        }
    }

    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedMarker {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
