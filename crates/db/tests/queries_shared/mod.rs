//! Shared fixtures for db integration tests: a temp projects directory with
//! JSONL session files, plus a work tree holding git repos and worktrees.

#![allow(dead_code)]

use cclog_core::FileSessionSource;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct Fixture {
    _dir: TempDir,
    pub projects: PathBuf,
    pub work: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let projects = dir.path().join("projects");
        let work = dir.path().join("work");
        fs::create_dir_all(&projects).unwrap();
        fs::create_dir_all(&work).unwrap();
        Self {
            _dir: dir,
            projects,
            work,
        }
    }

    pub fn source(&self) -> FileSessionSource {
        FileSessionSource::new(&self.projects)
    }

    pub fn db_path(&self) -> PathBuf {
        self.projects.parent().unwrap().join("db").join("cclog.db")
    }

    /// A plain directory, not under version control.
    pub fn plain_dir(&self, name: &str) -> PathBuf {
        let path = self.work.join(name);
        fs::create_dir_all(&path).unwrap();
        path
    }

    /// An ordinary repository: `<work>/<name>/.git/`.
    pub fn repo(&self, name: &str) -> PathBuf {
        let path = self.plain_dir(name);
        fs::create_dir_all(path.join(".git")).unwrap();
        path
    }

    /// A linked worktree of `repo` with a `.git` indirection file.
    pub fn worktree(&self, repo: &Path, name: &str) -> PathBuf {
        let path = self.plain_dir(name);
        let admin = repo.join(".git").join("worktrees").join(name);
        fs::create_dir_all(&admin).unwrap();
        fs::write(path.join(".git"), format!("gitdir: {}\n", admin.display())).unwrap();
        path
    }

    /// Write `<projects>/<project>/<session_id>.jsonl`: one user prompt at
    /// `start` and one assistant reply at `end` carrying `input_tokens`.
    pub fn write_session(
        &self,
        project: &str,
        session_id: &str,
        cwd: &Path,
        start: &str,
        end: &str,
        input_tokens: u64,
    ) {
        let dir = self.projects.join(project);
        fs::create_dir_all(&dir).unwrap();

        let cwd = cwd.display().to_string();
        let user = serde_json::json!({
            "type": "user",
            "timestamp": start,
            "sessionId": session_id,
            "uuid": format!("{session_id}-u1"),
            "parentUuid": null,
            "cwd": cwd,
            "version": "1.0.0",
            "gitBranch": "main",
            "message": { "role": "user", "content": format!("work on {session_id}") }
        });
        let assistant = serde_json::json!({
            "type": "assistant",
            "timestamp": end,
            "sessionId": session_id,
            "uuid": format!("{session_id}-a1"),
            "parentUuid": format!("{session_id}-u1"),
            "cwd": cwd,
            "version": "1.0.0",
            "gitBranch": "main",
            "requestId": "req_1",
            "message": {
                "model": "claude-sonnet",
                "id": "msg_1",
                "role": "assistant",
                "content": [{ "type": "text", "text": "done" }],
                "usage": { "input_tokens": input_tokens, "output_tokens": 10 }
            }
        });
        fs::write(
            dir.join(format!("{session_id}.jsonl")),
            format!("{user}\n{assistant}\n"),
        )
        .unwrap();
    }

    /// Shorthand: a one-hour session on 2026-01-20.
    pub fn write_simple_session(&self, project: &str, session_id: &str, cwd: &Path) {
        self.write_session(
            project,
            session_id,
            cwd,
            "2026-01-20T10:00:00.000Z",
            "2026-01-20T11:00:00.000Z",
            100,
        );
    }
}
