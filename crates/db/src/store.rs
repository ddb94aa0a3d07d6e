// crates/db/src/store.rs
//! The storage seam the sync and grouping engines are written against.

use crate::{Database, DbResult, ProjectGroupRow, ProjectRow};
use async_trait::async_trait;
use cclog_core::Session;
use chrono::{DateTime, FixedOffset};

/// Create-once persistence for projects, sessions and groups.
///
/// Creates report an existing key as [`crate::DbError::Duplicate`]; the sync
/// engine relies on that to stay idempotent under concurrent callers.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_project(&self, name: &str, decoded_path: &str) -> DbResult<i64>;

    async fn create_project_with_git_root(
        &self,
        name: &str,
        decoded_path: &str,
        git_root: &str,
    ) -> DbResult<i64>;

    async fn get_project_by_name(&self, name: &str) -> DbResult<Option<ProjectRow>>;

    async fn list_projects(&self) -> DbResult<Vec<ProjectRow>>;

    async fn update_project_git_root(&self, id: i64, git_root: &str) -> DbResult<()>;

    async fn update_project_last_scan_time(
        &self,
        id: i64,
        scanned_at: &DateTime<FixedOffset>,
    ) -> DbResult<()>;

    async fn session_exists(&self, id: &str) -> DbResult<bool>;

    async fn create_session(&self, session: &Session, project_name: &str) -> DbResult<()>;

    async fn create_project_group(&self, name: &str, git_root: Option<&str>) -> DbResult<i64>;

    async fn get_project_group_by_git_root(&self, git_root: &str)
        -> DbResult<Option<ProjectGroupRow>>;

    async fn get_standalone_group_by_name(&self, name: &str) -> DbResult<Option<ProjectGroupRow>>;

    async fn add_project_to_group(&self, project_id: i64, group_id: i64) -> DbResult<()>;

    /// Drop every membership of `project_id` except the one in `keep_group_id`.
    async fn remove_project_from_other_groups(
        &self,
        project_id: i64,
        keep_group_id: i64,
    ) -> DbResult<u64>;

    /// Delete standalone groups that have no members left.
    async fn prune_empty_standalone_groups(&self) -> DbResult<u64>;
}

#[async_trait]
impl SessionStore for Database {
    async fn create_project(&self, name: &str, decoded_path: &str) -> DbResult<i64> {
        Database::create_project(self, name, decoded_path).await
    }

    async fn create_project_with_git_root(
        &self,
        name: &str,
        decoded_path: &str,
        git_root: &str,
    ) -> DbResult<i64> {
        Database::create_project_with_git_root(self, name, decoded_path, git_root).await
    }

    async fn get_project_by_name(&self, name: &str) -> DbResult<Option<ProjectRow>> {
        Database::get_project_by_name(self, name).await
    }

    async fn list_projects(&self) -> DbResult<Vec<ProjectRow>> {
        Database::list_projects(self).await
    }

    async fn update_project_git_root(&self, id: i64, git_root: &str) -> DbResult<()> {
        Database::update_project_git_root(self, id, git_root).await
    }

    async fn update_project_last_scan_time(
        &self,
        id: i64,
        scanned_at: &DateTime<FixedOffset>,
    ) -> DbResult<()> {
        Database::update_project_last_scan_time(self, id, scanned_at).await
    }

    async fn session_exists(&self, id: &str) -> DbResult<bool> {
        Database::session_exists(self, id).await
    }

    async fn create_session(&self, session: &Session, project_name: &str) -> DbResult<()> {
        Database::create_session(self, session, project_name).await
    }

    async fn create_project_group(&self, name: &str, git_root: Option<&str>) -> DbResult<i64> {
        Database::create_project_group(self, name, git_root).await
    }

    async fn get_project_group_by_git_root(
        &self,
        git_root: &str,
    ) -> DbResult<Option<ProjectGroupRow>> {
        Database::get_project_group_by_git_root(self, git_root).await
    }

    async fn get_standalone_group_by_name(&self, name: &str) -> DbResult<Option<ProjectGroupRow>> {
        Database::get_standalone_group_by_name(self, name).await
    }

    async fn add_project_to_group(&self, project_id: i64, group_id: i64) -> DbResult<()> {
        Database::add_project_to_group(self, project_id, group_id).await
    }

    async fn remove_project_from_other_groups(
        &self,
        project_id: i64,
        keep_group_id: i64,
    ) -> DbResult<u64> {
        Database::remove_project_from_other_groups(self, project_id, keep_group_id).await
    }

    async fn prune_empty_standalone_groups(&self) -> DbResult<u64> {
        Database::prune_empty_standalone_groups(self).await
    }
}
