// crates/db/src/queries/groups.rs
// Project groups and project → group membership.

use super::{ProjectGroupRow, ProjectRow};
use crate::{Database, DbError, DbResult};

const GROUP_COLUMNS: &str = "id, name, git_root, created_at, updated_at";

impl Database {
    /// Create a group. Name and (when present) git root must be unique.
    pub async fn create_project_group(&self, name: &str, git_root: Option<&str>) -> DbResult<i64> {
        if name.is_empty() {
            return Err(DbError::InvalidInput("group name must not be empty".into()));
        }
        let result = sqlx::query("INSERT INTO project_groups (name, git_root) VALUES (?1, ?2)")
            .bind(name)
            .bind(git_root.filter(|r| !r.is_empty()))
            .execute(self.pool())
            .await
            .map_err(|e| DbError::from_insert(e, || format!("project group {}", name)))?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_project_group_by_id(&self, id: i64) -> DbResult<Option<ProjectGroupRow>> {
        let row = sqlx::query_as::<_, ProjectGroupRow>(&format!(
            "SELECT {GROUP_COLUMNS} FROM project_groups WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    pub async fn get_project_group_by_name(&self, name: &str) -> DbResult<Option<ProjectGroupRow>> {
        let row = sqlx::query_as::<_, ProjectGroupRow>(&format!(
            "SELECT {GROUP_COLUMNS} FROM project_groups WHERE name = ?1"
        ))
        .bind(name)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    /// A group with this name and no git root.
    pub async fn get_standalone_group_by_name(&self, name: &str) -> DbResult<Option<ProjectGroupRow>> {
        let row = sqlx::query_as::<_, ProjectGroupRow>(&format!(
            "SELECT {GROUP_COLUMNS} FROM project_groups WHERE name = ?1 AND git_root IS NULL"
        ))
        .bind(name)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    pub async fn get_project_group_by_git_root(
        &self,
        git_root: &str,
    ) -> DbResult<Option<ProjectGroupRow>> {
        let row = sqlx::query_as::<_, ProjectGroupRow>(&format!(
            "SELECT {GROUP_COLUMNS} FROM project_groups WHERE git_root = ?1"
        ))
        .bind(git_root)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    /// Git-rooted groups first, then standalone ones; each by name.
    pub async fn list_project_groups(&self) -> DbResult<Vec<ProjectGroupRow>> {
        let rows = sqlx::query_as::<_, ProjectGroupRow>(&format!(
            "SELECT {GROUP_COLUMNS} FROM project_groups ORDER BY git_root IS NULL, name"
        ))
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Add a membership. An existing mapping yields [`DbError::Duplicate`].
    pub async fn add_project_to_group(&self, project_id: i64, group_id: i64) -> DbResult<()> {
        sqlx::query("INSERT INTO project_group_mappings (project_id, group_id) VALUES (?1, ?2)")
            .bind(project_id)
            .bind(group_id)
            .execute(self.pool())
            .await
            .map_err(|e| {
                DbError::from_insert(e, || format!("project {} in group {}", project_id, group_id))
            })?;
        Ok(())
    }

    /// Member projects of a group, by name.
    pub async fn get_projects_by_group_id(&self, group_id: i64) -> DbResult<Vec<ProjectRow>> {
        let rows = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT p.id, p.name, p.decoded_path, p.git_root, p.last_scan_time,
                   p.created_at, p.updated_at
            FROM projects p
            INNER JOIN project_group_mappings pgm ON pgm.project_id = p.id
            WHERE pgm.group_id = ?1
            ORDER BY p.name
            "#,
        )
        .bind(group_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn get_group_with_projects(
        &self,
        group_id: i64,
    ) -> DbResult<(ProjectGroupRow, Vec<ProjectRow>)> {
        let group = self
            .get_project_group_by_id(group_id)
            .await?
            .ok_or(DbError::GroupNotFound(group_id))?;
        let projects = self.get_projects_by_group_id(group_id).await?;
        Ok((group, projects))
    }

    /// Delete a group; its memberships cascade, projects are untouched.
    pub async fn delete_project_group(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM project_groups WHERE id = ?1")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::GroupNotFound(id));
        }
        Ok(())
    }

    pub async fn remove_project_from_other_groups(
        &self,
        project_id: i64,
        keep_group_id: i64,
    ) -> DbResult<u64> {
        let result =
            sqlx::query("DELETE FROM project_group_mappings WHERE project_id = ?1 AND group_id <> ?2")
                .bind(project_id)
                .bind(keep_group_id)
                .execute(self.pool())
                .await?;
        Ok(result.rows_affected())
    }

    pub async fn prune_empty_standalone_groups(&self) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM project_groups
            WHERE git_root IS NULL
              AND NOT EXISTS (
                  SELECT 1 FROM project_group_mappings pgm WHERE pgm.group_id = project_groups.id
              )
            "#,
        )
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_project_groups(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM project_groups")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}
