// crates/db/src/queries/projects.rs
// Project CRUD.

use super::ProjectRow;
use crate::timestamps::{format_timestamp, now_timestamp};
use crate::{Database, DbError, DbResult};
use chrono::{DateTime, FixedOffset};

const PROJECT_COLUMNS: &str =
    "id, name, decoded_path, git_root, last_scan_time, created_at, updated_at";

impl Database {
    /// Create a project without a git root. Returns the new id.
    pub async fn create_project(&self, name: &str, decoded_path: &str) -> DbResult<i64> {
        self.insert_project(name, decoded_path, None).await
    }

    pub async fn create_project_with_git_root(
        &self,
        name: &str,
        decoded_path: &str,
        git_root: &str,
    ) -> DbResult<i64> {
        self.insert_project(name, decoded_path, Some(git_root)).await
    }

    async fn insert_project(
        &self,
        name: &str,
        decoded_path: &str,
        git_root: Option<&str>,
    ) -> DbResult<i64> {
        if name.is_empty() {
            return Err(DbError::InvalidInput("project name must not be empty".into()));
        }
        if decoded_path.is_empty() {
            return Err(DbError::InvalidInput("project path must not be empty".into()));
        }

        let result = sqlx::query("INSERT INTO projects (name, decoded_path, git_root) VALUES (?1, ?2, ?3)")
            .bind(name)
            .bind(decoded_path)
            .bind(git_root.filter(|r| !r.is_empty()))
            .execute(self.pool())
            .await
            .map_err(|e| DbError::from_insert(e, || format!("project {}", name)))?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_project_by_name(&self, name: &str) -> DbResult<Option<ProjectRow>> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE name = ?1"
        ))
        .bind(name)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    pub async fn get_project_by_id(&self, id: i64) -> DbResult<Option<ProjectRow>> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    /// All projects, ordered by name.
    pub async fn list_projects(&self) -> DbResult<Vec<ProjectRow>> {
        let rows = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY name"
        ))
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Set the project's git root. An empty root clears it.
    pub async fn update_project_git_root(&self, id: i64, git_root: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE projects SET git_root = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(Some(git_root).filter(|r| !r.is_empty()))
            .bind(now_timestamp())
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::ProjectNotFound(id.to_string()));
        }
        Ok(())
    }

    pub async fn update_project_last_scan_time(
        &self,
        id: i64,
        scanned_at: &DateTime<FixedOffset>,
    ) -> DbResult<()> {
        let result = sqlx::query("UPDATE projects SET last_scan_time = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(format_timestamp(scanned_at))
            .bind(now_timestamp())
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::ProjectNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Delete a project; its sessions and memberships cascade.
    pub async fn delete_project(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?1")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::ProjectNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Working directory recorded by the project's most recent session.
    pub async fn project_working_directory(&self, project_id: i64) -> DbResult<Option<String>> {
        let cwd: Option<String> = sqlx::query_scalar(
            r#"
            SELECT le.cwd
            FROM log_entries le
            INNER JOIN sessions s ON s.id = le.session_id
            WHERE s.project_id = ?1 AND le.cwd <> ''
            ORDER BY julianday(s.start_time) DESC, le.id
            LIMIT 1
            "#,
        )
        .bind(project_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(cwd)
    }

    pub async fn count_projects(&self) -> DbResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM projects")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbError};

    #[tokio::test]
    async fn test_create_and_get_project() {
        let db = Database::new_in_memory().await.unwrap();
        let id = db.create_project("-home-me-app", "/home/me/app").await.unwrap();

        let by_name = db.get_project_by_name("-home-me-app").await.unwrap().unwrap();
        assert_eq!(by_name.id, id);
        assert_eq!(by_name.decoded_path, "/home/me/app");
        assert_eq!(by_name.git_root, None);
        assert_eq!(by_name.last_scan_time, None);

        let by_id = db.get_project_by_id(id).await.unwrap().unwrap();
        assert_eq!(by_id, by_name);

        assert!(db.get_project_by_name("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_project_validation_and_duplicates() {
        let db = Database::new_in_memory().await.unwrap();
        assert!(matches!(
            db.create_project("", "/x").await,
            Err(DbError::InvalidInput(_))
        ));
        assert!(matches!(
            db.create_project("x", "").await,
            Err(DbError::InvalidInput(_))
        ));

        db.create_project("p", "/p").await.unwrap();
        let err = db.create_project("p", "/p").await.unwrap_err();
        assert!(err.is_duplicate(), "got {err:?}");
    }

    #[tokio::test]
    async fn test_git_root_update_and_listing_order() {
        let db = Database::new_in_memory().await.unwrap();
        let b = db.create_project_with_git_root("b", "/b", "/repo").await.unwrap();
        db.create_project("a", "/a").await.unwrap();

        let names: Vec<_> = db.list_projects().await.unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["a", "b"]);

        db.update_project_git_root(b, "/other").await.unwrap();
        let row = db.get_project_by_id(b).await.unwrap().unwrap();
        assert_eq!(row.git_root.as_deref(), Some("/other"));

        assert!(db.update_project_git_root(999, "/x").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_last_scan_time_round_trip() {
        let db = Database::new_in_memory().await.unwrap();
        let id = db.create_project("p", "/p").await.unwrap();
        let at = chrono::DateTime::parse_from_rfc3339("2026-02-01T10:00:00+02:00").unwrap();

        db.update_project_last_scan_time(id, &at).await.unwrap();
        let row = db.get_project_by_id(id).await.unwrap().unwrap();
        assert_eq!(row.last_scan_time, Some(at));
    }

    #[tokio::test]
    async fn test_delete_project() {
        let db = Database::new_in_memory().await.unwrap();
        let id = db.create_project("p", "/p").await.unwrap();
        assert_eq!(db.count_projects().await.unwrap(), 1);
        assert_eq!(db.project_working_directory(id).await.unwrap(), None);
        db.delete_project(id).await.unwrap();
        assert_eq!(db.count_projects().await.unwrap(), 0);
        assert!(db.delete_project(id).await.unwrap_err().is_not_found());
    }
}
