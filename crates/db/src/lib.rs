// crates/db/src/lib.rs
//! SQLite session store, synchronization engine, grouping and statistics.

pub mod grouping;
mod migrations;
pub mod period;
mod queries;
pub mod store;
pub mod sync;
mod timestamps;

pub use grouping::{group_name_for_root, sync_project_groups, GroupingSummary, UNKNOWN_GROUP_NAME};
pub use period::{
    aggregate_periods, date_range, session_covers_date, Period, SessionSpan, TimeSeriesStats,
    DEFAULT_PERIOD_LIMIT,
};
pub use queries::{
    first_user_message, BranchStats, DailyGroupStats, DailyProjectStats, GroupStats,
    ProjectGroupRow, ProjectRow, ProjectStats, SessionRow, TotalStats,
};
pub use store::SessionStore;
pub use sync::{sync_all, sync_all_with, sync_incremental, sync_project, SyncIssue, SyncResult};
pub use timestamps::{format_timestamp, parse_timestamp};

use cclog_core::DiscoveryError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{ConnectOptions, SqlitePool};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to determine cache directory")]
    NoCacheDir,

    #[error("Failed to create database directory: {0}")]
    CreateDir(#[from] std::io::Error),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Project group not found: {0}")]
    GroupNotFound(i64),

    /// A create hit a uniqueness constraint.
    #[error("Already exists: {0}")]
    Duplicate(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid period '{0}': must be day, week or month")]
    InvalidPeriod(String),

    #[error("Invalid stored timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),
}

impl DbError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, DbError::Duplicate(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DbError::ProjectNotFound(_) | DbError::SessionNotFound(_) | DbError::GroupNotFound(_)
        )
    }

    /// Map a uniqueness violation to [`DbError::Duplicate`], anything else to `Sqlx`.
    pub(crate) fn from_insert(err: sqlx::Error, what: impl FnOnce() -> String) -> Self {
        match &err {
            sqlx::Error::Database(db_err)
                if db_err.is_unique_violation()
                    || db_err.message().contains("UNIQUE constraint failed") =>
            {
                DbError::Duplicate(what())
            }
            _ => DbError::Sqlx(err),
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Main database handle wrapping a SQLite connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl Database {
    /// Open (or create) the database at the given path and run migrations.
    pub async fn new(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(30))
            .log_slow_statements(
                tracing::log::LevelFilter::Warn,
                std::time::Duration::from_secs(5),
            );

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let db = Self {
            pool,
            db_path: path.to_owned(),
        };
        db.run_migrations().await?;

        info!("Database opened at {}", path.display());
        Ok(db)
    }

    /// Create an in-memory database (for testing).
    ///
    /// Uses `shared_cache(true)` so all pool connections share the same
    /// in-memory database.
    pub async fn new_in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?
            .shared_cache(true)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        let db = Self {
            pool,
            db_path: PathBuf::new(),
        };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Open the database at the default location: `~/.cache/cclog/cclog.db`
    pub async fn open_default() -> DbResult<Self> {
        let path = default_db_path()?;
        Self::new(&path).await
    }

    /// Run all inline migrations not yet recorded in `_migrations`.
    async fn run_migrations(&self) -> DbResult<()> {
        sqlx::query("CREATE TABLE IF NOT EXISTS _migrations (version INTEGER PRIMARY KEY)")
            .execute(&self.pool)
            .await?;

        let row: (i64,) = sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM _migrations")
            .fetch_one(&self.pool)
            .await?;
        let current_version = row.0 as usize;

        for (i, migration) in migrations::MIGRATIONS.iter().enumerate() {
            let version = i + 1; // 1-based
            if version > current_version {
                sqlx::query(migration).execute(&self.pool).await?;
                sqlx::query("INSERT INTO _migrations (version) VALUES (?)")
                    .bind(version as i64)
                    .execute(&self.pool)
                    .await?;
            }
        }

        Ok(())
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get the path to the database file.
    /// Returns an empty path for in-memory databases.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

/// Returns the default database path: `~/.cache/cclog/cclog.db`
pub fn default_db_path() -> DbResult<PathBuf> {
    cclog_core::paths::db_path().ok_or(DbError::NoCacheDir)
}
