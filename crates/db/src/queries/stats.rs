// crates/db/src/queries/stats.rs
// Aggregate statistics, time series and daily breakdowns.
//
// Ordering and MIN/MAX over stored timestamps go through julianday() so that
// rows written with different UTC offsets compare as instants.

use super::{SessionRow, SESSION_COLUMNS};
use crate::period::{aggregate_periods, session_covers_date, Period, TimeSeriesStats};
use crate::timestamps::julian_day_to_utc;
use crate::{Database, DbError, DbResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, Row};
use std::collections::{HashMap, HashSet};
use ts_rs::TS;

// ============================================================================
// Public stats types
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    #[ts(type = "number")]
    pub total_sessions: i64,
    #[ts(type = "number")]
    pub total_input_tokens: i64,
    #[ts(type = "number")]
    pub total_output_tokens: i64,
    #[ts(type = "number")]
    pub total_cache_creation_tokens: i64,
    #[ts(type = "number")]
    pub total_cache_read_tokens: i64,
    /// Mean of input + output tokens per session.
    pub avg_tokens: f64,
    #[ts(type = "string | null")]
    pub first_session: Option<DateTime<Utc>>,
    #[ts(type = "string | null")]
    pub last_session: Option<DateTime<Utc>>,
    /// Share of sessions with at least one tool error; 0 without sessions.
    pub error_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct GroupStats {
    #[ts(type = "number")]
    pub total_projects: i64,
    #[ts(type = "number")]
    pub total_sessions: i64,
    #[ts(type = "number")]
    pub total_input_tokens: i64,
    #[ts(type = "number")]
    pub total_output_tokens: i64,
    #[ts(type = "number")]
    pub total_cache_creation_tokens: i64,
    #[ts(type = "number")]
    pub total_cache_read_tokens: i64,
    pub avg_tokens: f64,
    #[ts(type = "string | null")]
    pub first_session: Option<DateTime<Utc>>,
    #[ts(type = "string | null")]
    pub last_session: Option<DateTime<Utc>>,
    pub error_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct TotalStats {
    #[ts(type = "number")]
    pub total_groups: i64,
    #[ts(type = "number")]
    pub total_projects: i64,
    #[ts(type = "number")]
    pub total_sessions: i64,
    #[ts(type = "number")]
    pub total_input_tokens: i64,
    #[ts(type = "number")]
    pub total_output_tokens: i64,
    #[ts(type = "number")]
    pub total_cache_creation_tokens: i64,
    #[ts(type = "number")]
    pub total_cache_read_tokens: i64,
    pub avg_tokens: f64,
    #[ts(type = "string | null")]
    pub first_session: Option<DateTime<Utc>>,
    #[ts(type = "string | null")]
    pub last_session: Option<DateTime<Utc>>,
    pub error_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct BranchStats {
    pub branch: String,
    #[ts(type = "number")]
    pub session_count: i64,
    #[ts(type = "number")]
    pub total_input_tokens: i64,
    #[ts(type = "number")]
    pub total_output_tokens: i64,
    #[ts(type = "number")]
    pub total_cache_creation_tokens: i64,
    #[ts(type = "number")]
    pub total_cache_read_tokens: i64,
    #[ts(type = "string | null")]
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct DailyGroupStats {
    #[ts(type = "number")]
    pub group_id: i64,
    pub group_name: String,
    #[ts(type = "number")]
    pub session_count: i64,
    #[ts(type = "number")]
    pub total_input_tokens: i64,
    #[ts(type = "number")]
    pub total_output_tokens: i64,
    #[ts(type = "number")]
    pub total_cache_creation_tokens: i64,
    #[ts(type = "number")]
    pub total_cache_read_tokens: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct DailyProjectStats {
    #[ts(type = "number")]
    pub project_id: i64,
    pub project_name: String,
    #[ts(type = "number")]
    pub session_count: i64,
    #[ts(type = "number")]
    pub total_input_tokens: i64,
    #[ts(type = "number")]
    pub total_output_tokens: i64,
    #[ts(type = "number")]
    pub total_cache_creation_tokens: i64,
    #[ts(type = "number")]
    pub total_cache_read_tokens: i64,
    /// All four token counters summed.
    #[ts(type = "number")]
    pub total_tokens: i64,
}

// ============================================================================
// Internal rows
// ============================================================================

/// Output of [`AGGREGATE_COLUMNS`].
#[derive(Debug)]
struct AggregateRow {
    total_sessions: i64,
    total_input_tokens: i64,
    total_output_tokens: i64,
    total_cache_creation_tokens: i64,
    total_cache_read_tokens: i64,
    avg_tokens: f64,
    first_session: Option<DateTime<Utc>>,
    last_session: Option<DateTime<Utc>>,
    error_rate: f64,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for AggregateRow {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        let first: Option<f64> = row.try_get("first_session")?;
        let last: Option<f64> = row.try_get("last_session")?;
        Ok(Self {
            total_sessions: row.try_get("total_sessions")?,
            total_input_tokens: row.try_get("total_input_tokens")?,
            total_output_tokens: row.try_get("total_output_tokens")?,
            total_cache_creation_tokens: row.try_get("total_cache_creation_tokens")?,
            total_cache_read_tokens: row.try_get("total_cache_read_tokens")?,
            avg_tokens: row.try_get("avg_tokens")?,
            first_session: first.and_then(julian_day_to_utc),
            last_session: last.and_then(julian_day_to_utc),
            error_rate: row.try_get("error_rate")?,
        })
    }
}

impl AggregateRow {
    fn into_project_stats(self) -> ProjectStats {
        ProjectStats {
            total_sessions: self.total_sessions,
            total_input_tokens: self.total_input_tokens,
            total_output_tokens: self.total_output_tokens,
            total_cache_creation_tokens: self.total_cache_creation_tokens,
            total_cache_read_tokens: self.total_cache_read_tokens,
            avg_tokens: self.avg_tokens,
            first_session: self.first_session,
            last_session: self.last_session,
            error_rate: self.error_rate,
        }
    }
}

/// Aggregate columns over a `sessions s` relation (possibly outer-joined).
const AGGREGATE_COLUMNS: &str = r#"
    COUNT(s.id) AS total_sessions,
    COALESCE(SUM(s.total_input_tokens), 0) AS total_input_tokens,
    COALESCE(SUM(s.total_output_tokens), 0) AS total_output_tokens,
    COALESCE(SUM(s.total_cache_creation_tokens), 0) AS total_cache_creation_tokens,
    COALESCE(SUM(s.total_cache_read_tokens), 0) AS total_cache_read_tokens,
    COALESCE(AVG(s.total_input_tokens + s.total_output_tokens), 0.0) AS avg_tokens,
    MIN(julianday(s.start_time)) AS first_session,
    MAX(julianday(s.end_time)) AS last_session,
    COALESCE(
        CAST(SUM(CASE WHEN s.error_count > 0 THEN 1 ELSE 0 END) AS REAL) / NULLIF(COUNT(s.id), 0),
        0.0
    ) AS error_rate
"#;

/// Per-date token tally with session dedup.
#[derive(Debug, Default)]
struct DailyTally {
    name: String,
    seen: HashSet<String>,
    session_count: i64,
    input: i64,
    output: i64,
    cache_creation: i64,
    cache_read: i64,
}

impl DailyTally {
    fn add(&mut self, session: &SessionRow) {
        if !self.seen.insert(session.id.clone()) {
            return;
        }
        self.session_count += 1;
        self.input += session.total_input_tokens;
        self.output += session.total_output_tokens;
        self.cache_creation += session.total_cache_creation_tokens;
        self.cache_read += session.total_cache_read_tokens;
    }
}

impl Database {
    // ========================================================================
    // Aggregates
    // ========================================================================

    pub async fn project_stats(&self, project_id: i64) -> DbResult<ProjectStats> {
        let row = sqlx::query_as::<_, AggregateRow>(&format!(
            "SELECT {AGGREGATE_COLUMNS} FROM sessions s WHERE s.project_id = ?1"
        ))
        .bind(project_id)
        .fetch_one(self.pool())
        .await?;
        Ok(row.into_project_stats())
    }

    pub async fn group_stats(&self, group_id: i64) -> DbResult<GroupStats> {
        if self.get_project_group_by_id(group_id).await?.is_none() {
            return Err(DbError::GroupNotFound(group_id));
        }

        let row = sqlx::query(&format!(
            r#"
            SELECT COUNT(DISTINCT pgm.project_id) AS total_projects, {AGGREGATE_COLUMNS}
            FROM project_group_mappings pgm
            LEFT JOIN sessions s ON s.project_id = pgm.project_id
            WHERE pgm.group_id = ?1
            "#
        ))
        .bind(group_id)
        .fetch_one(self.pool())
        .await?;

        let total_projects: i64 = row.try_get("total_projects")?;
        let agg = AggregateRow::from_row(&row)?;
        Ok(GroupStats {
            total_projects,
            total_sessions: agg.total_sessions,
            total_input_tokens: agg.total_input_tokens,
            total_output_tokens: agg.total_output_tokens,
            total_cache_creation_tokens: agg.total_cache_creation_tokens,
            total_cache_read_tokens: agg.total_cache_read_tokens,
            avg_tokens: agg.avg_tokens,
            first_session: agg.first_session,
            last_session: agg.last_session,
            error_rate: agg.error_rate,
        })
    }

    pub async fn total_stats(&self) -> DbResult<TotalStats> {
        let agg = sqlx::query_as::<_, AggregateRow>(&format!(
            "SELECT {AGGREGATE_COLUMNS} FROM sessions s"
        ))
        .fetch_one(self.pool())
        .await?;

        Ok(TotalStats {
            total_groups: self.count_project_groups().await?,
            total_projects: self.count_projects().await?,
            total_sessions: agg.total_sessions,
            total_input_tokens: agg.total_input_tokens,
            total_output_tokens: agg.total_output_tokens,
            total_cache_creation_tokens: agg.total_cache_creation_tokens,
            total_cache_read_tokens: agg.total_cache_read_tokens,
            avg_tokens: agg.avg_tokens,
            first_session: agg.first_session,
            last_session: agg.last_session,
            error_rate: agg.error_rate,
        })
    }

    /// Per-branch breakdown, busiest branch first.
    pub async fn branch_stats(&self, project_id: i64) -> DbResult<Vec<BranchStats>> {
        let rows = sqlx::query(
            r#"
            SELECT
                s.git_branch AS branch,
                COUNT(*) AS session_count,
                COALESCE(SUM(s.total_input_tokens), 0) AS total_input_tokens,
                COALESCE(SUM(s.total_output_tokens), 0) AS total_output_tokens,
                COALESCE(SUM(s.total_cache_creation_tokens), 0) AS total_cache_creation_tokens,
                COALESCE(SUM(s.total_cache_read_tokens), 0) AS total_cache_read_tokens,
                MAX(julianday(s.end_time)) AS last_activity
            FROM sessions s
            WHERE s.project_id = ?1
            GROUP BY s.git_branch
            ORDER BY session_count DESC, branch
            "#,
        )
        .bind(project_id)
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|row| -> DbResult<BranchStats> {
                let last: Option<f64> = row.try_get("last_activity")?;
                Ok(BranchStats {
                    branch: row.try_get("branch")?,
                    session_count: row.try_get("session_count")?,
                    total_input_tokens: row.try_get("total_input_tokens")?,
                    total_output_tokens: row.try_get("total_output_tokens")?,
                    total_cache_creation_tokens: row.try_get("total_cache_creation_tokens")?,
                    total_cache_read_tokens: row.try_get("total_cache_read_tokens")?,
                    last_activity: last.and_then(julian_day_to_utc),
                })
            })
            .collect()
    }

    // ========================================================================
    // Time series
    // ========================================================================

    pub async fn project_timeline(
        &self,
        project_id: i64,
        period: Period,
        limit: usize,
    ) -> DbResult<Vec<TimeSeriesStats>> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions s WHERE s.project_id = ?1"
        ))
        .bind(project_id)
        .fetch_all(self.pool())
        .await?;
        Ok(timeline(&rows, period, limit))
    }

    pub async fn group_timeline(
        &self,
        group_id: i64,
        period: Period,
        limit: usize,
    ) -> DbResult<Vec<TimeSeriesStats>> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM sessions s
            WHERE s.project_id IN (
                SELECT project_id FROM project_group_mappings WHERE group_id = ?1
            )
            "#
        ))
        .bind(group_id)
        .fetch_all(self.pool())
        .await?;
        Ok(timeline(&rows, period, limit))
    }

    pub async fn total_timeline(&self, period: Period, limit: usize) -> DbResult<Vec<TimeSeriesStats>> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!("SELECT {SESSION_COLUMNS} FROM sessions s"))
            .fetch_all(self.pool())
            .await?;
        Ok(timeline(&rows, period, limit))
    }

    // ========================================================================
    // Daily breakdowns
    // ========================================================================

    /// Per-group totals of sessions running on `date`, by input + output desc.
    pub async fn daily_group_stats(&self, date: NaiveDate) -> DbResult<Vec<DailyGroupStats>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT pg.id AS group_id, pg.name AS group_name, {SESSION_COLUMNS}
            FROM project_groups pg
            INNER JOIN project_group_mappings pgm ON pgm.group_id = pg.id
            INNER JOIN sessions s ON s.project_id = pgm.project_id
            "#
        ))
        .fetch_all(self.pool())
        .await?;

        let mut tallies: HashMap<i64, DailyTally> = HashMap::new();
        for row in &rows {
            let session = SessionRow::from_row(row)?;
            if !session_covers_date(&session.start_time, &session.end_time, date) {
                continue;
            }
            let group_id: i64 = row.try_get("group_id")?;
            let tally = tallies.entry(group_id).or_default();
            if tally.name.is_empty() {
                tally.name = row.try_get("group_name")?;
            }
            tally.add(&session);
        }

        let mut stats: Vec<DailyGroupStats> = tallies
            .into_iter()
            .map(|(group_id, t)| DailyGroupStats {
                group_id,
                group_name: t.name,
                session_count: t.session_count,
                total_input_tokens: t.input,
                total_output_tokens: t.output,
                total_cache_creation_tokens: t.cache_creation,
                total_cache_read_tokens: t.cache_read,
            })
            .collect();
        stats.sort_by(|a, b| {
            let a_total = a.total_input_tokens + a.total_output_tokens;
            let b_total = b.total_input_tokens + b.total_output_tokens;
            b_total.cmp(&a_total).then_with(|| a.group_name.cmp(&b.group_name))
        });
        Ok(stats)
    }

    /// Per-project totals within a group for `date`, by all tokens desc.
    pub async fn group_daily_project_stats(
        &self,
        group_id: i64,
        date: NaiveDate,
    ) -> DbResult<Vec<DailyProjectStats>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT p.id AS owner_id, p.name AS owner_name, {SESSION_COLUMNS}
            FROM project_group_mappings pgm
            INNER JOIN projects p ON p.id = pgm.project_id
            INNER JOIN sessions s ON s.project_id = p.id
            WHERE pgm.group_id = ?1
            "#
        ))
        .bind(group_id)
        .fetch_all(self.pool())
        .await?;

        let mut tallies: HashMap<i64, DailyTally> = HashMap::new();
        for row in &rows {
            let session = SessionRow::from_row(row)?;
            if !session_covers_date(&session.start_time, &session.end_time, date) {
                continue;
            }
            let project_id: i64 = row.try_get("owner_id")?;
            let tally = tallies.entry(project_id).or_default();
            if tally.name.is_empty() {
                tally.name = row.try_get("owner_name")?;
            }
            tally.add(&session);
        }

        let mut stats: Vec<DailyProjectStats> = tallies
            .into_iter()
            .map(|(project_id, t)| DailyProjectStats {
                project_id,
                project_name: t.name,
                session_count: t.session_count,
                total_input_tokens: t.input,
                total_output_tokens: t.output,
                total_cache_creation_tokens: t.cache_creation,
                total_cache_read_tokens: t.cache_read,
                total_tokens: t.input + t.output + t.cache_creation + t.cache_read,
            })
            .collect();
        stats.sort_by(|a, b| {
            b.total_tokens
                .cmp(&a.total_tokens)
                .then_with(|| a.project_name.cmp(&b.project_name))
        });
        Ok(stats)
    }

    /// Sessions of a project running on `date`, most recent start first.
    pub async fn project_daily_sessions(
        &self,
        project_id: i64,
        date: NaiveDate,
    ) -> DbResult<Vec<SessionRow>> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM sessions s
            WHERE s.project_id = ?1
            ORDER BY julianday(s.start_time) DESC, s.id
            "#
        ))
        .bind(project_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .filter(|s| session_covers_date(&s.start_time, &s.end_time, date))
            .collect())
    }
}

fn timeline(rows: &[SessionRow], period: Period, limit: usize) -> Vec<TimeSeriesStats> {
    let spans: Vec<_> = rows.iter().map(SessionRow::span).collect();
    aggregate_periods(&spans, period, limit)
}
