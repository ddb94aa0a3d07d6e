// crates/server/src/routes/stats.rs
//! Totals across every project, plus the overall timeline and per-day group breakdown.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use cclog_db::{DailyGroupStats, TotalStats};
use chrono::NaiveDate;
use serde::Serialize;
use ts_rs::TS;

use super::{parse_date, TimeSeriesResponse, TimelineQuery};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
pub struct DailyStatsResponse {
    #[ts(type = "string")]
    pub date: NaiveDate,
    pub groups: Vec<DailyGroupStats>,
}

/// GET /api/stats/total
pub async fn total_stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<TotalStats>> {
    Ok(Json(state.db.total_stats().await?))
}

/// GET /api/stats/timeline?period=&limit=
pub async fn total_timeline(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TimelineQuery>,
) -> ApiResult<Json<TimeSeriesResponse>> {
    let (period, limit) = query.parse()?;
    let data = state.db.total_timeline(period, limit).await?;
    Ok(Json(TimeSeriesResponse { period, data }))
}

/// GET /api/stats/daily/{date} - Per-group totals, busiest first.
pub async fn daily_stats(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
) -> ApiResult<Json<DailyStatsResponse>> {
    let date = parse_date(&date)?;
    let groups = state.db.daily_group_stats(date).await?;
    Ok(Json(DailyStatsResponse { date, groups }))
}

/// Create the stats routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats/total", get(total_stats))
        .route("/stats/timeline", get(total_timeline))
        .route("/stats/daily/{date}", get(daily_stats))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{empty_app, get, seeded_app};
    use axum::http::StatusCode;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_total_stats_empty_store() {
        let (app, _state, _dir) = empty_app().await;
        let (status, json) = get(app, "/api/stats/total").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["totalSessions"], 0);
        assert_eq!(json["errorRate"], 0.0);
        assert!(json["firstSession"].is_null());
    }

    #[tokio::test]
    async fn test_total_stats() {
        let (app, _state, _dir) = seeded_app().await;
        let (_, json) = get(app, "/api/stats/total").await;
        assert_eq!(json["totalGroups"], 2);
        assert_eq!(json["totalProjects"], 2);
        assert_eq!(json["totalSessions"], 3);
        assert_eq!(json["totalInputTokens"], 1110);
        assert_eq!(json["totalOutputTokens"], 150);
    }

    #[tokio::test]
    async fn test_total_timeline_counts_spanning_session_on_both_days() {
        let (app, _state, _dir) = seeded_app().await;
        let (status, json) = get(app.clone(), "/api/stats/timeline").await;
        assert_eq!(status, StatusCode::OK);

        let days = json["data"].as_array().unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0]["periodStart"], "2026-01-20");
        assert_eq!(days[0]["sessionCount"], 2);
        assert_eq!(days[1]["periodStart"], "2026-01-21");
        assert_eq!(days[1]["sessionCount"], 2);

        // One week bucket: the spanning session counts once.
        let (_, json) = get(app, "/api/stats/timeline?period=week").await;
        let weeks = json["data"].as_array().unwrap();
        assert_eq!(weeks.len(), 1);
        assert_eq!(weeks[0]["sessionCount"], 3);
        assert_eq!(weeks[0]["totalInputTokens"], 1110);
    }

    #[tokio::test]
    async fn test_daily_stats() {
        let (app, _state, _dir) = seeded_app().await;

        let (status, json) = get(app.clone(), "/api/stats/daily/2026-01-21").await;
        assert_eq!(status, StatusCode::OK);
        let groups = json["groups"].as_array().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0]["groupName"], "-work-app");
        assert_eq!(groups[0]["totalInputTokens"], 1000);
        assert_eq!(groups[1]["groupName"], "-work-notes");

        let (_, json) = get(app.clone(), "/api/stats/daily/2026-02-01").await;
        assert_eq!(json["groups"], serde_json::json!([]));

        let (status, _) = get(app, "/api/stats/daily/2026-13-01").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
