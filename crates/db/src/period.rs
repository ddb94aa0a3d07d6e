// crates/db/src/period.rs
//! Period aggregation: buckets sessions into day / ISO-week / month series.
//!
//! A session contributes to every calendar day it touches, using each
//! timestamp's own offset for the day boundary. Within one bucket a session
//! is counted once, however many of its days fall inside that bucket.

use crate::DbError;
use cclog_core::TokenSummary;
use chrono::{DateTime, Datelike, Days, FixedOffset, Months, NaiveDate, Weekday};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

/// Bucket count used when the caller passes 0.
pub const DEFAULT_PERIOD_LIMIT: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Day,
    Week,
    Month,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
        }
    }

    /// Start date of the bucket containing `date`.
    ///
    /// Week buckets are keyed by ISO week (year + week number); the Monday of
    /// that week stands in for the key so keys sort chronologically.
    pub fn bucket_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Period::Day => date,
            Period::Week => {
                let iso = date.iso_week();
                NaiveDate::from_isoywd_opt(iso.year(), iso.week(), Weekday::Mon).unwrap_or(date)
            }
            Period::Month => date.with_day(1).unwrap_or(date),
        }
    }

    /// Inclusive last date of the bucket starting at `start`.
    pub fn bucket_end(&self, start: NaiveDate) -> NaiveDate {
        match self {
            Period::Day => start,
            Period::Week => start + Days::new(6),
            Period::Month => start
                .checked_add_months(Months::new(1))
                .and_then(|next| next.pred_opt())
                .unwrap_or(start),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Period::Day),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            other => Err(DbError::InvalidPeriod(other.to_string())),
        }
    }
}

/// The slice of a stored session the aggregator needs.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSpan {
    pub id: String,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    pub tokens: TokenSummary,
}

/// One bucket of a time series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesStats {
    #[ts(type = "string")]
    pub period_start: NaiveDate,
    #[ts(type = "string")]
    pub period_end: NaiveDate,
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

impl TimeSeriesStats {
    fn empty(period: Period, start: NaiveDate) -> Self {
        Self {
            period_start: start,
            period_end: period.bucket_end(start),
            session_count: 0,
            total_input_tokens: 0,
            total_output_tokens: 0,
            total_cache_creation_tokens: 0,
            total_cache_read_tokens: 0,
        }
    }

    fn add(&mut self, tokens: &TokenSummary) {
        self.session_count += 1;
        self.total_input_tokens += tokens.input_tokens as i64;
        self.total_output_tokens += tokens.output_tokens as i64;
        self.total_cache_creation_tokens += tokens.cache_creation_input_tokens as i64;
        self.total_cache_read_tokens += tokens.cache_read_input_tokens as i64;
    }
}

/// Every calendar date from `start` to `end`, inclusive, in each timestamp's
/// own offset. An inverted range yields just the start date.
pub fn date_range(start: &DateTime<FixedOffset>, end: &DateTime<FixedOffset>) -> Vec<NaiveDate> {
    let first = start.date_naive();
    let last = end.date_naive().max(first);
    first.iter_days().take_while(|d| *d <= last).collect()
}

/// Whether the session was running at some point on `date`.
pub fn session_covers_date(
    start: &DateTime<FixedOffset>,
    end: &DateTime<FixedOffset>,
    date: NaiveDate,
) -> bool {
    start.date_naive() <= date && date <= end.date_naive()
}

/// Aggregate `spans` into the most recent `limit` buckets, oldest first.
pub fn aggregate_periods(spans: &[SessionSpan], period: Period, limit: usize) -> Vec<TimeSeriesStats> {
    let limit = if limit == 0 { DEFAULT_PERIOD_LIMIT } else { limit };

    let mut buckets: BTreeMap<NaiveDate, (HashSet<&str>, TimeSeriesStats)> = BTreeMap::new();
    for span in spans {
        for date in date_range(&span.start_time, &span.end_time) {
            let key = period.bucket_start(date);
            let (seen, stats) = buckets
                .entry(key)
                .or_insert_with(|| (HashSet::new(), TimeSeriesStats::empty(period, key)));
            if seen.insert(span.id.as_str()) {
                stats.add(&span.tokens);
            }
        }
    }

    let mut series: Vec<TimeSeriesStats> = buckets
        .into_values()
        .rev()
        .take(limit)
        .map(|(_, stats)| stats)
        .collect();
    series.reverse();
    series
}
