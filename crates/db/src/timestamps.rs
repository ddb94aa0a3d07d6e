// crates/db/src/timestamps.rs
// RFC 3339 text encoding for timestamps stored in SQLite.

use crate::{DbError, DbResult};
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};

/// Millisecond precision, `Z` for UTC, original offset otherwise.
pub fn format_timestamp(ts: &DateTime<FixedOffset>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(raw: &str) -> DbResult<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw).map_err(|_| DbError::InvalidTimestamp(raw.to_string()))
}

pub(crate) fn now_timestamp() -> String {
    format_timestamp(&Utc::now().fixed_offset())
}

/// Julian day number (SQLite `julianday()`) to a UTC instant, millisecond precision.
pub(crate) fn julian_day_to_utc(jd: f64) -> Option<DateTime<Utc>> {
    const UNIX_EPOCH_JD: f64 = 2_440_587.5;
    let millis = ((jd - UNIX_EPOCH_JD) * 86_400_000.0).round();
    if !millis.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}

/// For manual `FromRow` impls.
pub(crate) fn decode_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, sqlx::Error> {
    DateTime::parse_from_rfc3339(raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}
