//! Feed timestamp normalization and day-window helpers.
//!
//! Upstream feeds are inconsistent about timezone qualifiers: the GPS and
//! payroll providers both emit instants that are UTC wall-clock values with
//! the qualifier dropped. The convention here is strict: a zone-qualified
//! timestamp is honored, an unqualified one is interpreted as UTC. Getting
//! this wrong systematically shifts every arrival judgment, so all feed
//! times funnel through [`parse_feed_timestamp`].

use anyhow::{bail, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::api::TimeWindow;

/// Parse a feed timestamp string into a UTC instant.
///
/// Accepted formats, in order:
/// 1. RFC 3339 with zone qualifier (`2024-03-04T08:00:00-05:00`)
/// 2. Naive `%Y-%m-%d %H:%M:%S` (with optional fractional seconds),
///    interpreted as UTC
/// 3. Naive `%Y-%m-%dT%H:%M:%S` (with optional fractional seconds),
///    interpreted as UTC
pub fn parse_feed_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("empty timestamp");
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
        }
    }

    bail!("unparseable timestamp: {trimmed:?}");
}

/// The UTC calendar-day window `[00:00, next 00:00)` for a date.
pub fn utc_day_window(date: NaiveDate) -> TimeWindow {
    let start = DateTime::<Utc>::from_naive_utc_and_offset(date.and_time(NaiveTime::MIN), Utc);
    TimeWindow {
        start,
        end: start + chrono::Duration::days(1),
    }
}

/// Signed whole minutes from `from` to `to`, truncated toward zero.
///
/// Variance arithmetic uses whole minutes: a 7.5-minute overshoot reports
/// as 7.
pub fn whole_minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_minutes()
}
