//! Timestamp parsing and formatting shared by the store, resolver and OCR reader

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeDelta, Utc};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

/// Parse an ISO-8601 timestamp as stored in the event log or broadcast index.
///
/// Values with an offset are converted to UTC; naive values are taken as UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(Error::Timestamp(value.to_string()))
}

/// Format a timestamp the way SQLite date functions accept it
pub fn to_sql_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Signed seconds of a delta as a float (millisecond precision)
pub fn delta_secs(delta: TimeDelta) -> f64 {
    delta.num_milliseconds() as f64 / 1000.0
}

/// Build a delta from fractional seconds (millisecond precision)
pub fn secs_delta(secs: f64) -> TimeDelta {
    TimeDelta::milliseconds((secs * 1000.0).round() as i64)
}

/// Render an offset as `1h2m3s`, the form video players accept in `?t=`
pub fn format_offset(offset: TimeDelta) -> String {
    let total = offset.num_seconds().max(0);
    let (minutes, seconds) = (total / 60, total % 60);
    let (hours, minutes) = (minutes / 60, minutes % 60);
    format!("{}h{}m{}s", hours, minutes, seconds)
}
