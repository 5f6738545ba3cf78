//! Timestamp parsing and formatting
//!
//! The API speaks ISO-8601 instants (`2019-03-06T02:34:22Z`). Configured
//! start/end times may arrive in a few looser shapes; everything is
//! normalized to epoch seconds internally and back to ISO instants on the
//! wire.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Accepted input formats, tried in order after RFC 3339.
const FALLBACK_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%d %H:%M:%S"];

/// Parse a timestamp string into epoch seconds.
pub fn iso_to_epoch_second(value: &str) -> Result<i64> {
    let trimmed = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.timestamp());
    }

    for format in FALLBACK_FORMATS {
        if format.contains("%z") {
            if let Ok(dt) = DateTime::parse_from_str(trimmed, format) {
                return Ok(dt.timestamp());
            }
        } else if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc().timestamp());
        }
    }

    // Date-only inputs mean midnight UTC
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc().timestamp());
        }
    }

    Err(Error::InvalidTimestamp {
        value: value.to_string(),
    })
}

/// Format epoch seconds as an ISO-8601 instant (`...Z`).
pub fn epoch_second_to_iso(epoch: i64) -> String {
    Utc.timestamp_opt(epoch, 0)
        .single()
        .unwrap_or_else(|| DateTime::UNIX_EPOCH)
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string()
}

/// Re-format any accepted timestamp string as an ISO-8601 instant.
pub fn to_iso_instant(value: &str) -> Result<String> {
    Ok(epoch_second_to_iso(iso_to_epoch_second(value)?))
}

/// Current wall-clock time in epoch seconds.
pub fn now_epoch_second() -> i64 {
    Utc::now().timestamp()
}
