//! Parsing of device timestamps.
//!
//! Kobo writes `DateCreated` as `2025-01-25T22:59:55.080` with no zone
//! designator. Such values are taken as UTC.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::SyncError;

/// Parse a record's `created_at` into a UTC instant.
///
/// Accepts RFC 3339 (`Z` or a numeric offset, optional fractional seconds)
/// and the same form without a zone designator.
pub fn parse_created_at(value: &str) -> Result<DateTime<Utc>, SyncError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SyncError::DateParse {
            value: value.to_string(),
        });
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| SyncError::DateParse {
            value: value.to_string(),
        })
}
