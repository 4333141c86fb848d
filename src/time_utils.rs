// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.
//!
//! Field timestamps are recorded in the operating region's fixed offset
//! (no daylight saving), with millisecond precision so that strings of the
//! same offset sort chronologically.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, SecondsFormat, TimeZone, Utc};

/// Fixed offset for the operating region.
pub fn region_offset(offset_hours: i32) -> FixedOffset {
    FixedOffset::east_opt(offset_hours * 3600).unwrap_or_else(|| Utc.fix())
}

/// Current wall-clock time in the region offset.
pub fn region_now(offset_hours: i32) -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&region_offset(offset_hours))
}

/// Format a region timestamp for storage.
pub fn format_region(date: DateTime<FixedOffset>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, false)
}

/// Current region time, formatted for storage.
pub fn region_now_string(offset_hours: i32) -> String {
    format_region(region_now(offset_hours))
}

/// Parse a client-supplied RFC3339 timestamp and normalise it to the region offset.
pub fn parse_to_region(raw: &str, offset_hours: i32) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&region_offset(offset_hours)))
}

/// Start and end (exclusive) of the region's calendar day containing `now`.
pub fn region_day_bounds(now: DateTime<FixedOffset>) -> (String, String) {
    let offset = *now.offset();
    let day: NaiveDate = now.date_naive();
    let start = offset
        .from_local_datetime(&day.and_hms_opt(0, 0, 0).unwrap_or_default())
        .single()
        .unwrap_or(now);
    let end = start + chrono::Duration::days(1);
    (format_region(start), format_region(end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_now_uses_fixed_offset() {
        let now = region_now(-6);
        assert_eq!(now.offset().local_minus_utc(), -6 * 3600);
        assert!(format_region(now).ends_with("-06:00"));
    }

    #[test]
    fn test_parse_to_region_normalises_offset() {
        let parsed = parse_to_region("2025-03-01T18:00:00Z", -6).unwrap();
        assert_eq!(format_region(parsed), "2025-03-01T12:00:00.000-06:00");
    }

    #[test]
    fn test_parse_to_region_rejects_garbage() {
        assert!(parse_to_region("yesterday", -6).is_none());
    }

    #[test]
    fn test_region_day_bounds() {
        let now = parse_to_region("2025-03-01T20:30:00-06:00", -6).unwrap();
        let (start, end) = region_day_bounds(now);
        assert_eq!(start, "2025-03-01T00:00:00.000-06:00");
        assert_eq!(end, "2025-03-02T00:00:00.000-06:00");
    }
}
