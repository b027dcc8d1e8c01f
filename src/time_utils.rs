// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Current time as an RFC3339 string, used for document timestamps.
pub fn now_rfc3339() -> String {
    format_utc_rfc3339(Utc::now())
}

/// Parse a calendar date given either as `YYYY-MM-DD` or as a full RFC3339
/// timestamp (browsers tend to send `Date.toISOString()`).
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc).date_naive())
    })
}

/// Serde adapter for [`parse_calendar_date`].
pub fn deserialize_calendar_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_calendar_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {raw}")))
}

/// Optional variant of [`deserialize_calendar_date`] for patch bodies.
pub fn deserialize_optional_calendar_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| {
            parse_calendar_date(&raw)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {raw}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_date() {
        assert_eq!(
            parse_calendar_date("2025-06-01"),
            NaiveDate::from_ymd_opt(2025, 6, 1)
        );
    }

    #[test]
    fn test_parse_iso_timestamp() {
        assert_eq!(
            parse_calendar_date("2025-06-01T00:00:00.000Z"),
            NaiveDate::from_ymd_opt(2025, 6, 1)
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_calendar_date("next tuesday"), None);
    }

    #[test]
    fn test_format_uses_z_suffix() {
        let date = DateTime::from_timestamp(1_704_103_200, 0).unwrap();
        assert_eq!(format_utc_rfc3339(date), "2024-01-01T10:00:00Z");
    }
}
