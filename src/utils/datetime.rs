//! Date/time parsing utilities
//!
//! Graph timestamps are ISO 8601. Some payloads (and hand-built test
//! sessions) carry a bare date, which is read as the end of that day in UTC.

use crate::error::{GraphError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};

/// Parse ISO 8601 date/datetime strings
/// Supported formats:
/// - "2024-12-31" (date only, assumes end of day)
/// - "2024-12-31T23:59:59"
/// - "2024-12-31T23:59:59.1234567Z"
/// - "2024-12-31T23:59:59+00:00"
pub fn parse_iso_datetime(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    if input.len() == 10 && input.chars().nth(4) == Some('-') && input.chars().nth(7) == Some('-') {
        let date_str = format!("{}T23:59:59Z", input);
        if let Ok(dt) = DateTime::parse_from_rfc3339(&date_str) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    // Datetime without an offset is taken as UTC
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }

    Err(GraphError::invalid_argument(format!(
        "Invalid date format: '{}'. Expected ISO 8601 (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SSZ)",
        input
    )))
}

/// Check whether a deadline has passed
pub fn is_expired(expires_on: DateTime<Utc>) -> bool {
    Utc::now() > expires_on
}

/// Serde adapter for optional Graph timestamps
pub mod optional_timestamp {
    use super::parse_iso_datetime;
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if !raw.trim().is_empty() => parse_iso_datetime(&raw)
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}
