// ABOUTME: ISO-8601 timestamp formatting and expiry arithmetic shared by all persisted records.
// ABOUTME: Timestamps are stored with millisecond precision and a trailing `Z`.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Format a timestamp as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn format_iso(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse any RFC 3339 timestamp and normalize it to UTC.
pub fn parse_iso(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|ts| ts.with_timezone(&Utc))
}

/// Return `base` shifted forward by `minutes`.
pub fn add_minutes(base: DateTime<Utc>, minutes: u32) -> DateTime<Utc> {
    base + Duration::minutes(i64::from(minutes))
}

/// A link is expired once `now` reaches its expiry instant.
pub fn is_expired(expires_at: &DateTime<Utc>, now: &DateTime<Utc>) -> bool {
    expires_at <= now
}

/// Serde adapter that writes `DateTime<Utc>` in the millisecond ISO form
/// and accepts any RFC 3339 string on the way back in.
pub mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_iso(ts))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_iso(&raw).map_err(serde::de::Error::custom)
    }
}
