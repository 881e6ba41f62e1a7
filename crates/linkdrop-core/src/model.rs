// ABOUTME: Defines the ShortUrl and ClickEvent records persisted by the repository.
// ABOUTME: Field names serialize in camelCase to match the stored JSON layout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::timestamp::{self, iso_millis};

/// One shortening record. `id` always equals `code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortUrl {
    pub id: String,
    pub code: String,
    pub long_url: String,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "iso_millis")]
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub custom: bool,
}

impl ShortUrl {
    /// Build a record whose expiry is `created_at + validity_minutes`.
    pub fn new(
        code: String,
        long_url: String,
        created_at: DateTime<Utc>,
        validity_minutes: u32,
        custom: bool,
    ) -> Self {
        Self {
            id: code.clone(),
            code,
            long_url,
            created_at,
            expires_at: timestamp::add_minutes(created_at, validity_minutes),
            custom,
        }
    }

    pub fn is_expired_at(&self, now: &DateTime<Utc>) -> bool {
        timestamp::is_expired(&self.expires_at, now)
    }

    /// Render the public short link under `base_url`, e.g. `http://host/r/abc123`.
    pub fn short_link(&self, base_url: &str) -> String {
        format!("{}/r/{}", base_url.trim_end_matches('/'), self.code)
    }
}

/// What triggered a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickSource {
    Redirect,
    Stats,
    Copy,
    Manual,
}

impl ClickSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClickSource::Redirect => "redirect",
            ClickSource::Stats => "stats",
            ClickSource::Copy => "copy",
            ClickSource::Manual => "manual",
        }
    }
}

impl std::fmt::Display for ClickSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ClickSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "redirect" => Ok(ClickSource::Redirect),
            "stats" => Ok(ClickSource::Stats),
            "copy" => Ok(ClickSource::Copy),
            "manual" => Ok(ClickSource::Manual),
            other => Err(format!("unknown click source: {}", other)),
        }
    }
}

/// A single traversal of a short code. `code` is not checked against the
/// URL collection and may point at a missing or expired link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickEvent {
    pub id: Ulid,
    pub code: String,
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    pub source: ClickSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo: Option<String>,
}

/// The caller-supplied part of a click; the repository fills in the id and,
/// when absent, the timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClick {
    pub code: String,
    pub source: ClickSource,
    pub timestamp: Option<DateTime<Utc>>,
    pub geo: Option<String>,
}

impl NewClick {
    pub fn new(code: impl Into<String>, source: ClickSource) -> Self {
        Self {
            code: code.into(),
            source,
            timestamp: None,
            geo: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_geo(mut self, geo: impl Into<String>) -> Self {
        self.geo = Some(geo.into());
        self
    }

    /// Materialize into a full event stamped with a fresh id.
    pub fn into_event(self, now: DateTime<Utc>) -> ClickEvent {
        ClickEvent {
            id: Ulid::new(),
            code: self.code,
            timestamp: self.timestamp.unwrap_or(now),
            source: self.source,
            geo: self.geo,
        }
    }
}
