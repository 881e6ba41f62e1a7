// ABOUTME: Defines the AppLog entry and its severity levels for the persisted application log.
// ABOUTME: Entries carry a ULID, a millisecond timestamp, a message, and an optional context map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::timestamp::iso_millis;

/// Free-form structured context attached to a log entry.
pub type LogContext = serde_json::Map<String, serde_json::Value>;

/// Severity of an application log entry, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("unknown log level: {}", s)),
        }
    }
}

/// One diagnostic entry in the application log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppLog {
    pub id: Ulid,
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<LogContext>,
}

impl AppLog {
    /// Create an entry with a fresh ULID stamped at `timestamp`.
    pub fn new(
        level: LogLevel,
        message: impl Into<String>,
        context: Option<LogContext>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Ulid::new(),
            timestamp,
            level,
            message: message.into(),
            context,
        }
    }

    /// Look up a single context value.
    pub fn context_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.context.as_ref().and_then(|ctx| ctx.get(key))
    }
}

/// Turn a `json!` value into a log context. Objects become the map itself,
/// `null` means no context, and any other value is stored under `"value"`.
pub fn context_from(value: serde_json::Value) -> Option<LogContext> {
    match value {
        serde_json::Value::Object(map) => Some(map),
        serde_json::Value::Null => None,
        other => {
            let mut map = LogContext::new();
            map.insert("value".to_string(), other);
            Some(map)
        }
    }
}
