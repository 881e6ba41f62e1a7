// ABOUTME: Configuration loading and validation for linkdrop.
// ABOUTME: Reads LINKDROP_* environment variables and opens the configured storage backend.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use linkdrop_core::validation::{DEFAULT_VALIDITY_MINUTES, MAX_VALIDITY_MINUTES};
use linkdrop_store::{BackendError, FileBackend, KvBackend, MemoryBackend, SqliteBackend};
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("LINKDROP_BACKEND must be one of file, sqlite, memory; got {0:?}")]
    InvalidBackend(String),

    #[error("LINKDROP_DEFAULT_MINUTES must be an integer between 1 and {max}; got {value:?}")]
    InvalidDefaultMinutes { value: String, max: u32 },
}

/// Which physical store holds the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// One JSON file per namespace under `<home>/store`.
    File,
    /// A single `<home>/linkdrop.db` SQLite database.
    Sqlite,
    /// Process memory; nothing is kept between runs.
    Memory,
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" | "json" => Ok(BackendKind::File),
            "sqlite" => Ok(BackendKind::Sqlite),
            "memory" | "mem" => Ok(BackendKind::Memory),
            _ => Err(ConfigError::InvalidBackend(s.to_string())),
        }
    }
}

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct LinkdropConfig {
    pub home: PathBuf,
    pub backend: BackendKind,
    pub base_url: String,
    pub default_minutes: u32,
    pub log_filter: String,
}

impl LinkdropConfig {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// Environment variables:
    /// - LINKDROP_HOME: data directory (default: ~/.linkdrop)
    /// - LINKDROP_BACKEND: file, sqlite, or memory (default: file)
    /// - LINKDROP_BASE_URL: origin for printed short links (default: http://localhost:5173)
    /// - LINKDROP_DEFAULT_MINUTES: validity when the minutes field is blank (default: 30)
    /// - LINKDROP_LOG: tracing filter when RUST_LOG is unset (default: linkdrop=info)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let home = var("LINKDROP_HOME").map(PathBuf::from).unwrap_or_else(|| {
            var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join(".linkdrop")
        });

        let backend = match var("LINKDROP_BACKEND") {
            Some(raw) => raw.parse()?,
            None => BackendKind::File,
        };

        let base_url = var("LINKDROP_BASE_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| "http://localhost:5173".to_string());

        let default_minutes = match var("LINKDROP_DEFAULT_MINUTES") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|m| (1..=MAX_VALIDITY_MINUTES).contains(m))
                .ok_or(ConfigError::InvalidDefaultMinutes {
                    value: raw,
                    max: MAX_VALIDITY_MINUTES,
                })?,
            None => DEFAULT_VALIDITY_MINUTES,
        };

        let log_filter = var("LINKDROP_LOG").unwrap_or_else(|| "linkdrop=info".to_string());

        Ok(Self {
            home,
            backend,
            base_url,
            default_minutes,
            log_filter,
        })
    }

    /// Open the configured backend, creating directories as needed.
    pub fn open_backend(&self) -> Result<Arc<dyn KvBackend>, BackendError> {
        let backend: Arc<dyn KvBackend> = match self.backend {
            BackendKind::File => Arc::new(FileBackend::open(&self.home.join("store"))?),
            BackendKind::Sqlite => Arc::new(SqliteBackend::open(&self.home.join("linkdrop.db"))?),
            BackendKind::Memory => Arc::new(MemoryBackend::new()),
        };
        tracing::debug!("opened {:?} backend under {}", self.backend, self.home.display());
        Ok(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn config_loads_defaults() {
        let config = LinkdropConfig::from_lookup(lookup(&[("HOME", "/home/tester")])).unwrap();

        assert_eq!(config.home, PathBuf::from("/home/tester/.linkdrop"));
        assert_eq!(config.backend, BackendKind::File);
        assert_eq!(config.base_url, "http://localhost:5173");
        assert_eq!(config.default_minutes, 30);
        assert_eq!(config.log_filter, "linkdrop=info");
    }

    #[test]
    fn config_reads_overrides() {
        let config = LinkdropConfig::from_lookup(lookup(&[
            ("LINKDROP_HOME", "/data/ld"),
            ("LINKDROP_BACKEND", "SQLite"),
            ("LINKDROP_BASE_URL", "https://sho.rt/"),
            ("LINKDROP_DEFAULT_MINUTES", "1440"),
            ("LINKDROP_LOG", "linkdrop=debug"),
        ]))
        .unwrap();

        assert_eq!(config.home, PathBuf::from("/data/ld"));
        assert_eq!(config.backend, BackendKind::Sqlite);
        assert_eq!(config.base_url, "https://sho.rt");
        assert_eq!(config.default_minutes, 1440);
        assert_eq!(config.log_filter, "linkdrop=debug");
    }

    #[test]
    fn config_rejects_unknown_backend() {
        let err = LinkdropConfig::from_lookup(lookup(&[("LINKDROP_BACKEND", "redis")])).unwrap_err();
        assert!(
            err.to_string().contains("LINKDROP_BACKEND"),
            "error should name the variable: {}",
            err
        );
    }

    #[test]
    fn config_rejects_out_of_range_default_minutes() {
        for bad in ["0", "525601", "soon"] {
            let result =
                LinkdropConfig::from_lookup(lookup(&[("LINKDROP_DEFAULT_MINUTES", bad)]));
            assert!(
                matches!(result, Err(ConfigError::InvalidDefaultMinutes { .. })),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = LinkdropConfig::from_lookup(lookup(&[
            ("HOME", "/home/tester"),
            ("LINKDROP_BACKEND", "  "),
            ("LINKDROP_HOME", ""),
        ]))
        .unwrap();
        assert_eq!(config.backend, BackendKind::File);
        assert_eq!(config.home, PathBuf::from("/home/tester/.linkdrop"));
    }

    #[test]
    fn open_backend_creates_storage_under_home() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().to_string_lossy().to_string();

        let file_config = LinkdropConfig::from_lookup(lookup(&[("LINKDROP_HOME", home.as_str())])).unwrap();
        let backend = file_config.open_backend().unwrap();
        backend.set("am_urls", "[]").unwrap();
        assert!(dir.path().join("store").join("am_urls.json").exists());

        let sqlite_config = LinkdropConfig::from_lookup(lookup(&[
            ("LINKDROP_HOME", home.as_str()),
            ("LINKDROP_BACKEND", "sqlite"),
        ]))
        .unwrap();
        sqlite_config.open_backend().unwrap();
        assert!(dir.path().join("linkdrop.db").exists());
    }
}
