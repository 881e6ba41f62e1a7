// ABOUTME: JSON persistence adapter over a KvBackend, plus the storage key namespaces.
// ABOUTME: Reads are total (fall back on missing or corrupt data) and report where the value came from.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::backend::{BackendError, KvBackend};

/// Errors that can occur when persisting a value.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{key} could not be read, refusing to rewrite it: {reason}")]
    Unreadable { key: String, reason: String },
}

/// The three namespaces the application owns inside one store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub urls: String,
    pub clicks: String,
    pub logs: String,
}

impl StorageKeys {
    /// Keys of the form `<prefix>_urls`, `<prefix>_clicks`, `<prefix>_logs`.
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            urls: format!("{}_urls", prefix),
            clicks: format!("{}_clicks", prefix),
            logs: format!("{}_logs", prefix),
        }
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self::with_prefix("am")
    }
}

/// Where a loaded value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    /// Parsed from stored text.
    Stored,
    /// Nothing stored under the key; the fallback was used.
    Missing,
    /// Stored text did not parse; the fallback was used.
    Corrupt(String),
    /// The backend failed to read; the fallback was used.
    Unavailable(String),
}

/// A value returned by [`JsonStore::load`] together with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub value: T,
    pub source: LoadSource,
}

impl<T> Loaded<T> {
    pub fn used_fallback(&self) -> bool {
        !matches!(self.source, LoadSource::Stored)
    }
}

/// Serializes values to JSON text and keeps them in a [`KvBackend`].
/// Cloning shares the underlying backend.
#[derive(Clone)]
pub struct JsonStore {
    backend: Arc<dyn KvBackend>,
}

impl JsonStore {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn KvBackend> {
        &self.backend
    }

    /// Read the value under `key`, or `fallback` when it is absent or unreadable.
    pub fn read<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        self.load(key, fallback).value
    }

    /// Like [`read`](Self::read), but says whether the fallback was used and why.
    pub fn load<T: DeserializeOwned>(&self, key: &str, fallback: T) -> Loaded<T> {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                return Loaded {
                    value: fallback,
                    source: LoadSource::Missing,
                };
            }
            Err(e) => {
                tracing::warn!("could not read {}, using fallback: {}", key, e);
                return Loaded {
                    value: fallback,
                    source: LoadSource::Unavailable(e.to_string()),
                };
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Loaded {
                value,
                source: LoadSource::Stored,
            },
            Err(e) => {
                tracing::warn!("stored value for {} is corrupt, using fallback: {}", key, e);
                Loaded {
                    value: fallback,
                    source: LoadSource::Corrupt(e.to_string()),
                }
            }
        }
    }

    /// Read the current value ahead of a read-modify-write. A missing key
    /// yields `fallback`; corrupt or unreadable data is an error so the
    /// caller never replaces a collection it could not see.
    pub fn read_for_update<T: DeserializeOwned>(
        &self,
        key: &str,
        fallback: T,
    ) -> Result<T, StoreError> {
        let loaded = self.load(key, fallback);
        match loaded.source {
            LoadSource::Stored | LoadSource::Missing => Ok(loaded.value),
            LoadSource::Corrupt(reason) | LoadSource::Unavailable(reason) => {
                Err(StoreError::Unreadable {
                    key: key.to_string(),
                    reason,
                })
            }
        }
    }

    /// Serialize `value` and store it under `key`, replacing what was there.
    pub fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string(value)?;
        self.backend.set(key, &json)?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.backend.remove(key)?;
        Ok(())
    }
}

impl std::fmt::Debug for JsonStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonStore").finish_non_exhaustive()
    }
}
