// ABOUTME: The linkdrop application object bundling the repository, the app log, and the clock.
// ABOUTME: Constructed explicitly from a backend or a config and closed to flush the log.

use std::sync::Arc;

use linkdrop_core::{Clock, SystemClock};
use linkdrop_store::{
    BackendError, JsonStore, KvBackend, Logger, StorageKeys, StoreError, UrlRepository,
};

use crate::config::LinkdropConfig;

/// Settings the workflows need beyond storage.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub default_minutes: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5173".to_string(),
            default_minutes: linkdrop_core::validation::DEFAULT_VALIDITY_MINUTES,
        }
    }
}

impl From<&LinkdropConfig> for Settings {
    fn from(config: &LinkdropConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            default_minutes: config.default_minutes,
        }
    }
}

/// One open linkdrop instance. The repository and the logger share the same
/// backend but own disjoint keys.
pub struct Linkdrop {
    pub(crate) repo: UrlRepository,
    pub(crate) logger: Logger,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) settings: Settings,
}

impl Linkdrop {
    /// Open over an existing backend, loading the persisted application log.
    pub fn open(backend: Arc<dyn KvBackend>, clock: Arc<dyn Clock>, settings: Settings) -> Self {
        let store = JsonStore::new(backend);
        let keys = StorageKeys::default();
        let repo = UrlRepository::new(store.clone(), keys.clone(), Arc::clone(&clock));
        let logger = Logger::open(store, &keys, Arc::clone(&clock));
        Self {
            repo,
            logger,
            clock,
            settings,
        }
    }

    /// Open the backend named by `config`, using the wall clock.
    pub fn from_config(config: &LinkdropConfig) -> Result<Self, BackendError> {
        let backend = config.open_backend()?;
        Ok(Self::open(backend, Arc::new(SystemClock), Settings::from(config)))
    }

    pub fn repo(&self) -> &UrlRepository {
        &self.repo
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn logger_mut(&mut self) -> &mut Logger {
        &mut self.logger
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Flush the application log and release everything.
    pub fn close(self) -> Result<(), StoreError> {
        self.logger.close()
    }
}
