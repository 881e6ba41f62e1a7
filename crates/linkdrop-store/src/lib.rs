// ABOUTME: Persistence layer for linkdrop, handling key-value storage, entities, and the app log.
// ABOUTME: Provides memory/file/SQLite backends, the JSON adapter, the URL repository, and the logger.

pub mod backend;
pub mod file;
pub mod json_store;
pub mod logger;
pub mod middleware;
pub mod repository;
pub mod sqlite;

pub use backend::{BackendError, KvBackend, MemoryBackend};
pub use file::FileBackend;
pub use json_store::{JsonStore, LoadSource, Loaded, StorageKeys, StoreError};
pub use logger::Logger;
pub use middleware::{LogMiddleware, RedactContext, TagContext, apply_chain};
pub use repository::{UpsertOutcome, UrlRepository};
pub use sqlite::SqliteBackend;
