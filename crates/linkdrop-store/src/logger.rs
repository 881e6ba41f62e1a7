// ABOUTME: Persisted application log with a middleware pipeline and broadcast subscribers.
// ABOUTME: Entries are transformed in registration order, prepended, persisted, and mirrored to tracing.

use std::sync::Arc;

use linkdrop_core::{AppLog, Clock, LogContext, LogLevel};
use tokio::sync::broadcast;

use crate::json_store::{JsonStore, StorageKeys, StoreError};
use crate::middleware::{LogMiddleware, apply_chain};

const SUBSCRIBER_CAPACITY: usize = 256;

/// The application log. Constructed explicitly with [`Logger::open`], which
/// loads the persisted entries, and torn down with [`Logger::close`].
pub struct Logger {
    store: JsonStore,
    key: String,
    clock: Arc<dyn Clock>,
    entries: Vec<AppLog>,
    middleware: Vec<Box<dyn LogMiddleware>>,
    events: broadcast::Sender<AppLog>,
}

impl Logger {
    /// Load persisted entries from the logs namespace. A missing or corrupt
    /// collection starts the log empty.
    pub fn open(store: JsonStore, keys: &StorageKeys, clock: Arc<dyn Clock>) -> Self {
        let loaded = store.load::<Vec<AppLog>>(&keys.logs, Vec::new());
        if loaded.used_fallback() {
            tracing::debug!("starting application log empty ({:?})", loaded.source);
        } else {
            tracing::debug!("loaded {} application log entries", loaded.value.len());
        }

        let (events, _) = broadcast::channel(SUBSCRIBER_CAPACITY);
        Self {
            store,
            key: keys.logs.clone(),
            clock,
            entries: loaded.value,
            middleware: Vec::new(),
            events,
        }
    }

    /// Build an entry, run it through the middleware chain, then commit it.
    /// A persistence failure is reported through tracing and the entry is
    /// still kept in memory; logging never fails the caller.
    pub fn log(
        &mut self,
        level: LogLevel,
        message: impl Into<String>,
        context: Option<LogContext>,
    ) -> AppLog {
        let raw = AppLog::new(level, message, context, self.clock.now());
        let entry = apply_chain(&self.middleware, raw);

        self.entries.insert(0, entry.clone());
        if let Err(e) = self.store.write(&self.key, &self.entries) {
            tracing::error!("failed to persist application log: {}", e);
        }

        mirror_to_tracing(&entry);
        // No active subscribers is fine
        let _ = self.events.send(entry.clone());

        entry
    }

    pub fn debug(&mut self, message: impl Into<String>, context: Option<LogContext>) -> AppLog {
        self.log(LogLevel::Debug, message, context)
    }

    pub fn info(&mut self, message: impl Into<String>, context: Option<LogContext>) -> AppLog {
        self.log(LogLevel::Info, message, context)
    }

    pub fn warn(&mut self, message: impl Into<String>, context: Option<LogContext>) -> AppLog {
        self.log(LogLevel::Warn, message, context)
    }

    pub fn error(&mut self, message: impl Into<String>, context: Option<LogContext>) -> AppLog {
        self.log(LogLevel::Error, message, context)
    }

    /// Append a stage to the pipeline. Stages run in registration order and
    /// cannot be removed.
    pub fn use_middleware<M>(&mut self, middleware: M)
    where
        M: LogMiddleware + 'static,
    {
        self.middleware.push(Box::new(middleware));
    }

    pub fn middleware_count(&self) -> usize {
        self.middleware.len()
    }

    /// Current entries, most recent first.
    pub fn entries(&self) -> &[AppLog] {
        &self.entries
    }

    /// Receive every entry committed after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<AppLog> {
        self.events.subscribe()
    }

    /// Empty the persisted collection and then the in-memory view. If the
    /// write fails neither is changed.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.store.write(&self.key, &Vec::<AppLog>::new())?;
        let dropped = self.entries.len();
        self.entries.clear();
        tracing::info!("cleared {} application log entries", dropped);
        Ok(())
    }

    /// Rewrite the persisted collection from memory.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.store.write(&self.key, &self.entries)
    }

    /// Flush and release the log.
    pub fn close(self) -> Result<(), StoreError> {
        self.flush()
    }
}

fn mirror_to_tracing(entry: &AppLog) {
    let context = entry
        .context
        .as_ref()
        .map(|ctx| serde_json::Value::Object(ctx.clone()).to_string())
        .unwrap_or_default();

    match entry.level {
        LogLevel::Debug => {
            tracing::debug!(target: "linkdrop::applog", id = %entry.id, context = %context, "{}", entry.message)
        }
        LogLevel::Info => {
            tracing::info!(target: "linkdrop::applog", id = %entry.id, context = %context, "{}", entry.message)
        }
        LogLevel::Warn => {
            tracing::warn!(target: "linkdrop::applog", id = %entry.id, context = %context, "{}", entry.message)
        }
        LogLevel::Error => {
            tracing::error!(target: "linkdrop::applog", id = %entry.id, context = %context, "{}", entry.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, KvBackend, MemoryBackend};
    use crate::middleware::{RedactContext, TagContext};
    use chrono::Duration;
    use linkdrop_core::{ManualClock, context_from, parse_iso};
    use serde_json::json;

    struct Harness {
        backend: Arc<MemoryBackend>,
        clock: Arc<ManualClock>,
        keys: StorageKeys,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                backend: Arc::new(MemoryBackend::new()),
                clock: Arc::new(ManualClock::new(
                    parse_iso("2024-01-01T00:00:00.000Z").unwrap(),
                )),
                keys: StorageKeys::default(),
            }
        }

        fn open(&self) -> Logger {
            Logger::open(
                JsonStore::new(self.backend.clone()),
                &self.keys,
                self.clock.clone(),
            )
        }

        fn persisted(&self) -> Vec<AppLog> {
            JsonStore::new(self.backend.clone()).read(&self.keys.logs, Vec::new())
        }
    }

    /// A backend whose writes always fail.
    struct ReadOnlyBackend;

    impl KvBackend for ReadOnlyBackend {
        fn get(&self, _key: &str) -> Result<Option<String>, BackendError> {
            Ok(None)
        }
        fn set(&self, key: &str, _value: &str) -> Result<(), BackendError> {
            Err(BackendError::InvalidKey(key.to_string()))
        }
        fn remove(&self, _key: &str) -> Result<(), BackendError> {
            Ok(())
        }
        fn keys(&self) -> Result<Vec<String>, BackendError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn log_prepends_and_persists() {
        let h = Harness::new();
        let mut logger = h.open();

        let first = logger.info("first", None);
        h.clock.advance(Duration::seconds(1));
        let second = logger.warn("second", context_from(json!({"code": "abc"})));

        assert_eq!(logger.entries().len(), 2);
        assert_eq!(logger.entries()[0].id, second.id);
        assert_eq!(logger.entries()[1].id, first.id);
        assert_eq!(second.level, LogLevel::Warn);
        assert_eq!(
            second.timestamp,
            parse_iso("2024-01-01T00:00:01.000Z").unwrap()
        );

        assert_eq!(h.persisted(), logger.entries().to_vec());
    }

    #[test]
    fn shorthands_set_levels() {
        let h = Harness::new();
        let mut logger = h.open();

        assert_eq!(logger.debug("d", None).level, LogLevel::Debug);
        assert_eq!(logger.info("i", None).level, LogLevel::Info);
        assert_eq!(logger.warn("w", None).level, LogLevel::Warn);
        assert_eq!(logger.error("e", None).level, LogLevel::Error);
    }

    #[test]
    fn open_seeds_from_persisted_entries() {
        let h = Harness::new();
        {
            let mut logger = h.open();
            logger.info("before restart", None);
            logger.close().unwrap();
        }

        let reopened = h.open();
        assert_eq!(reopened.entries().len(), 1);
        assert_eq!(reopened.entries()[0].message, "before restart");
    }

    #[test]
    fn open_with_corrupt_log_starts_empty() {
        let h = Harness::new();
        h.backend.set("am_logs", "[{broken").unwrap();

        let mut logger = h.open();
        assert!(logger.entries().is_empty());

        logger.info("recovered", None);
        assert_eq!(h.persisted().len(), 1);
    }

    #[test]
    fn middleware_runs_in_registration_order() {
        let h = Harness::new();
        let mut logger = h.open();

        logger.use_middleware(|e: &AppLog| {
            let mut next = e.clone();
            next.message = format!("A({})", next.message);
            Some(next)
        });
        logger.use_middleware(|e: &AppLog| {
            let mut next = e.clone();
            next.message = format!("B({})", next.message);
            Some(next)
        });
        assert_eq!(logger.middleware_count(), 2);

        let stored = logger.info("raw", None);
        assert_eq!(stored.message, "B(A(raw))");
        assert_eq!(h.persisted()[0].message, "B(A(raw))");
    }

    #[test]
    fn middleware_returning_none_cannot_drop_entries() {
        let h = Harness::new();
        let mut logger = h.open();
        logger.use_middleware(|_: &AppLog| None);

        logger.error("still here", None);
        assert_eq!(logger.entries().len(), 1);
        assert_eq!(logger.entries()[0].message, "still here");
    }

    #[test]
    fn middleware_only_affects_later_entries() {
        let h = Harness::new();
        let mut logger = h.open();

        logger.info("plain", None);
        logger.use_middleware(TagContext::new("session", "s-1"));
        logger.info("tagged", None);

        assert_eq!(logger.entries()[0].context_value("session"), Some(&json!("s-1")));
        assert!(logger.entries()[1].context.is_none());
    }

    #[test]
    fn builtin_middleware_compose() {
        let h = Harness::new();
        let mut logger = h.open();
        logger.use_middleware(TagContext::new("token", "abc"));
        logger.use_middleware(RedactContext::new(["token"]));

        let entry = logger.info("login", None);
        assert_eq!(entry.context_value("token"), Some(&json!("[redacted]")));
    }

    #[test]
    fn clear_empties_memory_and_storage() {
        let h = Harness::new();
        let mut logger = h.open();
        logger.info("one", None);
        logger.info("two", None);

        logger.clear().unwrap();

        assert!(logger.entries().is_empty());
        assert!(h.persisted().is_empty());
        assert_eq!(h.backend.get("am_logs").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn clear_failure_leaves_entries_in_place() {
        let mut logger = Logger::open(
            JsonStore::new(Arc::new(ReadOnlyBackend)),
            &StorageKeys::default(),
            Arc::new(ManualClock::new(parse_iso("2024-01-01T00:00:00.000Z").unwrap())),
        );

        // Logging survives the failed write
        logger.info("kept in memory", None);
        assert_eq!(logger.entries().len(), 1);

        assert!(logger.clear().is_err());
        assert_eq!(logger.entries().len(), 1);
    }

    #[test]
    fn subscribers_receive_committed_entries() {
        let h = Harness::new();
        let mut logger = h.open();
        let mut rx = logger.subscribe();

        logger.use_middleware(TagContext::new("app", "linkdrop"));
        let sent = logger.info("broadcast me", None);

        let received = rx.try_recv().unwrap();
        assert_eq!(received, sent);
        assert_eq!(received.context_value("app"), Some(&json!("linkdrop")));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn logs_do_not_touch_other_namespaces() {
        let h = Harness::new();
        let mut logger = h.open();
        logger.info("only logs", None);

        assert_eq!(h.backend.keys().unwrap(), vec!["am_logs"]);
    }
}
