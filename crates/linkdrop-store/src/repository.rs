// ABOUTME: Repository for short URLs and click events built on the JSON store.
// ABOUTME: Every mutation is a full read-modify-write of its collection; newest entries come first.

use std::sync::Arc;

use linkdrop_core::{ClickEvent, Clock, NewClick, ShortUrl};

use crate::json_store::{JsonStore, StorageKeys, StoreError};

/// Length of generated short codes.
pub const GENERATED_CODE_LEN: usize = 6;

/// Whether an upsert added a record or replaced one with the same code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
}

/// Owns the URL and click namespaces of a store. Callers always receive
/// freshly deserialized copies.
pub struct UrlRepository {
    store: JsonStore,
    keys: StorageKeys,
    clock: Arc<dyn Clock>,
}

impl UrlRepository {
    pub fn new(store: JsonStore, keys: StorageKeys, clock: Arc<dyn Clock>) -> Self {
        Self { store, keys, clock }
    }

    /// All short URLs, most recently inserted first.
    pub fn list_short_urls(&self) -> Vec<ShortUrl> {
        self.store.read(&self.keys.urls, Vec::new())
    }

    /// Replace the whole URL collection.
    pub fn save_short_urls(&self, urls: &[ShortUrl]) -> Result<(), StoreError> {
        self.store.write(&self.keys.urls, urls)
    }

    /// Replace the record with the same code in place, or insert at the front.
    /// No uniqueness check happens here: a matching code is overwritten.
    pub fn upsert_short_url(&self, url: &ShortUrl) -> Result<UpsertOutcome, StoreError> {
        let outcomes = self.upsert_short_urls(std::slice::from_ref(url))?;
        Ok(outcomes[0])
    }

    /// Upsert several records with a single write. The stored order is the
    /// same as upserting them one at a time, so the last new record ends up
    /// first. Either every record is persisted or none is.
    pub fn upsert_short_urls(
        &self,
        batch: &[ShortUrl],
    ) -> Result<Vec<UpsertOutcome>, StoreError> {
        let mut urls: Vec<ShortUrl> = self.store.read_for_update(&self.keys.urls, Vec::new())?;
        let outcomes: Vec<UpsertOutcome> = batch
            .iter()
            .map(|url| match urls.iter().position(|u| u.code == url.code) {
                Some(idx) => {
                    urls[idx] = url.clone();
                    UpsertOutcome::Replaced
                }
                None => {
                    urls.insert(0, url.clone());
                    UpsertOutcome::Inserted
                }
            })
            .collect();
        self.save_short_urls(&urls)?;
        tracing::debug!("upserted {} short urls", batch.len());
        Ok(outcomes)
    }

    /// First record whose code matches exactly (codes are case-sensitive).
    pub fn find_by_code(&self, code: &str) -> Option<ShortUrl> {
        self.list_short_urls().into_iter().find(|u| u.code == code)
    }

    /// A random code over `[A-Za-z0-9_-]`. Not checked against existing codes.
    pub fn generate_code(&self) -> String {
        nanoid::nanoid!(GENERATED_CODE_LEN)
    }

    /// All clicks, most recent first.
    pub fn list_clicks(&self) -> Vec<ClickEvent> {
        self.store.read(&self.keys.clicks, Vec::new())
    }

    /// Clicks recorded for one code, most recent first.
    pub fn clicks_for(&self, code: &str) -> Vec<ClickEvent> {
        self.list_clicks()
            .into_iter()
            .filter(|c| c.code == code)
            .collect()
    }

    /// Stamp, prepend, and persist a click. The code is not checked against
    /// the URL collection.
    pub fn add_click(&self, click: NewClick) -> Result<ClickEvent, StoreError> {
        let event = click.into_event(self.clock.now());
        let mut clicks: Vec<ClickEvent> =
            self.store.read_for_update(&self.keys.clicks, Vec::new())?;
        clicks.insert(0, event.clone());
        self.store.write(&self.keys.clicks, &clicks)?;
        tracing::debug!("recorded {} click for {}", event.source, event.code);
        Ok(event)
    }
}
