// ABOUTME: Transformation middleware for the application log pipeline.
// ABOUTME: Each stage may return a rewritten entry; returning None keeps the entry unchanged.

use linkdrop_core::AppLog;
use serde_json::Value;

/// A single stage in the log pipeline. Stages cannot drop an entry, only
/// rewrite it.
pub trait LogMiddleware: Send {
    fn transform(&self, entry: &AppLog) -> Option<AppLog>;
}

impl<F> LogMiddleware for F
where
    F: Fn(&AppLog) -> Option<AppLog> + Send,
{
    fn transform(&self, entry: &AppLog) -> Option<AppLog> {
        self(entry)
    }
}

/// Run `entry` through every stage in order.
pub fn apply_chain(chain: &[Box<dyn LogMiddleware>], entry: AppLog) -> AppLog {
    chain.iter().fold(entry, |current, stage| {
        stage.transform(&current).unwrap_or(current)
    })
}

/// Replaces the values of the named context keys with a mask.
#[derive(Debug, Clone)]
pub struct RedactContext {
    keys: Vec<String>,
    mask: String,
}

impl RedactContext {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            mask: "[redacted]".to_string(),
        }
    }

    pub fn with_mask(mut self, mask: impl Into<String>) -> Self {
        self.mask = mask.into();
        self
    }
}

impl LogMiddleware for RedactContext {
    fn transform(&self, entry: &AppLog) -> Option<AppLog> {
        let ctx = entry.context.as_ref()?;
        if !self.keys.iter().any(|k| ctx.contains_key(k)) {
            return None;
        }

        let mut redacted = entry.clone();
        if let Some(ctx) = redacted.context.as_mut() {
            for key in &self.keys {
                if let Some(value) = ctx.get_mut(key) {
                    *value = Value::String(self.mask.clone());
                }
            }
        }
        Some(redacted)
    }
}

/// Adds a fixed key/value pair to every entry's context, creating the context
/// if needed. Existing values under the same key are left alone.
#[derive(Debug, Clone)]
pub struct TagContext {
    key: String,
    value: Value,
}

impl TagContext {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl LogMiddleware for TagContext {
    fn transform(&self, entry: &AppLog) -> Option<AppLog> {
        if entry.context_value(&self.key).is_some() {
            return None;
        }
        let mut tagged = entry.clone();
        tagged
            .context
            .get_or_insert_with(Default::default)
            .insert(self.key.clone(), self.value.clone());
        Some(tagged)
    }
}
