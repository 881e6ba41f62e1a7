// ABOUTME: Builds the stats view: every short URL with its link, click count, and expiry state.
// ABOUTME: The report is serializable so the CLI can print it as JSON.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use linkdrop_core::timestamp::iso_millis;
use linkdrop_core::{ClickEvent, ShortUrl};
use serde::Serialize;

use crate::app::Linkdrop;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlStats {
    #[serde(flatten)]
    pub url: ShortUrl,
    pub short_link: String,
    pub clicks: usize,
    #[serde(with = "optional_iso", skip_serializing_if = "Option::is_none")]
    pub last_click: Option<DateTime<Utc>>,
    pub expired: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    pub urls: Vec<UrlStats>,
    pub clicks: Vec<ClickEvent>,
}

impl StatsReport {
    pub fn total_clicks(&self) -> usize {
        self.clicks.len()
    }
}

mod optional_iso {
    use super::*;
    use serde::Serializer;

    pub fn serialize<S>(ts: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match ts {
            Some(ts) => iso_millis::serialize(ts, serializer),
            None => serializer.serialize_none(),
        }
    }
}

impl Linkdrop {
    /// Snapshot of every short URL (newest first) with per-code click totals.
    /// Clicks whose code no longer matches a URL still appear in `clicks`.
    pub fn stats_report(&self) -> StatsReport {
        let urls = self.repo.list_short_urls();
        let clicks = self.repo.list_clicks();
        let now = self.clock.now();

        // Clicks are newest first, so the first one seen per code is the latest
        let mut per_code: HashMap<&str, (usize, DateTime<Utc>)> = HashMap::new();
        for click in &clicks {
            per_code
                .entry(click.code.as_str())
                .and_modify(|(count, _)| *count += 1)
                .or_insert((1, click.timestamp));
        }

        let urls = urls
            .into_iter()
            .map(|url| {
                let (count, last) = per_code
                    .get(url.code.as_str())
                    .map(|(count, last)| (*count, Some(*last)))
                    .unwrap_or((0, None));
                UrlStats {
                    short_link: url.short_link(&self.settings.base_url),
                    clicks: count,
                    last_click: last,
                    expired: url.is_expired_at(&now),
                    url,
                }
            })
            .collect();

        StatsReport { urls, clicks }
    }
}
