// ABOUTME: Application workflows for linkdrop on top of the store: shorten, redirect, click, and stats.
// ABOUTME: Also owns environment configuration and backend selection.

pub mod app;
pub mod config;
pub mod redirect;
pub mod shorten;
pub mod stats;

pub use app::{Linkdrop, Settings};
pub use config::{BackendKind, ConfigError, LinkdropConfig};
pub use redirect::{ClickError, RedirectOutcome};
pub use shorten::{MAX_ROWS, RowErrors, ShortenError, ShortenRow};
pub use stats::{StatsReport, UrlStats};
