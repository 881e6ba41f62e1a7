// ABOUTME: Core library for linkdrop, containing domain types, time handling, and validation.
// ABOUTME: This crate defines the shared data model used by the store, service, and CLI.

pub mod applog;
pub mod clock;
pub mod model;
pub mod timestamp;
pub mod validation;

pub use applog::{AppLog, LogContext, LogLevel, context_from};
pub use clock::{Clock, ManualClock, SystemClock};
pub use model::{ClickEvent, ClickSource, NewClick, ShortUrl};
pub use timestamp::{add_minutes, format_iso, is_expired, parse_iso};
pub use validation::ValidationError;
