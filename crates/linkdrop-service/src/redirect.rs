// ABOUTME: Redirect resolution and manual click recording for short codes.
// ABOUTME: Only a live code records a redirect click; missing and expired codes are logged.

use linkdrop_core::{ClickEvent, ClickSource, NewClick, ShortUrl, context_from};
use linkdrop_store::StoreError;
use serde_json::json;
use thiserror::Error;

use crate::app::Linkdrop;

/// What a redirect request for one code resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum RedirectOutcome {
    NotFound { code: String },
    Expired(ShortUrl),
    Redirect { url: ShortUrl, click: ClickEvent },
}

impl RedirectOutcome {
    /// The long URL to send the visitor to, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            RedirectOutcome::Redirect { url, .. } => Some(&url.long_url),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ClickError {
    #[error("unknown short code: {0}")]
    UnknownCode(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl Linkdrop {
    /// Look up `code` and decide where it goes. A redirect records exactly
    /// one click with source `redirect`; the other outcomes record none.
    pub fn resolve_redirect(&mut self, code: &str) -> Result<RedirectOutcome, StoreError> {
        let Some(url) = self.repo.find_by_code(code) else {
            self.logger.warn(
                "Redirect: code not found",
                context_from(json!({ "code": code })),
            );
            return Ok(RedirectOutcome::NotFound {
                code: code.to_string(),
            });
        };

        if url.is_expired_at(&self.clock.now()) {
            self.logger.info(
                "Redirect: code expired",
                context_from(json!({ "code": code })),
            );
            return Ok(RedirectOutcome::Expired(url));
        }

        let click = self
            .repo
            .add_click(NewClick::new(code, ClickSource::Redirect))?;
        Ok(RedirectOutcome::Redirect { url, click })
    }

    /// Record a click from somewhere other than the redirect route. The code
    /// must exist; expiry is not checked.
    pub fn record_click(
        &mut self,
        code: &str,
        source: ClickSource,
        geo: Option<String>,
    ) -> Result<ClickEvent, ClickError> {
        if self.repo.find_by_code(code).is_none() {
            return Err(ClickError::UnknownCode(code.to_string()));
        }

        let mut click = NewClick::new(code, source);
        if let Some(geo) = geo {
            click = click.with_geo(geo);
        }
        let event = self.repo.add_click(click)?;
        self.logger.debug(
            "Recorded click",
            context_from(json!({ "code": code, "source": source.as_str() })),
        );
        Ok(event)
    }
}
