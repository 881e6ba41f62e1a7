// ABOUTME: The shorten workflow: validate up to five rows, then create one ShortUrl per row.
// ABOUTME: Code uniqueness is enforced here; any invalid row rejects the whole batch.

use std::collections::HashSet;

use linkdrop_core::validation::{self, ValidationError};
use linkdrop_core::{ShortUrl, context_from};
use linkdrop_store::StoreError;
use serde_json::json;
use thiserror::Error;

use crate::app::Linkdrop;

/// Maximum rows accepted by one shorten request.
pub const MAX_ROWS: usize = 5;

/// Attempts at drawing an unused generated code before giving up.
const MAX_GENERATE_ATTEMPTS: usize = 16;

/// One row of the shorten form, exactly as entered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShortenRow {
    pub long_url: String,
    pub minutes: String,
    pub code: String,
}

impl ShortenRow {
    pub fn new(long_url: impl Into<String>) -> Self {
        Self {
            long_url: long_url.into(),
            ..Self::default()
        }
    }

    pub fn minutes(mut self, minutes: impl Into<String>) -> Self {
        self.minutes = minutes.into();
        self
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }
}

/// Per-field problems found in one row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowErrors {
    pub url: Option<ValidationError>,
    pub minutes: Option<ValidationError>,
    pub code: Option<ValidationError>,
}

impl RowErrors {
    pub fn is_empty(&self) -> bool {
        self.url.is_none() && self.minutes.is_none() && self.code.is_none()
    }
}

/// Errors that can occur when creating short URLs.
#[derive(Debug, Error)]
pub enum ShortenError {
    #[error("no rows to create")]
    NoRows,

    #[error("at most {max} rows can be shortened at once, got {got}")]
    TooManyRows { max: usize, got: usize },

    #[error("{} of {} rows failed validation", failed_rows(.0), .0.len())]
    Invalid(Vec<RowErrors>),

    #[error("could not find an unused code after {0} attempts")]
    CodesExhausted(usize),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

fn failed_rows(errors: &[RowErrors]) -> usize {
    errors.iter().filter(|e| !e.is_empty()).count()
}

/// A row that passed validation.
struct ValidRow<'a> {
    long_url: &'a str,
    minutes: u32,
    code: Option<String>,
}

impl Linkdrop {
    /// Check every row without writing anything. The result has one entry per
    /// input row. A code is taken if it already exists in the repository or
    /// appears in an earlier row of the same batch.
    pub fn validate_rows(&self, rows: &[ShortenRow]) -> Vec<RowErrors> {
        self.check_rows(rows)
            .into_iter()
            .map(|checked| checked.err().unwrap_or_default())
            .collect()
    }

    fn check_rows<'a>(&self, rows: &'a [ShortenRow]) -> Vec<Result<ValidRow<'a>, RowErrors>> {
        let mut batch_codes = HashSet::new();

        rows.iter()
            .map(|row| {
                let long_url = validation::parse_long_url(&row.long_url);
                let minutes = validation::parse_minutes(&row.minutes, self.settings.default_minutes);
                let code = validation::parse_code(Some(&row.code)).and_then(|code| match code {
                    Some(code)
                        if self.repo.find_by_code(&code).is_some()
                            || !batch_codes.insert(code.clone()) =>
                    {
                        Err(ValidationError::CodeTaken)
                    }
                    other => Ok(other),
                });

                match (long_url, minutes, code) {
                    (Ok(long_url), Ok(minutes), Ok(code)) => Ok(ValidRow {
                        long_url,
                        minutes,
                        code,
                    }),
                    (long_url, minutes, code) => Err(RowErrors {
                        url: long_url.err(),
                        minutes: minutes.err(),
                        code: code.err(),
                    }),
                }
            })
            .collect()
    }

    /// Validate every row and, only if all pass, create and persist one
    /// ShortUrl per row. Returns the created records in row order.
    pub fn shorten(&mut self, rows: &[ShortenRow]) -> Result<Vec<ShortUrl>, ShortenError> {
        if rows.is_empty() {
            return Err(ShortenError::NoRows);
        }
        if rows.len() > MAX_ROWS {
            return Err(ShortenError::TooManyRows {
                max: MAX_ROWS,
                got: rows.len(),
            });
        }

        let checked = self.check_rows(rows);
        if checked.iter().any(Result::is_err) {
            let errors: Vec<RowErrors> = checked
                .into_iter()
                .map(|c| c.err().unwrap_or_default())
                .collect();
            self.logger.debug(
                "Rejected shorten request",
                context_from(json!({ "rows": rows.len(), "invalid": failed_rows(&errors) })),
            );
            return Err(ShortenError::Invalid(errors));
        }

        let valid: Vec<ValidRow<'_>> = checked.into_iter().filter_map(Result::ok).collect();
        let mut taken: HashSet<String> = valid.iter().filter_map(|r| r.code.clone()).collect();

        let mut created = Vec::with_capacity(valid.len());
        for row in valid {
            let custom = row.code.is_some();
            let code = match row.code {
                Some(code) => code,
                None => self.unused_code(&taken)?,
            };
            taken.insert(code.clone());

            created.push(ShortUrl::new(
                code,
                row.long_url.to_string(),
                self.clock.now(),
                row.minutes,
                custom,
            ));
        }

        // One write for the whole batch
        self.repo.upsert_short_urls(&created)?;

        self.logger.info(
            "Created short URLs",
            context_from(json!({ "count": created.len() })),
        );
        Ok(created)
    }

    fn unused_code(&self, taken: &HashSet<String>) -> Result<String, ShortenError> {
        for _ in 0..MAX_GENERATE_ATTEMPTS {
            let code = self.repo.generate_code();
            if !taken.contains(&code) && self.repo.find_by_code(&code).is_none() {
                return Ok(code);
            }
            tracing::debug!("generated code {} already in use, retrying", code);
        }
        Err(ShortenError::CodesExhausted(MAX_GENERATE_ATTEMPTS))
    }
}
