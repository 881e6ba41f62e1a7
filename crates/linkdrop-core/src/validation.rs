// ABOUTME: Input validation for the shorten form: long URLs, validity minutes, and custom codes.
// ABOUTME: Error messages are user-facing and reported per field.

use thiserror::Error;
use url::Url;

/// Validity used when the minutes field is left blank.
pub const DEFAULT_VALIDITY_MINUTES: u32 = 30;

/// One year of minutes.
pub const MAX_VALIDITY_MINUTES: u32 = 60 * 24 * 365;

pub const MIN_CODE_LEN: usize = 3;
pub const MAX_CODE_LEN: usize = 20;

/// A single field failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Enter a valid URL")]
    InvalidUrl,

    #[error("Minutes must be an integer")]
    MinutesNotInteger,

    #[error("Minutes out of range")]
    MinutesOutOfRange,

    #[error("Code must be 3-20 chars, alnum/underscore/hyphen")]
    MalformedCode,

    #[error("Code already exists")]
    CodeTaken,
}

/// Accept any string that parses as an absolute URL. The input is returned
/// unchanged so the stored value is exactly what the user typed.
pub fn parse_long_url(input: &str) -> Result<&str, ValidationError> {
    Url::parse(input).map_err(|_| ValidationError::InvalidUrl)?;
    Ok(input)
}

/// Parse the minutes field. Blank input falls back to `default`; otherwise the
/// text must be all ASCII digits and within `1..=MAX_VALIDITY_MINUTES`.
pub fn parse_minutes(input: &str, default: u32) -> Result<u32, ValidationError> {
    if input.trim().is_empty() {
        return check_minutes_range(u64::from(default));
    }
    if !input.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::MinutesNotInteger);
    }
    // All digits: a parse failure can only mean overflow
    let value = input
        .parse::<u64>()
        .map_err(|_| ValidationError::MinutesOutOfRange)?;
    check_minutes_range(value)
}

fn check_minutes_range(value: u64) -> Result<u32, ValidationError> {
    match u32::try_from(value) {
        Ok(minutes) if (1..=MAX_VALIDITY_MINUTES).contains(&minutes) => Ok(minutes),
        _ => Err(ValidationError::MinutesOutOfRange),
    }
}

/// Parse an optional preferred code. Surrounding whitespace is trimmed and a
/// blank field means "generate one".
pub fn parse_code(input: Option<&str>) -> Result<Option<String>, ValidationError> {
    let Some(trimmed) = input.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if is_valid_code(trimmed) {
        Ok(Some(trimmed.to_string()))
    } else {
        Err(ValidationError::MalformedCode)
    }
}

/// True for 3 to 20 characters of `[A-Za-z0-9_-]`.
pub fn is_valid_code(code: &str) -> bool {
    (MIN_CODE_LEN..=MAX_CODE_LEN).contains(&code.len())
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
