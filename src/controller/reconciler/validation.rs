//! # Validation
//!
//! Parses the rotation validity of a ManagedServiceAccount.

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

/// Whole-string shape: one or more `<number><unit>` groups
static DURATION_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d+(?:ms|[smhd]))+$").expect("duration format regex is valid")
});

/// A single `<number><unit>` group
static DURATION_PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<number>\d+)(?P<unit>ms|[smhd])").expect("duration part regex is valid")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("duration string cannot be empty")]
    Empty,
    #[error("invalid duration format '{0}'. Expected <number><unit> groups (e.g., '500s', '1h30m', '8640h0m0s')")]
    Format(String),
    #[error("duration '{0}' must be greater than 0")]
    Zero(String),
    #[error("duration '{0}' is too large")]
    Overflow(String),
    #[error("duration '{0}' is shorter than one second")]
    TooShort(String),
}

/// Parse a Go-style duration string into std::time::Duration
/// Supports units: ms, s, m, h, d, combined in any order ("1h30m", "8640h0m0s")
pub fn parse_go_duration(duration_str: &str) -> Result<Duration, DurationError> {
    let trimmed = duration_str.trim();
    if trimmed.is_empty() {
        return Err(DurationError::Empty);
    }

    let lower = trimmed.to_lowercase();
    if !DURATION_FORMAT.is_match(&lower) {
        return Err(DurationError::Format(trimmed.to_string()));
    }

    let mut total_ms: u64 = 0;
    for captures in DURATION_PART.captures_iter(&lower) {
        let number: u64 = captures["number"]
            .parse()
            .map_err(|_| DurationError::Overflow(trimmed.to_string()))?;
        let unit_ms: u64 = match &captures["unit"] {
            "ms" => 1,
            "s" => 1_000,
            "m" => 60_000,
            "h" => 3_600_000,
            "d" => 86_400_000,
            _ => return Err(DurationError::Format(trimmed.to_string())),
        };
        total_ms = number
            .checked_mul(unit_ms)
            .and_then(|part| total_ms.checked_add(part))
            .ok_or_else(|| DurationError::Overflow(trimmed.to_string()))?;
    }

    if total_ms == 0 {
        return Err(DurationError::Zero(trimmed.to_string()));
    }
    // Token lifetimes are requested in whole seconds
    if total_ms < 1_000 {
        return Err(DurationError::TooShort(trimmed.to_string()));
    }

    Ok(Duration::from_millis(total_ms))
}
