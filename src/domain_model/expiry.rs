//! Parsing of human-friendly expiry strings such as `"15m"`, `"7 Days"` or
//! `"60"` into whole seconds.
//!
//! Accepted grammar: `<digits>[<whitespace>][<unit>]`, surrounding whitespace
//! ignored. Units are matched case-insensitively; a missing unit means
//! seconds. Results are floor-rounded, so `"1500ms"` is one second.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpiryError {
    #[error("invalid duration format: {0:?}")]
    InvalidDurationFormat(String),
    #[error("unsupported time unit: {0:?}")]
    UnsupportedUnit(String),
}

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;
const YEAR: u64 = 365 * DAY;

/// Seconds per unit as a `(numerator, denominator)` pair.
fn unit_scale(unit: &str) -> Option<(u64, u64)> {
    let scale = match unit {
        "ms" | "millisecond" | "milliseconds" | "msec" | "msecs" => (1, 1000),
        "s" | "sec" | "secs" | "second" | "seconds" => (1, 1),
        "m" | "min" | "mins" | "minute" | "minutes" => (MINUTE, 1),
        "h" | "hr" | "hrs" | "hour" | "hours" => (HOUR, 1),
        "d" | "day" | "days" => (DAY, 1),
        "w" | "week" | "weeks" => (WEEK, 1),
        "y" | "yr" | "yrs" | "year" | "years" => (YEAR, 1),
        _ => return None,
    };
    Some(scale)
}

pub fn parse_expiry_secs(input: &str) -> Result<u64, ExpiryError> {
    let invalid = || ExpiryError::InvalidDurationFormat(input.to_string());

    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, rest) = trimmed.split_at(split);
    if digits.is_empty() {
        return Err(invalid());
    }

    let unit = rest.trim_start();
    if !unit.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid());
    }

    let value: u64 = digits.parse().map_err(|_| invalid())?;
    let unit = if unit.is_empty() {
        "s".to_string()
    } else {
        unit.to_ascii_lowercase()
    };
    let (numerator, denominator) =
        unit_scale(&unit).ok_or_else(|| ExpiryError::UnsupportedUnit(unit.clone()))?;

    value
        .checked_mul(numerator)
        .map(|v| v / denominator)
        .ok_or_else(invalid)
}
