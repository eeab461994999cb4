//! Parsing and formatting of timestamp strings.
//!
//! All timestamps handled by this crate are naive: the default format
//! `%Y-%m-%dT%H:%M:%SZ` carries a literal `Z` rather than a parsed offset, and
//! any timezone correction is applied explicitly as a whole-hour offset.

use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{ExtractError, Result};

/// Time format used throughout: UTC, `Z`-suffixed, second precision.
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Calendar date format used in persisted file names.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a timestamp string with a strftime-style format.
///
/// Formats without a time component (e.g. `%Y-%m-%d`) resolve to midnight.
///
/// # Examples
///
/// ```
/// use tsextract_core::parse::{parse_time, DEFAULT_TIME_FORMAT};
///
/// let dt = parse_time("2024-05-16T10:00:00Z", DEFAULT_TIME_FORMAT).unwrap();
/// assert_eq!(dt.to_string(), "2024-05-16 10:00:00");
/// ```
pub fn parse_time(input: &str, format: &str) -> Result<NaiveDateTime> {
    let trimmed = input.trim();

    match NaiveDateTime::parse_from_str(trimmed, format) {
        Ok(dt) => Ok(dt),
        Err(first) => NaiveDate::parse_from_str(trimmed, format)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .ok_or_else(|| {
                ExtractError::ParseError(format!(
                    "Invalid timestamp '{}' for format '{}': {}",
                    trimmed, format, first
                ))
            }),
    }
}

/// Parse a calendar date (`YYYY-MM-DD`).
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).map_err(|e| {
        ExtractError::ParseError(format!(
            "Invalid date '{}'. Expected YYYY-MM-DD: {}",
            input.trim(),
            e
        ))
    })
}

/// Format a timestamp with a strftime-style format.
///
/// Unlike `NaiveDateTime::format(..).to_string()`, an invalid format string is
/// reported as an error instead of panicking.
pub fn format_time(dt: &NaiveDateTime, format: &str) -> Result<String> {
    let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(ExtractError::ParseError(format!(
            "Invalid time format: '{}'",
            format
        )));
    }

    let mut out = String::new();
    std::fmt::write(&mut out, format_args!("{}", dt.format_with_items(items.into_iter())))
        .map_err(|_| {
            ExtractError::ParseError(format!("Cannot format {} with '{}'", dt, format))
        })?;
    Ok(out)
}

/// Format a calendar date as `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
