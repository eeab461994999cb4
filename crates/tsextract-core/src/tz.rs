//! Timezone helpers.
//!
//! Windows take a whole-hour offset rather than a zone. These functions derive
//! that offset from an IANA zone for a given instant so callers do not need a
//! hand-maintained transition table when a zone name is available.

use chrono::{NaiveDateTime, Offset, TimeZone};
use chrono_tz::Tz;

use crate::error::{ExtractError, Result};

/// Parse an IANA timezone name into a [`chrono_tz::Tz`].
///
/// # Examples
///
/// ```
/// use tsextract_core::tz::parse_tz;
///
/// let tz = parse_tz("America/Los_Angeles").unwrap();
/// assert_eq!(tz.to_string(), "America/Los_Angeles");
/// ```
pub fn parse_tz(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| ExtractError::ParseError(format!("Invalid timezone: {}", name)))
}

/// Whole-hour UTC offset of `tz` at a UTC instant.
///
/// Sub-hour offsets (e.g. `Asia/Kolkata`) are truncated toward zero.
pub fn offset_hours_at_utc(tz: Tz, utc: NaiveDateTime) -> i64 {
    let seconds = tz.offset_from_utc_datetime(&utc).fix().local_minus_utc();
    i64::from(seconds / 3600)
}

/// Whole-hour UTC offset of `tz` at a local wall-clock time.
///
/// Ambiguous times (fall back) take the earlier offset. Nonexistent times
/// (spring forward) take the offset in effect at the same UTC reading.
pub fn offset_hours_at_local(tz: Tz, local: NaiveDateTime) -> i64 {
    let seconds = match tz.offset_from_local_datetime(&local).earliest() {
        Some(offset) => offset.fix().local_minus_utc(),
        None => tz.offset_from_utc_datetime(&local).fix().local_minus_utc(),
    };
    i64::from(seconds / 3600)
}
