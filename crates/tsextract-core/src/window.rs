//! Query window construction.
//!
//! A window is anchored on a reference instant read as local-equivalent time.
//! Both offsets are applied to it, and then the whole-hour timezone offset is
//! subtracted to bring each boundary back to UTC:
//!
//! ```text
//! start = format(reference + start_offset - tz_offset)
//! end   = format(reference + end_offset   - tz_offset)
//! ```
//!
//! Nothing checks that `start <= end`; inverted offsets produce an inverted
//! window.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::Serialize;

use crate::error::{ExtractError, Result};
use crate::offset::{RelativeOffset, shift_instant, unshift_instant};
use crate::parse::{format_time, parse_time};

/// Start and end bounds of a query, formatted as UTC strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryWindow {
    pub start_utc: String,
    pub end_utc: String,
}

/// Reference instant for a window: either already parsed or still formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceTime {
    Instant(NaiveDateTime),
    Formatted(String),
}

impl ReferenceTime {
    /// Resolve to an instant, parsing with `time_format` if still a string.
    pub fn resolve(&self, time_format: &str) -> Result<NaiveDateTime> {
        match self {
            ReferenceTime::Instant(t) => Ok(*t),
            ReferenceTime::Formatted(s) => parse_time(s, time_format),
        }
    }
}

impl From<NaiveDateTime> for ReferenceTime {
    fn from(t: NaiveDateTime) -> Self {
        ReferenceTime::Instant(t)
    }
}

impl From<DateTime<Utc>> for ReferenceTime {
    fn from(t: DateTime<Utc>) -> Self {
        ReferenceTime::Instant(t.naive_utc())
    }
}

impl From<&str> for ReferenceTime {
    fn from(s: &str) -> Self {
        ReferenceTime::Formatted(s.to_string())
    }
}

impl From<String> for ReferenceTime {
    fn from(s: String) -> Self {
        ReferenceTime::Formatted(s)
    }
}

/// Convert a whole-hour timezone offset into a duration.
pub fn tz_duration(tz_offset_hours: i64) -> Result<Duration> {
    Duration::try_hours(tz_offset_hours).ok_or_else(|| {
        ExtractError::OutOfRange(format!("Timezone offset {}h", tz_offset_hours))
    })
}

/// Compute the UTC start/end strings of a query window.
///
/// Offsets may be given as [`RelativeOffset`] values or as anything that
/// converts into one (`(d, h, m, s)` tuples, `[i64; 4]` arrays).
///
/// # Examples
///
/// ```
/// use tsextract_core::window::compute_endpoints;
/// use tsextract_core::parse::DEFAULT_TIME_FORMAT;
///
/// let window = compute_endpoints(
///     "2024-05-16T10:00:00Z",
///     (0, -2, 0, 0),
///     (0, 1, 0, 0),
///     0,
///     DEFAULT_TIME_FORMAT,
/// )
/// .unwrap();
///
/// assert_eq!(window.start_utc, "2024-05-16T08:00:00Z");
/// assert_eq!(window.end_utc, "2024-05-16T11:00:00Z");
/// ```
pub fn compute_endpoints(
    reference_time: impl Into<ReferenceTime>,
    start_offset: impl Into<RelativeOffset>,
    end_offset: impl Into<RelativeOffset>,
    tz_offset_hours: i64,
    time_format: &str,
) -> Result<QueryWindow> {
    let reference = reference_time.into().resolve(time_format)?;
    let start_offset = start_offset.into();
    let end_offset = end_offset.into();
    let tz = tz_duration(tz_offset_hours)?;

    let start = unshift_instant(shift_instant(reference, start_offset.to_duration())?, tz)?;
    let end = unshift_instant(shift_instant(reference, end_offset.to_duration())?, tz)?;

    Ok(QueryWindow {
        start_utc: format_time(&start, time_format)?,
        end_utc: format_time(&end, time_format)?,
    })
}

/// How far to move a formatted time in [`shift_formatted_time`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeShift {
    Hours(i64),
    Offset(RelativeOffset),
}

impl TimeShift {
    fn is_zero(&self) -> bool {
        match self {
            TimeShift::Hours(h) => *h == 0,
            TimeShift::Offset(o) => o.is_zero(),
        }
    }

    fn to_offset(self) -> RelativeOffset {
        match self {
            TimeShift::Hours(h) => RelativeOffset::from_hours(h),
            TimeShift::Offset(o) => o,
        }
    }
}

impl From<i64> for TimeShift {
    fn from(hours: i64) -> Self {
        TimeShift::Hours(hours)
    }
}

impl From<RelativeOffset> for TimeShift {
    fn from(offset: RelativeOffset) -> Self {
        TimeShift::Offset(offset)
    }
}

/// Shift a formatted time by `delta` and reformat it.
///
/// Returns the input unchanged when `delta` is absent or zero, without parsing
/// it. Used for log lines that show a window in local-equivalent time.
pub fn shift_formatted_time(
    time_string: &str,
    delta: Option<TimeShift>,
    time_format: &str,
) -> Result<String> {
    let Some(delta) = delta.filter(|d| !d.is_zero()) else {
        return Ok(time_string.to_string());
    };

    let parsed = parse_time(time_string, time_format)?;
    let shifted = shift_instant(parsed, delta.to_offset().to_duration())?;
    format_time(&shifted, time_format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::DEFAULT_TIME_FORMAT;
    use chrono::TimeZone;

    const REFERENCE: &str = "2024-05-16T10:00:00Z";

    #[test]
    fn endpoints_without_tz_offset() {
        let window =
            compute_endpoints(REFERENCE, (0, -2, 0, 0), (0, 1, 0, 0), 0, DEFAULT_TIME_FORMAT)
                .unwrap();
        assert_eq!(window.start_utc, "2024-05-16T08:00:00Z");
        assert_eq!(window.end_utc, "2024-05-16T11:00:00Z");
    }

    #[test]
    fn endpoints_with_negative_tz_offset_move_later() {
        // 10:00 at UTC-8 is 18:00 UTC.
        let window =
            compute_endpoints(REFERENCE, (0, -2, 0, 0), (0, 1, 0, 0), -8, DEFAULT_TIME_FORMAT)
                .unwrap();
        assert_eq!(window.start_utc, "2024-05-16T16:00:00Z");
        assert_eq!(window.end_utc, "2024-05-16T19:00:00Z");
    }

    #[test]
    fn endpoints_with_positive_tz_offset_move_earlier() {
        let window =
            compute_endpoints(REFERENCE, (0, -2, 0, 0), (0, 1, 0, 0), 8, DEFAULT_TIME_FORMAT)
                .unwrap();
        assert_eq!(window.start_utc, "2024-05-16T00:00:00Z");
        assert_eq!(window.end_utc, "2024-05-16T03:00:00Z");
    }

    #[test]
    fn endpoints_accept_instants_and_offsets() {
        let reference = Utc.with_ymd_and_hms(2024, 5, 16, 10, 0, 0).single().unwrap();
        let window = compute_endpoints(
            reference,
            RelativeOffset::zero(),
            RelativeOffset::from_hours(24),
            -7,
            DEFAULT_TIME_FORMAT,
        )
        .unwrap();
        assert_eq!(window.start_utc, "2024-05-16T17:00:00Z");
        assert_eq!(window.end_utc, "2024-05-17T17:00:00Z");
    }

    #[test]
    fn endpoints_cross_month_and_leap_day() {
        let window = compute_endpoints(
            "2024-02-28T20:00:00Z",
            [0, 0, 0, 0],
            [1, 0, 0, 0],
            -8,
            DEFAULT_TIME_FORMAT,
        )
        .unwrap();
        assert_eq!(window.start_utc, "2024-02-29T04:00:00Z");
        assert_eq!(window.end_utc, "2024-03-01T04:00:00Z");
    }

    #[test]
    fn inverted_offsets_are_not_rejected() {
        let window =
            compute_endpoints(REFERENCE, (0, 1, 0, 0), (0, -1, 0, 0), 0, DEFAULT_TIME_FORMAT)
                .unwrap();
        assert!(window.start_utc > window.end_utc);
    }

    #[test]
    fn endpoints_are_deterministic() {
        let a = compute_endpoints(REFERENCE, (0, -2, 0, 0), (0, 1, 0, 0), -8, DEFAULT_TIME_FORMAT)
            .unwrap();
        let b = compute_endpoints(REFERENCE, (0, -2, 0, 0), (0, 1, 0, 0), -8, DEFAULT_TIME_FORMAT)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn endpoints_use_custom_format() {
        let window = compute_endpoints(
            "2024-05-16 10:00",
            (0, 0, -30, 0),
            (0, 0, 30, 0),
            0,
            "%Y-%m-%d %H:%M",
        )
        .unwrap();
        assert_eq!(window.start_utc, "2024-05-16 09:30");
        assert_eq!(window.end_utc, "2024-05-16 10:30");
    }

    #[test]
    fn endpoints_reject_unparseable_reference() {
        let err = compute_endpoints("yesterday", (0, 0, 0, 0), (0, 1, 0, 0), 0, DEFAULT_TIME_FORMAT)
            .unwrap_err();
        assert!(matches!(err, ExtractError::ParseError(_)));
    }

    #[test]
    fn shift_none_or_zero_is_identity() {
        let s = "not even a timestamp";
        assert_eq!(shift_formatted_time(s, None, DEFAULT_TIME_FORMAT).unwrap(), s);
        assert_eq!(
            shift_formatted_time(s, Some(0.into()), DEFAULT_TIME_FORMAT).unwrap(),
            s
        );
        assert_eq!(
            shift_formatted_time(
                s,
                Some(RelativeOffset::zero().into()),
                DEFAULT_TIME_FORMAT
            )
            .unwrap(),
            s
        );
    }

    #[test]
    fn shift_integer_is_hours() {
        let shifted =
            shift_formatted_time("2024-05-16T16:00:00Z", Some((-8).into()), DEFAULT_TIME_FORMAT)
                .unwrap();
        assert_eq!(shifted, "2024-05-16T08:00:00Z");
    }

    #[test]
    fn shift_by_offset() {
        let shifted = shift_formatted_time(
            "2024-05-16T16:00:00Z",
            Some(RelativeOffset::new(1, 0, 30, 0).into()),
            DEFAULT_TIME_FORMAT,
        )
        .unwrap();
        assert_eq!(shifted, "2024-05-17T16:30:00Z");
    }
}
