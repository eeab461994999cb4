//! Fixed-step timestamp sequences for batch backfill.
//!
//! [`DateSequence`] walks from a start instant to an inclusive end instant in
//! steps of a fixed duration, yielding each instant formatted as a string.
//!
//! # Hazard
//!
//! The step is not validated. With a zero or negative step the sequence never
//! passes the end bound, so it is unbounded: iterate it lazily with `take`, or
//! do not collect it. [`generate`] collects and will not return in that case.
//! The walk only ends early if an instant leaves chrono's representable range.

use chrono::{Duration, NaiveDateTime};

use crate::error::Result;
use crate::parse::{format_time, parse_time};

/// Lazy, restartable sequence of formatted instants.
#[derive(Debug, Clone)]
pub struct DateSequence {
    next: Option<NaiveDateTime>,
    end: NaiveDateTime,
    step: Duration,
    format: String,
}

impl DateSequence {
    /// Parse both bounds with `format` and prepare the walk.
    pub fn new(start: &str, end: &str, step: Duration, format: &str) -> Result<Self> {
        let start = parse_time(start, format)?;
        let end = parse_time(end, format)?;
        // Reject unusable formats up front rather than on the first item.
        format_time(&start, format)?;

        Ok(Self::from_instants(start, end, step, format))
    }

    pub fn from_instants(
        start: NaiveDateTime,
        end: NaiveDateTime,
        step: Duration,
        format: &str,
    ) -> Self {
        Self {
            next: Some(start),
            end,
            step,
            format: format.to_string(),
        }
    }

    /// Iterate the raw instants instead of their formatted form.
    pub fn instants(self) -> impl Iterator<Item = NaiveDateTime> {
        let end = self.end;
        let step = self.step;
        std::iter::successors(self.next, move |current| current.checked_add_signed(step))
            .take_while(move |current| *current <= end)
    }
}

impl Iterator for DateSequence {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let current = self.next.filter(|current| *current <= self.end)?;
        self.next = current.checked_add_signed(self.step);
        // The format was validated by `new`; `from_instants` callers pass a
        // format they already use.
        format_time(&current, &self.format).ok()
    }
}

/// Collect every formatted instant from `start_date` to `end_date` inclusive.
///
/// See the module-level hazard note: `delta` must be positive.
///
/// # Examples
///
/// ```
/// use chrono::Duration;
/// use tsextract_core::sequence::generate;
/// use tsextract_core::parse::DEFAULT_TIME_FORMAT;
///
/// let days = generate(
///     "2024-02-01T00:00:00Z",
///     "2024-02-03T00:00:00Z",
///     Duration::days(1),
///     DEFAULT_TIME_FORMAT,
/// )
/// .unwrap();
///
/// assert_eq!(days.len(), 3);
/// ```
pub fn generate(
    start_date: &str,
    end_date: &str,
    delta: Duration,
    format: &str,
) -> Result<Vec<String>> {
    Ok(DateSequence::new(start_date, end_date, delta, format)?.collect())
}
