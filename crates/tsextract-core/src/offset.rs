//! Relative time offsets.
//!
//! A [`RelativeOffset`] is a four-field delta (days, hours, minutes, seconds)
//! kept exactly as written: 90 minutes stays 90 minutes and is never folded into
//! hours. Arithmetic always goes through [`RelativeOffset::to_duration`], where a
//! day is 24 hours with no calendar adjustment.
//!
//! Statically typed arithmetic uses the `std::ops` impls below. Operands whose
//! kind is only known at runtime (for example values read from a config tree)
//! go through [`Operand`] and the checked methods, which report unsupported
//! kinds as [`ExtractError::TypeMismatch`].

use std::fmt;
use std::ops::{Add, Sub};

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, Result};
use crate::parse::{DEFAULT_TIME_FORMAT, parse_time};

/// Field names in positional order.
pub const FIELD_NAMES: [&str; 4] = ["days", "hours", "minutes", "seconds"];

/// A structured, un-normalized time delta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "OffsetRepr")]
pub struct RelativeOffset {
    days: i64,
    hours: i64,
    minutes: i64,
    seconds: i64,
}

impl RelativeOffset {
    pub const fn new(days: i64, hours: i64, minutes: i64, seconds: i64) -> Self {
        Self {
            days,
            hours,
            minutes,
            seconds,
        }
    }

    pub const fn zero() -> Self {
        Self::new(0, 0, 0, 0)
    }

    pub const fn from_days(days: i64) -> Self {
        Self::new(days, 0, 0, 0)
    }

    pub const fn from_hours(hours: i64) -> Self {
        Self::new(0, hours, 0, 0)
    }

    /// Build an offset from up to four positional values; missing trailing
    /// fields default to zero.
    pub fn from_slice(values: &[i64]) -> Result<Self> {
        if values.len() > FIELD_NAMES.len() {
            return Err(ExtractError::TypeMismatch(format!(
                "Offset takes at most 4 values (days, hours, minutes, seconds), got {}",
                values.len()
            )));
        }

        let mut fields = [0i64; 4];
        fields[..values.len()].copy_from_slice(values);
        Ok(Self::from(fields))
    }

    pub const fn days(&self) -> i64 {
        self.days
    }

    pub const fn hours(&self) -> i64 {
        self.hours
    }

    pub const fn minutes(&self) -> i64 {
        self.minutes
    }

    pub const fn seconds(&self) -> i64 {
        self.seconds
    }

    /// The four fields as `(name, value)` pairs in positional order.
    pub const fn fields(&self) -> [(&'static str, i64); 4] {
        [
            (FIELD_NAMES[0], self.days),
            (FIELD_NAMES[1], self.hours),
            (FIELD_NAMES[2], self.minutes),
            (FIELD_NAMES[3], self.seconds),
        ]
    }

    pub const fn is_zero(&self) -> bool {
        self.days == 0 && self.hours == 0 && self.minutes == 0 && self.seconds == 0
    }

    /// Total length in seconds, saturating at the `i64` bounds.
    pub fn total_seconds(&self) -> i64 {
        self.days
            .saturating_mul(86_400)
            .saturating_add(self.hours.saturating_mul(3_600))
            .saturating_add(self.minutes.saturating_mul(60))
            .saturating_add(self.seconds)
    }

    /// Exact sum of the four components at their nominal lengths.
    ///
    /// Values beyond chrono's representable range saturate to
    /// `Duration::MIN` / `Duration::MAX`.
    pub fn to_duration(&self) -> Duration {
        let total = self.total_seconds();
        Duration::try_seconds(total).unwrap_or(if total < 0 {
            Duration::MIN
        } else {
            Duration::MAX
        })
    }

    /// Like [`to_duration`](Self::to_duration), but totals outside chrono's
    /// range are [`ExtractError::OutOfRange`] instead of saturating.
    pub fn checked_duration(&self) -> Result<Duration> {
        let out_of_range = || ExtractError::OutOfRange(format!("Offset {} is too large", self));
        let total = self
            .days
            .checked_mul(86_400)
            .and_then(|t| t.checked_add(self.hours.checked_mul(3_600)?))
            .and_then(|t| t.checked_add(self.minutes.checked_mul(60)?))
            .and_then(|t| t.checked_add(self.seconds))
            .ok_or_else(out_of_range)?;
        Duration::try_seconds(total).ok_or_else(out_of_range)
    }

    /// `self + other` for an operand whose kind is known only at runtime.
    ///
    /// A formatted string is parsed with [`DEFAULT_TIME_FORMAT`], never with a
    /// caller-supplied format.
    pub fn checked_add(&self, other: &Operand) -> Result<Moment> {
        let own = self.checked_duration()?;
        match other {
            Operand::Duration(d) => add_durations(own, *d).map(Moment::Duration),
            Operand::Formatted(s) => {
                let instant = parse_time(s, DEFAULT_TIME_FORMAT)?;
                shift_instant(instant, own).map(Moment::Instant)
            }
            Operand::Instant(t) => shift_instant(*t, own).map(Moment::Instant),
            Operand::Offset(o) => add_durations(own, o.checked_duration()?).map(Moment::Duration),
        }
    }

    /// `self - other` for an operand whose kind is known only at runtime.
    ///
    /// Timestamp operands (instants and formatted strings) are shifted back by
    /// this offset, so `offset - instant` yields `instant - offset`.
    pub fn checked_sub(&self, other: &Operand) -> Result<Moment> {
        let own = self.checked_duration()?;
        match other {
            Operand::Duration(d) => sub_durations(own, *d).map(Moment::Duration),
            Operand::Formatted(s) => {
                let instant = parse_time(s, DEFAULT_TIME_FORMAT)?;
                unshift_instant(instant, own).map(Moment::Instant)
            }
            Operand::Instant(t) => unshift_instant(*t, own).map(Moment::Instant),
            Operand::Offset(o) => sub_durations(own, o.checked_duration()?).map(Moment::Duration),
        }
    }

    /// `other - self`: the reflected form of [`checked_sub`](Self::checked_sub).
    pub fn checked_rsub(&self, other: &Operand) -> Result<Moment> {
        let own = self.checked_duration()?;
        match other {
            Operand::Duration(d) => sub_durations(*d, own).map(Moment::Duration),
            Operand::Formatted(s) => {
                let instant = parse_time(s, DEFAULT_TIME_FORMAT)?;
                unshift_instant(instant, own).map(Moment::Instant)
            }
            Operand::Instant(t) => unshift_instant(*t, own).map(Moment::Instant),
            Operand::Offset(o) => sub_durations(o.checked_duration()?, own).map(Moment::Duration),
        }
    }
}

impl fmt::Display for RelativeOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}d{}h{}m{}s",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

impl From<(i64, i64, i64, i64)> for RelativeOffset {
    fn from((days, hours, minutes, seconds): (i64, i64, i64, i64)) -> Self {
        Self::new(days, hours, minutes, seconds)
    }
}

impl From<[i64; 4]> for RelativeOffset {
    fn from([days, hours, minutes, seconds]: [i64; 4]) -> Self {
        Self::new(days, hours, minutes, seconds)
    }
}

impl TryFrom<&[i64]> for RelativeOffset {
    type Error = ExtractError;

    fn try_from(values: &[i64]) -> Result<Self> {
        Self::from_slice(values)
    }
}

/// Accepted config shapes: a field map or a positional list.
#[derive(Deserialize)]
#[serde(untagged)]
enum OffsetRepr {
    Fields {
        #[serde(default)]
        days: i64,
        #[serde(default)]
        hours: i64,
        #[serde(default)]
        minutes: i64,
        #[serde(default)]
        seconds: i64,
    },
    List(Vec<i64>),
}

impl TryFrom<OffsetRepr> for RelativeOffset {
    type Error = String;

    fn try_from(repr: OffsetRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            OffsetRepr::Fields {
                days,
                hours,
                minutes,
                seconds,
            } => Ok(Self::new(days, hours, minutes, seconds)),
            OffsetRepr::List(values) => Self::from_slice(&values).map_err(|e| e.to_string()),
        }
    }
}

/// The right-hand side of a runtime-typed offset operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Duration(Duration),
    /// A timestamp string in [`DEFAULT_TIME_FORMAT`].
    Formatted(String),
    Instant(NaiveDateTime),
    Offset(RelativeOffset),
}

impl From<Duration> for Operand {
    fn from(d: Duration) -> Self {
        Operand::Duration(d)
    }
}

impl From<&str> for Operand {
    fn from(s: &str) -> Self {
        Operand::Formatted(s.to_string())
    }
}

impl From<NaiveDateTime> for Operand {
    fn from(t: NaiveDateTime) -> Self {
        Operand::Instant(t)
    }
}

impl From<DateTime<Utc>> for Operand {
    fn from(t: DateTime<Utc>) -> Self {
        Operand::Instant(t.naive_utc())
    }
}

impl From<RelativeOffset> for Operand {
    fn from(o: RelativeOffset) -> Self {
        Operand::Offset(o)
    }
}

impl TryFrom<&serde_json::Value> for Operand {
    type Error = ExtractError;

    /// Strings become formatted timestamps and objects become offsets;
    /// every other JSON kind is a [`ExtractError::TypeMismatch`].
    fn try_from(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::String(s) => Ok(Operand::Formatted(s.clone())),
            serde_json::Value::Object(_) => RelativeOffset::deserialize(value)
                .map(Operand::Offset)
                .map_err(|e| ExtractError::TypeMismatch(format!("Invalid offset object: {}", e))),
            other => Err(ExtractError::TypeMismatch(format!(
                "Unsupported operand for offset arithmetic: {}",
                json_kind(other)
            ))),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Result of a runtime-typed offset operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Moment {
    Duration(Duration),
    Instant(NaiveDateTime),
}

impl Moment {
    pub fn as_instant(&self) -> Option<NaiveDateTime> {
        match self {
            Moment::Instant(t) => Some(*t),
            Moment::Duration(_) => None,
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Moment::Duration(d) => Some(*d),
            Moment::Instant(_) => None,
        }
    }
}

fn add_durations(a: Duration, b: Duration) -> Result<Duration> {
    a.checked_add(&b)
        .ok_or_else(|| ExtractError::OutOfRange(format!("{} + {}", a, b)))
}

fn sub_durations(a: Duration, b: Duration) -> Result<Duration> {
    a.checked_sub(&b)
        .ok_or_else(|| ExtractError::OutOfRange(format!("{} - {}", a, b)))
}

pub(crate) fn shift_instant(t: NaiveDateTime, d: Duration) -> Result<NaiveDateTime> {
    t.checked_add_signed(d)
        .ok_or_else(|| ExtractError::OutOfRange(format!("{} + {}", t, d)))
}

pub(crate) fn unshift_instant(t: NaiveDateTime, d: Duration) -> Result<NaiveDateTime> {
    t.checked_sub_signed(d)
        .ok_or_else(|| ExtractError::OutOfRange(format!("{} - {}", t, d)))
}

// Operator impls panic on overflow, like chrono's own.

impl Add for RelativeOffset {
    type Output = Duration;

    fn add(self, rhs: RelativeOffset) -> Duration {
        self.to_duration() + rhs.to_duration()
    }
}

impl Sub for RelativeOffset {
    type Output = Duration;

    fn sub(self, rhs: RelativeOffset) -> Duration {
        self.to_duration() - rhs.to_duration()
    }
}

impl Add<Duration> for RelativeOffset {
    type Output = Duration;

    fn add(self, rhs: Duration) -> Duration {
        self.to_duration() + rhs
    }
}

impl Add<RelativeOffset> for Duration {
    type Output = Duration;

    fn add(self, rhs: RelativeOffset) -> Duration {
        self + rhs.to_duration()
    }
}

impl Sub<Duration> for RelativeOffset {
    type Output = Duration;

    fn sub(self, rhs: Duration) -> Duration {
        self.to_duration() - rhs
    }
}

impl Sub<RelativeOffset> for Duration {
    type Output = Duration;

    fn sub(self, rhs: RelativeOffset) -> Duration {
        self - rhs.to_duration()
    }
}

impl Add<NaiveDateTime> for RelativeOffset {
    type Output = NaiveDateTime;

    fn add(self, rhs: NaiveDateTime) -> NaiveDateTime {
        rhs + self.to_duration()
    }
}

impl Add<RelativeOffset> for NaiveDateTime {
    type Output = NaiveDateTime;

    fn add(self, rhs: RelativeOffset) -> NaiveDateTime {
        self + rhs.to_duration()
    }
}

impl Sub<RelativeOffset> for NaiveDateTime {
    type Output = NaiveDateTime;

    fn sub(self, rhs: RelativeOffset) -> NaiveDateTime {
        self - rhs.to_duration()
    }
}

impl Add<DateTime<Utc>> for RelativeOffset {
    type Output = DateTime<Utc>;

    fn add(self, rhs: DateTime<Utc>) -> DateTime<Utc> {
        rhs + self.to_duration()
    }
}

impl Add<RelativeOffset> for DateTime<Utc> {
    type Output = DateTime<Utc>;

    fn add(self, rhs: RelativeOffset) -> DateTime<Utc> {
        self + rhs.to_duration()
    }
}

impl Sub<RelativeOffset> for DateTime<Utc> {
    type Output = DateTime<Utc>;

    fn sub(self, rhs: RelativeOffset) -> DateTime<Utc> {
        self - rhs.to_duration()
    }
}
