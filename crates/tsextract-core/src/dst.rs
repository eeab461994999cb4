//! Daylight-saving offset selection from a per-year transition table.
//!
//! Each [`DstRule`] names the two transition instants of one year. An instant
//! strictly between them gets the daylight offset; anything else, including an
//! instant exactly on either transition, gets the standard offset.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Transition instants and offsets for a single year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DstRule {
    pub year: i32,
    /// Daylight time begins (exclusive).
    pub start: NaiveDateTime,
    /// Daylight time ends (exclusive).
    pub end: NaiveDateTime,
    #[serde(default = "default_standard_offset")]
    pub standard_offset: i64,
    #[serde(default = "default_daylight_offset")]
    pub daylight_offset: i64,
}

fn default_standard_offset() -> i64 {
    -8
}

fn default_daylight_offset() -> i64 {
    -7
}

impl DstRule {
    /// US Pacific time for 2024: 2024-03-10 02:00 to 2024-11-03 01:00.
    pub fn pacific_2024() -> Self {
        Self {
            year: 2024,
            start: naive(2024, 3, 10, 2),
            end: naive(2024, 11, 3, 1),
            standard_offset: default_standard_offset(),
            daylight_offset: default_daylight_offset(),
        }
    }

    /// Both transitions fall in `year` and daylight time starts first.
    pub fn is_consistent(&self) -> bool {
        self.start.year() == self.year && self.end.year() == self.year && self.start < self.end
    }

    pub fn is_daylight(&self, instant: NaiveDateTime) -> bool {
        instant > self.start && instant < self.end
    }

    pub fn offset_for(&self, instant: NaiveDateTime) -> i64 {
        if self.is_daylight(instant) {
            self.daylight_offset
        } else {
            self.standard_offset
        }
    }
}

// Only called with constant, valid calendar values.
fn naive(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .unwrap_or(NaiveDateTime::MIN)
}

/// DST rules keyed by year, with an offset for years the table does not cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DstTable {
    rules: BTreeMap<i32, DstRule>,
    fallback_offset: i64,
}

impl DstTable {
    /// Rules whose transitions are not both in their `year`, or whose start is
    /// not before their end, are skipped with a warning.
    pub fn new(rules: impl IntoIterator<Item = DstRule>, fallback_offset: i64) -> Self {
        let rules = rules
            .into_iter()
            .filter(|rule| {
                let consistent = rule.is_consistent();
                if !consistent {
                    warn!(
                        year = rule.year,
                        start = %rule.start,
                        end = %rule.end,
                        "Ignoring DST rule with transitions outside its year"
                    );
                }
                consistent
            })
            .map(|rule| (rule.year, rule))
            .collect();
        Self {
            rules,
            fallback_offset,
        }
    }

    pub fn rule_for_year(&self, year: i32) -> Option<&DstRule> {
        self.rules.get(&year)
    }

    /// Whole-hour UTC offset for `instant`.
    ///
    /// Years without a rule resolve to the fallback offset and log a warning.
    pub fn offset_for(&self, instant: NaiveDateTime) -> i64 {
        match self.rules.get(&instant.year()) {
            Some(rule) => rule.offset_for(instant),
            None => {
                warn!(
                    year = instant.year(),
                    fallback = self.fallback_offset,
                    "No DST rule for year, using fallback offset"
                );
                self.fallback_offset
            }
        }
    }

    /// Offset for the start (00:00) of a calendar day.
    pub fn offset_for_date(&self, date: NaiveDate) -> i64 {
        self.offset_for(date.and_time(chrono::NaiveTime::MIN))
    }
}

impl Default for DstTable {
    fn default() -> Self {
        Self::new([DstRule::pacific_2024()], default_standard_offset())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> DstTable {
        DstTable::default()
    }

    fn at(month: u32, day: u32, hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, month, day)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap()
    }

    #[test]
    fn winter_is_standard() {
        assert_eq!(table().offset_for(at(1, 15, 12, 0, 0)), -8);
        assert_eq!(table().offset_for(at(12, 24, 0, 0, 0)), -8);
    }

    #[test]
    fn summer_is_daylight() {
        assert_eq!(table().offset_for(at(5, 16, 10, 0, 0)), -7);
        assert_eq!(table().offset_for(at(7, 4, 0, 0, 0)), -7);
    }

    #[test]
    fn transition_instants_are_standard() {
        assert_eq!(table().offset_for(at(3, 10, 2, 0, 0)), -8);
        assert_eq!(table().offset_for(at(11, 3, 1, 0, 0)), -8);
    }

    #[test]
    fn one_second_inside_transitions_is_daylight() {
        assert_eq!(table().offset_for(at(3, 10, 2, 0, 1)), -7);
        assert_eq!(table().offset_for(at(11, 3, 0, 59, 59)), -7);
    }

    #[test]
    fn transition_days_at_midnight() {
        let table = table();
        let spring = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let fall = NaiveDate::from_ymd_opt(2024, 11, 3).unwrap();
        assert_eq!(table.offset_for_date(spring), -8);
        assert_eq!(table.offset_for_date(spring.succ_opt().unwrap()), -7);
        assert_eq!(table.offset_for_date(fall), -7);
        assert_eq!(table.offset_for_date(fall.succ_opt().unwrap()), -8);
    }

    #[test]
    fn unknown_year_uses_fallback() {
        let instant = NaiveDate::from_ymd_opt(2025, 7, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(table().offset_for(instant), -8);
        assert_eq!(DstTable::new([], 0).offset_for(instant), 0);
    }

    #[test]
    fn rules_from_config() {
        let rule: DstRule = serde_json::from_str(
            r#"{
                "year": 2025,
                "start": "2025-03-30T01:00:00",
                "end": "2025-10-26T01:00:00",
                "standard_offset": 0,
                "daylight_offset": 1
            }"#,
        )
        .unwrap();
        let table = DstTable::new([DstRule::pacific_2024(), rule], -8);

        let summer = NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(table.offset_for(summer), 1);
        assert_eq!(table.offset_for(at(6, 1, 0, 0, 0)), -7);
        assert!(table.rule_for_year(2025).is_some());
    }

    #[test]
    fn rules_outside_their_year_are_ignored() {
        let shifted = DstRule {
            year: 2025,
            ..DstRule::pacific_2024()
        };
        let inverted = DstRule {
            start: DstRule::pacific_2024().end,
            end: DstRule::pacific_2024().start,
            ..DstRule::pacific_2024()
        };
        assert!(DstRule::pacific_2024().is_consistent());
        assert!(!shifted.is_consistent());
        assert!(!inverted.is_consistent());

        let table = DstTable::new([shifted], -8);
        assert!(table.rule_for_year(2025).is_none());
        let summer = NaiveDate::from_ymd_opt(2025, 7, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(table.offset_for(summer), -8);

        assert!(DstTable::new([inverted], -8).rule_for_year(2024).is_none());
    }

    #[test]
    fn offsets_default_to_pacific() {
        let rule: DstRule = serde_json::from_str(
            r#"{"year": 2024, "start": "2024-03-10T02:00:00", "end": "2024-11-03T01:00:00"}"#,
        )
        .unwrap();
        assert_eq!(rule, DstRule::pacific_2024());
    }
}
