//! Daily extraction runs.
//!
//! An [`Extractor`] turns a calendar day into a one-day query window whose tz
//! offset comes from the DST table, runs it, and writes the result to disk when
//! it has enough rows. A range run repeats that for each day up to, but not
//! including, the end date.
//!
//! Query and connection errors abort the run. A result that is empty, too
//! small, or cannot be written is reported as a [`DayOutcome`] and the run
//! moves on.

use std::path::PathBuf;

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::{AppConfig, ExtractionConfig};
use crate::dst::DstTable;
use crate::error::Result;
use crate::executor::{QueryExecutor, query_database};
use crate::parse::{DATE_FORMAT, format_time};
use crate::persist::CsvSink;
use crate::sequence::DateSequence;
use crate::table::Table;
use crate::window::ReferenceTime;

/// Minimum rows for a day to be written.
pub const DEFAULT_MIN_ROWS: usize = 10;

/// Minimum rows for a single ad-hoc query to be written.
pub const SINGLE_SHOT_MIN_ROWS: usize = 20;

/// What happened to one day's result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DayOutcome {
    /// The database returned nothing at all.
    NoResult,
    /// The result had no rows.
    Empty,
    /// Fewer rows than the threshold; nothing written.
    InsufficientData { rows: usize, min_rows: usize },
    Persisted {
        path: PathBuf,
        rows: usize,
        columns: usize,
    },
    /// The result was good but could not be written.
    PersistFailed { error: String },
}

impl DayOutcome {
    pub fn is_persisted(&self) -> bool {
        matches!(self, DayOutcome::Persisted { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayReport {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub outcome: DayOutcome,
}

/// Result of [`Extractor::extract_range`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeSummary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Whether the walk arrived at the end date.
    pub reached_end: bool,
    pub days: Vec<DayReport>,
}

impl RangeSummary {
    pub fn persisted(&self) -> usize {
        self.days.iter().filter(|d| d.outcome.is_persisted()).count()
    }
}

/// Runs day and range extractions against one executor.
#[derive(Debug, Clone)]
pub struct Extractor<E> {
    executor: E,
    query: ExtractionConfig,
    dst: DstTable,
    sink: CsvSink,
    min_rows: usize,
    time_column: String,
}

impl<E: QueryExecutor> Extractor<E> {
    pub fn new(executor: E, query: ExtractionConfig, dst: DstTable, sink: CsvSink) -> Self {
        Self {
            executor,
            query,
            dst,
            sink,
            min_rows: DEFAULT_MIN_ROWS,
            time_column: "_time".to_string(),
        }
    }

    pub fn from_config(executor: E, config: &AppConfig) -> Self {
        Self::new(
            executor,
            config.query.clone(),
            config.dst.to_table(),
            CsvSink::new(&config.output.base_dir, config.output.prefix.clone()),
        )
        .with_min_rows(config.output.min_rows)
        .with_time_column(&config.output.time_column)
    }

    pub fn with_min_rows(mut self, min_rows: usize) -> Self {
        self.min_rows = min_rows;
        self
    }

    pub fn with_time_column(mut self, column: &str) -> Self {
        self.time_column = column.to_string();
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn query_config(&self) -> &ExtractionConfig {
        &self.query
    }

    pub fn sink(&self) -> &CsvSink {
        &self.sink
    }

    pub fn min_rows(&self) -> usize {
        self.min_rows
    }

    /// The one-day query for `date`: the base query shape with a zero start
    /// offset, a 24 hour end offset and the DST offset of that day.
    pub fn day_config(&self, date: NaiveDate) -> ExtractionConfig {
        self.query.for_day(self.dst.offset_for_date(date))
    }

    /// Run the base query around `reference` without writing anything.
    pub fn query_at(&self, reference: impl Into<ReferenceTime>) -> Result<Option<Table>> {
        query_database(&self.executor, &self.query, reference)
    }

    /// Extract and persist one calendar day.
    pub fn extract_day(&self, date: NaiveDate) -> Result<DayOutcome> {
        let config = self.day_config(date);
        let reference = format_time(&date.and_time(NaiveTime::MIN), &config.time_format)?;
        info!(
            date = %date,
            bucket = %config.bucket,
            tz_offset = config.tz_offset,
            "Extracting day"
        );

        match query_database(&self.executor, &config, reference)? {
            Some(table) => Ok(self.post_process(table, date)),
            None => {
                info!(date = %date, bucket = %config.bucket, "No result for day");
                Ok(DayOutcome::NoResult)
            }
        }
    }

    /// Apply the row-count gate and write `table` as the file for `date`.
    ///
    /// Rows are ordered by the time column and rows with no values are
    /// removed before writing. Write failures are logged and returned as
    /// [`DayOutcome::PersistFailed`].
    pub fn post_process(&self, mut table: Table, date: NaiveDate) -> DayOutcome {
        let bucket = self.query.bucket.as_str();
        if table.is_empty() {
            info!(date = %date, bucket, "Result is empty, nothing written");
            return DayOutcome::Empty;
        }

        let rows = table.row_count();
        if rows < self.min_rows {
            info!(
                date = %date,
                bucket,
                rows,
                min_rows = self.min_rows,
                "Insufficient data: {} rows, need {}",
                rows,
                self.min_rows
            );
            return DayOutcome::InsufficientData {
                rows,
                min_rows: self.min_rows,
            };
        }

        if let Err(e) = table.set_index(&self.time_column) {
            warn!(
                date = %date,
                bucket,
                error = %e,
                "Cannot order result by time column"
            );
            return DayOutcome::PersistFailed {
                error: e.to_string(),
            };
        }
        let removed = table.drop_empty_rows();
        if removed > 0 {
            info!(date = %date, bucket, removed, "Dropped empty rows");
        }

        let (rows, columns) = table.shape();
        match self.sink.write(date, &table) {
            Ok(path) => {
                info!(
                    date = %date,
                    bucket,
                    rows,
                    columns,
                    path = %path.display(),
                    "Saved {} rows x {} columns",
                    rows,
                    columns
                );
                DayOutcome::Persisted {
                    path,
                    rows,
                    columns,
                }
            }
            Err(e) => {
                error!(
                    date = %date,
                    bucket,
                    rows,
                    columns,
                    path = %self.sink.path_for(date).display(),
                    error = %e,
                    "Failed to save result"
                );
                DayOutcome::PersistFailed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Extract each day from `start` up to, but not including, `end`.
    ///
    /// When `end` is not after `start` no day is extracted.
    pub fn extract_range(&self, start: NaiveDate, end: NaiveDate) -> Result<RangeSummary> {
        let mut summary = RangeSummary {
            start,
            end,
            reached_end: false,
            days: Vec::new(),
        };
        if start > end {
            warn!(start = %start, end = %end, "Range end is before its start");
            return Ok(summary);
        }

        let days = DateSequence::from_instants(
            start.and_time(NaiveTime::MIN),
            end.and_time(NaiveTime::MIN),
            Duration::days(1),
            DATE_FORMAT,
        );
        for current in days.instants().map(|instant| instant.date()) {
            if current == end {
                summary.reached_end = true;
                break;
            }
            let outcome = self.extract_day(current)?;
            summary.days.push(DayReport {
                date: current,
                outcome,
            });
        }

        info!(
            start = %start,
            end = %end,
            days = summary.days.len(),
            persisted = summary.persisted(),
            "Range extraction finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractError;
    use std::cell::RefCell;
    use std::fs;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    /// Returns a table of `rows` rows for every query.
    struct Scripted {
        rows: usize,
        queries: RefCell<Vec<String>>,
    }

    impl Scripted {
        fn new(rows: usize) -> Self {
            Self {
                rows,
                queries: RefCell::new(Vec::new()),
            }
        }
    }

    impl QueryExecutor for Scripted {
        fn describe(&self) -> String {
            "scripted".into()
        }

        fn query_table(&self, flux: &str) -> Result<Option<Table>> {
            self.queries.borrow_mut().push(flux.to_string());
            Ok(Some(rows_table(self.rows)))
        }
    }

    struct Unreachable;

    impl QueryExecutor for Unreachable {
        fn describe(&self) -> String {
            "unreachable".into()
        }

        fn query_table(&self, _flux: &str) -> Result<Option<Table>> {
            Err(ExtractError::ConnectionFailure("down".into()))
        }
    }

    fn rows_table(n: usize) -> Table {
        // Reverse order so ordering by time is observable.
        let rows = (0..n)
            .rev()
            .map(|i| {
                vec![
                    Some(format!("v{i}")),
                    Some(format!("2024-05-16T00:{:02}:00Z", i)),
                ]
            })
            .collect();
        Table::from_rows(vec!["sensor".into(), "_time".into()], rows).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn extractor<E: QueryExecutor>(executor: E, dir: &std::path::Path) -> Extractor<E> {
        let query = ExtractionConfig {
            bucket: "sensors".into(),
            ..Default::default()
        };
        Extractor::new(executor, query, DstTable::default(), CsvSink::new(dir, "t_"))
    }

    #[test]
    fn below_threshold_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ex = extractor(Scripted::new(9), dir.path());

        let outcome = ex.extract_day(date(2024, 5, 16)).unwrap();
        assert_eq!(
            outcome,
            DayOutcome::InsufficientData {
                rows: 9,
                min_rows: 10
            }
        );
        assert!(!ex.sink().path_for(date(2024, 5, 16)).exists());
    }

    #[test]
    fn threshold_row_count_is_written_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let ex = extractor(Scripted::new(10), dir.path());

        let outcome = ex.extract_day(date(2024, 5, 16)).unwrap();
        let path = ex.sink().path_for(date(2024, 5, 16));
        assert_eq!(
            outcome,
            DayOutcome::Persisted {
                path: path.clone(),
                rows: 10,
                columns: 2
            }
        );

        let written = fs::read_to_string(path).unwrap();
        let mut lines = written.lines();
        assert_eq!(lines.next(), Some("_time,sensor"));
        assert_eq!(lines.next(), Some("2024-05-16T00:00:00Z,v0"));
    }

    #[test]
    fn empty_result_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let ex = extractor(Scripted::new(0), dir.path());
        assert_eq!(ex.extract_day(date(2024, 5, 16)).unwrap(), DayOutcome::Empty);
    }

    #[test]
    fn day_window_uses_dst_offset() {
        let dir = tempfile::tempdir().unwrap();
        let ex = extractor(Scripted::new(0), dir.path());

        assert_eq!(ex.day_config(date(2024, 5, 16)).tz_offset, -7);
        assert_eq!(ex.day_config(date(2024, 1, 16)).tz_offset, -8);

        ex.extract_day(date(2024, 5, 16)).unwrap();
        let queries = ex.executor().queries.borrow();
        assert!(
            queries[0].contains("range(start: 2024-05-16T07:00:00Z, stop: 2024-05-17T07:00:00Z)")
        );
        assert!(queries[0].contains("timeShift(duration: -7h)"));
    }

    #[test]
    fn missing_time_column_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let ex = extractor(Scripted::new(0), dir.path()).with_time_column("ts");
        let outcome = ex.post_process(rows_table(12), date(2024, 5, 16));
        assert!(matches!(outcome, DayOutcome::PersistFailed { .. }));
    }

    #[test]
    fn persist_failure_does_not_propagate() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let ex = extractor(Scripted::new(12), &blocker);

        let summary = ex.extract_range(date(2024, 5, 1), date(2024, 5, 3)).unwrap();
        assert_eq!(summary.days.len(), 2);
        assert!(
            summary
                .days
                .iter()
                .all(|d| matches!(d.outcome, DayOutcome::PersistFailed { .. }))
        );
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn persist_failure_log_names_bucket_and_date() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let ex = extractor(Scripted::new(12), &blocker);

        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let outcome = tracing::subscriber::with_default(subscriber, || {
            ex.extract_day(date(2024, 5, 16)).unwrap()
        });
        assert!(matches!(outcome, DayOutcome::PersistFailed { .. }));

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        let line = output
            .lines()
            .find(|line| line.contains("Failed to save result"))
            .unwrap_or_else(|| panic!("no failure line in:\n{output}"));
        assert!(line.contains("bucket=sensors"), "{line}");
        assert!(line.contains("date=2024-05-16"), "{line}");
        assert!(line.contains("rows=12"), "{line}");
        assert!(line.contains("columns=2"), "{line}");
    }

    #[test]
    fn range_stops_before_end_date() {
        let dir = tempfile::tempdir().unwrap();
        let ex = extractor(Scripted::new(10), dir.path());

        let summary = ex.extract_range(date(2024, 4, 29), date(2024, 5, 2)).unwrap();
        let dates: Vec<_> = summary.days.iter().map(|d| d.date).collect();
        assert_eq!(dates, vec![date(2024, 4, 29), date(2024, 4, 30), date(2024, 5, 1)]);
        assert!(summary.reached_end);
        assert_eq!(summary.persisted(), 3);
        assert!(!ex.sink().path_for(date(2024, 5, 2)).exists());
    }

    #[test]
    fn leap_day_only_in_leap_years() {
        let dir = tempfile::tempdir().unwrap();
        let ex = extractor(Scripted::new(0), dir.path());

        let leap = ex.extract_range(date(2024, 2, 28), date(2024, 3, 1)).unwrap();
        assert_eq!(leap.days.len(), 2);
        assert_eq!(leap.days[1].date, date(2024, 2, 29));

        let common = ex.extract_range(date(2023, 2, 28), date(2023, 3, 1)).unwrap();
        assert_eq!(common.days.len(), 1);
    }

    #[test]
    fn empty_and_inverted_ranges_visit_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ex = extractor(Scripted::new(10), dir.path());

        let same = ex.extract_range(date(2024, 5, 1), date(2024, 5, 1)).unwrap();
        assert!(same.days.is_empty());
        assert!(same.reached_end);

        let inverted = ex.extract_range(date(2024, 5, 3), date(2024, 5, 1)).unwrap();
        assert!(inverted.days.is_empty());
        assert!(!inverted.reached_end);
        assert!(ex.executor().queries.borrow().is_empty());
    }

    #[test]
    fn connection_errors_abort_range() {
        let dir = tempfile::tempdir().unwrap();
        let ex = extractor(Unreachable, dir.path());
        let err = ex
            .extract_range(date(2024, 5, 1), date(2024, 5, 3))
            .unwrap_err();
        assert!(matches!(err, ExtractError::ConnectionFailure(_)));
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let report = DayReport {
            date: date(2024, 5, 16),
            outcome: DayOutcome::InsufficientData {
                rows: 3,
                min_rows: 10,
            },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["date"], "2024-05-16");
        assert_eq!(json["status"], "insufficient_data");
        assert_eq!(json["rows"], 3);
    }
}
