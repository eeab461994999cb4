//! Running a configured query against a database.

use std::time::Instant;

use tracing::{info, warn};

use crate::config::ExtractionConfig;
use crate::error::Result;
use crate::flux::build_flux_query;
use crate::table::Table;
use crate::window::{ReferenceTime, TimeShift, compute_endpoints, shift_formatted_time};

/// Something that can run a Flux script and return a table.
pub trait QueryExecutor {
    /// Short human-readable identity for log lines (e.g. URL and org).
    fn describe(&self) -> String;

    /// Run `flux`. `Ok(None)` means the database returned no result at all.
    fn query_table(&self, flux: &str) -> Result<Option<Table>>;
}

impl<E: QueryExecutor + ?Sized> QueryExecutor for &E {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn query_table(&self, flux: &str) -> Result<Option<Table>> {
        (**self).query_table(flux)
    }
}

/// Query one window around `reference` and return the shaped result.
///
/// Columns named in `columns_to_drop` are removed when present; missing ones
/// are logged and skipped.
pub fn query_database<E: QueryExecutor + ?Sized>(
    executor: &E,
    config: &ExtractionConfig,
    reference: impl Into<ReferenceTime>,
) -> Result<Option<Table>> {
    let window = compute_endpoints(
        reference,
        config.start_offset,
        config.end_offset,
        config.tz_offset,
        &config.time_format,
    )?;
    let query = build_flux_query(config, &window);

    let shift = Some(TimeShift::Hours(config.tz_offset));
    let start_local = shift_formatted_time(&window.start_utc, shift, &config.time_format)?;
    let end_local = shift_formatted_time(&window.end_utc, shift, &config.time_format)?;
    info!(
        bucket = %config.bucket,
        start = %window.start_utc,
        end = %window.end_utc,
        query = %query,
        "Querying {}, bucket:{}, query_time:{} to {}",
        executor.describe(),
        config.bucket,
        start_local,
        end_local
    );

    let started = Instant::now();
    let result = executor.query_table(&query)?;

    let Some(mut table) = result else {
        info!(bucket = %config.bucket, "Query returned no result");
        return Ok(None);
    };

    if !config.columns_to_drop.is_empty() {
        let outcome = table.drop_columns(&config.columns_to_drop);
        if !outcome.dropped.is_empty() {
            info!(columns = ?outcome.dropped, "Dropped columns from result");
        }
        if !outcome.missing.is_empty() {
            warn!(columns = ?outcome.missing, "Columns to drop not present in result");
        }
    }

    let (rows, columns) = table.shape();
    info!(
        rows,
        columns,
        elapsed_s = started.elapsed().as_secs_f64(),
        "Query returned table of size {} rows x {} columns in {:.2}s",
        rows,
        columns,
        started.elapsed().as_secs_f64()
    );

    Ok(Some(table))
}
