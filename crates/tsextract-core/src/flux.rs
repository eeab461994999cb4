//! Flux query templating.

use std::fmt::Write;

use crate::config::ExtractionConfig;
use crate::window::QueryWindow;

/// Render the Flux script for one window.
///
/// Rows come back pivoted so each value of `pivot_column` is its own column,
/// and time-shifted by the tz offset so `_time` reads as local-equivalent.
///
/// # Examples
///
/// ```
/// use tsextract_core::config::ExtractionConfig;
/// use tsextract_core::flux::build_flux_query;
/// use tsextract_core::window::QueryWindow;
///
/// let config = ExtractionConfig { bucket: "sensors".into(), ..Default::default() };
/// let window = QueryWindow {
///     start_utc: "2024-05-16T08:00:00Z".into(),
///     end_utc: "2024-05-16T11:00:00Z".into(),
/// };
///
/// let query = build_flux_query(&config, &window);
/// assert!(query.starts_with("from(bucket: \"sensors\")"));
/// ```
pub fn build_flux_query(config: &ExtractionConfig, window: &QueryWindow) -> String {
    let mut query = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(query, "from(bucket: {})", quote(&config.bucket));
    let _ = writeln!(
        query,
        "  |> range(start: {}, stop: {})",
        window.start_utc, window.end_utc
    );
    let _ = writeln!(query, "  |> filter(fn: (r) => {})", config.filter);
    if let Some(aggregate) = &config.aggregate {
        let _ = writeln!(
            query,
            "  |> aggregateWindow(every: {}, fn: {}, createEmpty: false)",
            aggregate.every, aggregate.function
        );
    }
    let _ = writeln!(query, "  |> timeShift(duration: {}h)", config.tz_offset);
    let _ = writeln!(
        query,
        "  |> pivot(rowKey: [\"_time\"], columnKey: [{}], valueColumn: \"_value\")",
        quote(&config.pivot_column)
    );
    query.push_str("  |> group()\n");
    if !config.sort_keys.is_empty() {
        let keys: Vec<String> = config.sort_keys.iter().map(|k| quote(k)).collect();
        let _ = writeln!(query, "  |> sort(columns: [{}])", keys.join(", "));
    }

    query
}

/// Flux string literal.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '$' => out.push_str("\\$"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}
