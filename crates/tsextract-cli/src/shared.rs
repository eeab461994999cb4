use std::path::Path;

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::debug;
use tsextract_core::extract::DayOutcome;
use tsextract_core::parse::{parse_date, parse_time};
use tsextract_core::{AppConfig, Extractor, InfluxClient, RelativeOffset};

use crate::cli::ConnectionArgs;
use crate::error::{CliError, CliResult};

/// Parse `d,h,m,s` (trailing fields may be omitted) into an offset.
pub fn parse_offset(s: &str) -> CliResult<RelativeOffset> {
    let values = s
        .split(',')
        .map(|part| part.trim().parse::<i64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            CliError::input(format!(
                "Invalid offset '{}'. Expected days,hours,minutes,seconds: {}",
                s, e
            ))
        })?;

    RelativeOffset::try_from(values.as_slice())
        .map_err(|e| CliError::input(format!("Invalid offset '{}': {}", s, e)))
}

/// Parse a timestamp in `format`, or a bare `YYYY-MM-DD` as midnight.
pub fn parse_instant(s: &str, format: &str) -> CliResult<NaiveDateTime> {
    match parse_time(s, format) {
        Ok(instant) => Ok(instant),
        Err(err) => parse_date(s)
            .map(|date| date.and_time(chrono::NaiveTime::MIN))
            .map_err(|_| CliError::input(err.to_string())),
    }
}

pub fn parse_date_arg(s: &str) -> CliResult<NaiveDate> {
    parse_date(s).map_err(|e| CliError::input(e.to_string()))
}

pub fn parse_tz_or_input_error(name: &str) -> CliResult<Tz> {
    tsextract_core::tz::parse_tz(name)
        .map_err(|e| CliError::input(format!("Invalid timezone '{}': {}", name, e)))
}

pub fn load_app_config(path: &Path) -> CliResult<AppConfig> {
    read_app_config(path).map_err(|e| CliError::input(format!("{:#}", e)))
}

fn read_app_config(path: &Path) -> anyhow::Result<AppConfig> {
    let config = AppConfig::from_path(path)
        .with_context(|| format!("Loading application config '{}'", path.display()))?;
    debug!(?config, "Loaded application config");
    Ok(config)
}

/// Load the application config and connect to the database it queries.
pub fn connect_extractor(args: &ConnectionArgs) -> CliResult<Extractor<InfluxClient>> {
    let config = load_app_config(Path::new(&args.config))?;
    let client = InfluxClient::connect(&args.influx_config)?;
    Ok(Extractor::from_config(client, &config))
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::runtime(format!("Failed to serialize JSON: {}", e)))?;
    println!("{}", json);
    Ok(())
}

pub fn describe_outcome(outcome: &DayOutcome) -> String {
    match outcome {
        DayOutcome::NoResult => "no result".to_string(),
        DayOutcome::Empty => "empty result, nothing written".to_string(),
        DayOutcome::InsufficientData { rows, min_rows } => {
            format!("{} rows (need {}), nothing written", rows, min_rows)
        }
        DayOutcome::Persisted {
            path,
            rows,
            columns,
        } => format!("{} rows x {} columns -> {}", rows, columns, path.display()),
        DayOutcome::PersistFailed { error } => format!("not written: {}", error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsextract_core::parse::DEFAULT_TIME_FORMAT;

    #[test]
    fn offsets_parse_positionally() {
        assert_eq!(
            parse_offset("0,-2,0,0").unwrap(),
            RelativeOffset::from_hours(-2)
        );
        assert_eq!(parse_offset("1").unwrap(), RelativeOffset::from_days(1));
        assert_eq!(
            parse_offset(" 0, 1, 30 ").unwrap(),
            RelativeOffset::new(0, 1, 30, 0)
        );
    }

    #[test]
    fn bad_offsets_are_input_errors() {
        assert_eq!(parse_offset("1,x").unwrap_err().exit_code(), 2);
        assert_eq!(parse_offset("1,2,3,4,5").unwrap_err().exit_code(), 2);
    }

    #[test]
    fn instants_accept_bare_dates() {
        let full = parse_instant("2024-05-16T10:00:00Z", DEFAULT_TIME_FORMAT).unwrap();
        assert_eq!(full.to_string(), "2024-05-16 10:00:00");

        let date = parse_instant("2024-05-16", DEFAULT_TIME_FORMAT).unwrap();
        assert_eq!(date.to_string(), "2024-05-16 00:00:00");

        assert!(parse_instant("yesterday", DEFAULT_TIME_FORMAT).is_err());
    }

    #[test]
    fn missing_config_is_input_error() {
        let err = load_app_config(Path::new("/no/such/application.toml")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().starts_with("Loading application config"));
    }
}
