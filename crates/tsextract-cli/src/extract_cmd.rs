use std::process::ExitCode;

use tracing::warn;
use tsextract_core::extract::DayReport;

use crate::cli::{DayArgs, RangeArgs};
use crate::error::{CliError, CliResult, EXIT_SUCCESS, OutputFormat};
use crate::shared::{connect_extractor, describe_outcome, parse_date_arg, print_json};

pub fn run_day(args: DayArgs, output_format: OutputFormat) -> CliResult<ExitCode> {
    let date = parse_date_arg(&args.date)?;
    let extractor = connect_extractor(&args.connection)?;

    let report = DayReport {
        date,
        outcome: extractor.extract_day(date)?,
    };

    match output_format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => println!("{}: {}", report.date, describe_outcome(&report.outcome)),
    }

    Ok(ExitCode::from(EXIT_SUCCESS))
}

pub fn run_range(args: RangeArgs, output_format: OutputFormat) -> CliResult<ExitCode> {
    let start = parse_date_arg(&args.start)?;
    let end = parse_date_arg(&args.end)?;

    if start > end {
        return Err(CliError::input(format!(
            "Invalid range: start '{}' must not be after end '{}'",
            args.start, args.end
        )));
    }
    if start == end {
        warn!(%start, "Range is empty; the end date is exclusive");
    }

    let extractor = connect_extractor(&args.connection)?;
    let summary = extractor.extract_range(start, end)?;

    match output_format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Text => {
            for day in &summary.days {
                println!("{}: {}", day.date, describe_outcome(&day.outcome));
            }
            println!(
                "{} of {} days written",
                summary.persisted(),
                summary.days.len()
            );
        }
    }

    Ok(ExitCode::from(EXIT_SUCCESS))
}
