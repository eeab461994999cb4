use std::process::ExitCode;

use serde::Serialize;
use tracing::debug;
use tsextract_core::parse::format_time;
use tsextract_core::tz::offset_hours_at_local;
use tsextract_core::window::TimeShift;
use tsextract_core::{compute_endpoints, shift_formatted_time};

use crate::cli::WindowArgs;
use crate::error::{CliResult, EXIT_SUCCESS, OutputFormat};
use crate::shared::{parse_instant, parse_offset, parse_tz_or_input_error, print_json};

pub fn run_window(args: WindowArgs, output_format: OutputFormat) -> CliResult<ExitCode> {
    let reference = parse_instant(&args.reference, &args.time_format)?;
    let start = parse_offset(&args.start)?;
    let end = parse_offset(&args.end)?;

    let tz_offset = match &args.tz {
        Some(name) => offset_hours_at_local(parse_tz_or_input_error(name)?, reference),
        None => args.tz_offset,
    };
    debug!(%reference, %start, %end, tz_offset, "Computing window");

    let window = compute_endpoints(reference, start, end, tz_offset, &args.time_format)?;
    let shift = Some(TimeShift::Hours(tz_offset));

    let result = WindowResult {
        reference: format_time(&reference, &args.time_format)?,
        tz_offset_hours: tz_offset,
        start_local: shift_formatted_time(&window.start_utc, shift, &args.time_format)?,
        end_local: shift_formatted_time(&window.end_utc, shift, &args.time_format)?,
        start_utc: window.start_utc,
        end_utc: window.end_utc,
    };

    match output_format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Text => {
            println!(
                "{} to {} (tz offset {}h)",
                result.start_utc, result.end_utc, result.tz_offset_hours
            );
        }
    }

    Ok(ExitCode::from(EXIT_SUCCESS))
}

#[derive(Debug, Serialize)]
struct WindowResult {
    reference: String,
    tz_offset_hours: i64,
    start_utc: String,
    end_utc: String,
    start_local: String,
    end_local: String,
}
