use std::process::ExitCode;

use chrono::Duration;
use tsextract_core::DateSequence;

use crate::cli::SequenceArgs;
use crate::error::{CliError, CliResult, EXIT_SUCCESS, OutputFormat};
use crate::shared::{parse_instant, parse_offset, print_json};

pub fn run_sequence(args: SequenceArgs, output_format: OutputFormat) -> CliResult<ExitCode> {
    let start = parse_instant(&args.start, &args.time_format)?;
    let end = parse_instant(&args.end, &args.time_format)?;
    let step = parse_offset(&args.step)?.to_duration();

    // The core sequence does not terminate on a non-positive step.
    if step <= Duration::zero() {
        return Err(CliError::input(format!(
            "Invalid step '{}'. The step must be positive",
            args.step
        )));
    }

    // Validate the format before walking.
    tsextract_core::parse::format_time(&start, &args.time_format)?;

    let sequence = DateSequence::from_instants(start, end, step, &args.time_format);
    let items: Vec<String> = match args.limit {
        Some(limit) => sequence.take(limit).collect(),
        None => sequence.collect(),
    };

    match output_format {
        OutputFormat::Json => print_json(&items)?,
        OutputFormat::Text => {
            for item in items {
                println!("{}", item);
            }
        }
    }

    Ok(ExitCode::from(EXIT_SUCCESS))
}
