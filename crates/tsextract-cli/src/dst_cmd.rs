use std::path::Path;
use std::process::ExitCode;

use chrono::Datelike;
use serde::Serialize;
use tsextract_core::DstTable;
use tsextract_core::parse::format_time;

use crate::cli::DstOffsetArgs;
use crate::error::{CliResult, EXIT_SUCCESS, OutputFormat};
use crate::shared::{load_app_config, parse_instant, print_json};

pub fn run_dst_offset(args: DstOffsetArgs, output_format: OutputFormat) -> CliResult<ExitCode> {
    let at = parse_instant(&args.at, &args.time_format)?;
    let table = match &args.config {
        Some(path) => load_app_config(Path::new(path))?.dst.to_table(),
        None => DstTable::default(),
    };

    let rule = table.rule_for_year(at.year());
    let result = DstResult {
        at: format_time(&at, &args.time_format)?,
        offset_hours: table.offset_for(at),
        daylight: rule.is_some_and(|r| r.is_daylight(at)),
        rule_year: rule.map(|r| r.year),
    };

    match output_format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Text => {
            let kind = match (result.rule_year, result.daylight) {
                (None, _) => "no rule, fallback",
                (Some(_), true) => "daylight",
                (Some(_), false) => "standard",
            };
            println!("{}: {}h ({})", result.at, result.offset_hours, kind);
        }
    }

    Ok(ExitCode::from(EXIT_SUCCESS))
}

#[derive(Debug, Serialize)]
struct DstResult {
    at: String,
    offset_hours: i64,
    daylight: bool,
    rule_year: Option<i32>,
}
