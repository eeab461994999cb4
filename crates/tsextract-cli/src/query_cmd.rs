use std::process::ExitCode;

use chrono::Local;
use serde::Serialize;
use tsextract_core::extract::{DayOutcome, SINGLE_SHOT_MIN_ROWS};
use tsextract_core::parse::format_time;
use tsextract_core::table::Table;

use crate::cli::QueryArgs;
use crate::error::{CliResult, EXIT_SUCCESS, OutputFormat};
use crate::shared::{connect_extractor, describe_outcome, parse_instant, print_json};

pub fn run_query(args: QueryArgs, output_format: OutputFormat) -> CliResult<ExitCode> {
    let extractor = connect_extractor(&args.connection)?.with_min_rows(SINGLE_SHOT_MIN_ROWS);
    let time_format = extractor.query_config().time_format.clone();

    let reference = match &args.reference {
        Some(s) => parse_instant(s, &time_format)?,
        None => Local::now().naive_local(),
    };

    let result = extractor.query_at(reference)?;
    let output = match result {
        Some(table) => {
            let (rows, columns) = table.shape();
            let head = table.head(args.rows);
            let outcome = args
                .save
                .then(|| extractor.post_process(table, reference.date()));
            QueryOutput {
                reference: format_time(&reference, &time_format)?,
                rows,
                columns,
                head: Some(head),
                outcome,
            }
        }
        None => QueryOutput {
            reference: format_time(&reference, &time_format)?,
            rows: 0,
            columns: 0,
            head: None,
            outcome: None,
        },
    };

    match output_format {
        OutputFormat::Json => print_json(&output)?,
        OutputFormat::Text => print_text(&output)?,
    }

    Ok(ExitCode::from(EXIT_SUCCESS))
}

#[derive(Debug, Serialize)]
struct QueryOutput {
    reference: String,
    rows: usize,
    columns: usize,
    head: Option<Table>,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<DayOutcome>,
}

fn print_text(output: &QueryOutput) -> CliResult<()> {
    let Some(head) = &output.head else {
        println!("No result for {}", output.reference);
        return Ok(());
    };

    println!(
        "{} rows x {} columns around {}",
        output.rows, output.columns, output.reference
    );
    print!("{}", head.to_csv_string()?);
    if let Some(outcome) = &output.outcome {
        println!("Saved: {}", describe_outcome(outcome));
    }
    Ok(())
}
