use std::process::ExitCode;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod cli;
mod dst_cmd;
mod error;
mod extract_cmd;
mod query_cmd;
mod sequence_cmd;
mod shared;
mod window_cmd;

use cli::{Cli, Commands};
use dst_cmd::run_dst_offset;
use error::{CliResult, OutputFormat, output_format_hint, parse_output_format, render_error};
use extract_cmd::{run_day, run_range};
use query_cmd::run_query;
use sequence_cmd::run_sequence;
use window_cmd::run_window;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Extraction runs report progress at info; the pure commands stay quiet.
    let default_level = match cli.command {
        Commands::Query(_) | Commands::Day(_) | Commands::Range(_) => "info",
        _ => "warn",
    };
    init_tracing(cli.verbose, default_level);
    debug!(?cli, "Parsed CLI args");

    match cli.command {
        Commands::Window(args) => dispatch(&args.output_format.clone(), |f| run_window(args, f)),
        Commands::Sequence(args) => {
            dispatch(&args.output_format.clone(), |f| run_sequence(args, f))
        }
        Commands::DstOffset(args) => {
            dispatch(&args.output_format.clone(), |f| run_dst_offset(args, f))
        }
        Commands::Query(args) => dispatch(&args.output_format.clone(), |f| run_query(args, f)),
        Commands::Day(args) => dispatch(&args.output_format.clone(), |f| run_day(args, f)),
        Commands::Range(args) => dispatch(&args.output_format.clone(), |f| run_range(args, f)),
    }
}

fn dispatch(
    output_format: &str,
    run: impl FnOnce(OutputFormat) -> CliResult<ExitCode>,
) -> ExitCode {
    let fallback = output_format_hint(output_format);
    let output_format = match parse_output_format(output_format) {
        Ok(format) => format,
        Err(err) => return render_error(&err, fallback),
    };

    match run(output_format) {
        Ok(code) => code,
        Err(err) => render_error(&err, output_format),
    }
}

/// `RUST_LOG` wins over `--verbose`, which wins over the command default.
fn init_tracing(verbose: bool, default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { default_level }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
