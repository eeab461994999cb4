use clap::{Parser, Subcommand};
use tsextract_core::parse::DEFAULT_TIME_FORMAT;

/// Time-windowed extraction from InfluxDB
#[derive(Parser, Debug)]
#[command(name = "tsextract", version)]
#[command(about = "Time-windowed extraction from InfluxDB into daily CSV files")]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute the UTC query window around a reference time
    Window(WindowArgs),
    /// Print a fixed-step sequence of timestamps
    Sequence(SequenceArgs),
    /// Show the DST offset in effect at an instant
    DstOffset(DstOffsetArgs),
    /// Run the configured query once around a reference time
    Query(QueryArgs),
    /// Extract one calendar day to CSV
    Day(DayArgs),
    /// Extract every day from start up to (not including) end
    Range(RangeArgs),
}

#[derive(clap::Args, Debug)]
pub struct WindowArgs {
    /// Reference time in the time format (or YYYY-MM-DD)
    #[arg(short, long)]
    pub reference: String,

    /// Start offset as days,hours,minutes,seconds (e.g., 0,-2,0,0)
    #[arg(long, default_value = "0,0,0,0", allow_hyphen_values = true)]
    pub start: String,

    /// End offset as days,hours,minutes,seconds
    #[arg(long, default_value = "0,0,0,0", allow_hyphen_values = true)]
    pub end: String,

    /// Whole-hour UTC offset of the reference time
    #[arg(long, default_value_t = 0, allow_hyphen_values = true, conflicts_with = "tz")]
    pub tz_offset: i64,

    /// IANA timezone to derive the offset from (e.g., America/Los_Angeles)
    #[arg(short, long)]
    pub tz: Option<String>,

    /// strftime-style time format
    #[arg(long, default_value = DEFAULT_TIME_FORMAT)]
    pub time_format: String,

    /// Output format: json, text
    #[arg(long, default_value = "json")]
    pub output_format: String,
}

#[derive(clap::Args, Debug)]
pub struct SequenceArgs {
    /// First timestamp (inclusive)
    #[arg(long)]
    pub start: String,

    /// Last timestamp (inclusive)
    #[arg(long)]
    pub end: String,

    /// Step as days,hours,minutes,seconds; must be positive
    #[arg(long, default_value = "1,0,0,0")]
    pub step: String,

    /// Stop after this many timestamps
    #[arg(long)]
    pub limit: Option<usize>,

    /// strftime-style time format
    #[arg(long, default_value = DEFAULT_TIME_FORMAT)]
    pub time_format: String,

    /// Output format: json, text
    #[arg(long, default_value = "text")]
    pub output_format: String,
}

#[derive(clap::Args, Debug)]
pub struct DstOffsetArgs {
    /// Instant to look up, in the time format (or YYYY-MM-DD)
    #[arg(long)]
    pub at: String,

    /// Application config supplying the DST table (built-in table if omitted)
    #[arg(short, long)]
    pub config: Option<String>,

    /// strftime-style time format
    #[arg(long, default_value = DEFAULT_TIME_FORMAT)]
    pub time_format: String,

    /// Output format: json, text
    #[arg(long, default_value = "json")]
    pub output_format: String,
}

#[derive(clap::Args, Debug)]
pub struct ConnectionArgs {
    /// Application config (JSON, YAML or TOML)
    #[arg(short, long, default_value = "config/application.toml")]
    pub config: String,

    /// InfluxDB connection file with an [influx2] section
    #[arg(long, default_value = "config/.influxdb.toml")]
    pub influx_config: String,
}

#[derive(clap::Args, Debug)]
pub struct QueryArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Reference time in the configured time format (default: now, local)
    #[arg(short, long)]
    pub reference: Option<String>,

    /// Number of result rows to print
    #[arg(long, default_value_t = 10)]
    pub rows: usize,

    /// Also write the result to CSV if it has enough rows
    #[arg(long)]
    pub save: bool,

    /// Output format: json, text
    #[arg(long, default_value = "text")]
    pub output_format: String,
}

#[derive(clap::Args, Debug)]
pub struct DayArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Calendar day to extract (YYYY-MM-DD)
    #[arg(short, long)]
    pub date: String,

    /// Output format: json, text
    #[arg(long, default_value = "text")]
    pub output_format: String,
}

#[derive(clap::Args, Debug)]
pub struct RangeArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// First day to extract (YYYY-MM-DD, inclusive)
    #[arg(long)]
    pub start: String,

    /// Day to stop at (YYYY-MM-DD, exclusive)
    #[arg(long)]
    pub end: String,

    /// Output format: json, text
    #[arg(long, default_value = "text")]
    pub output_format: String,
}
