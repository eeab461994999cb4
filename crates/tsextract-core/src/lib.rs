//! # tsextract-core
//!
//! Time-windowed extraction from an InfluxDB bucket into daily CSV files.
//!
//! This library computes UTC query windows from a reference time and relative
//! offsets, walks date ranges day by day, resolves each day's whole-hour UTC
//! offset from a DST rule table, runs the resulting Flux query and writes
//! results that pass a row-count gate to disk.
//!
//! ## Features
//!
//! - **Relative offsets**: A `(days, hours, minutes, seconds)` record with
//!   checked arithmetic against durations, timestamps and other offsets.
//! - **Query windows**: Local-equivalent windows converted back to UTC by
//!   subtracting a whole-hour tz offset.
//! - **DST tables**: Per-year transition instants supplied by configuration.
//! - **Config files**: JSON, YAML and TOML decoded into one typed config.
//! - **InfluxDB**: A blocking HTTP executor behind the [`QueryExecutor`] trait.
//!
//! ## Example
//!
//! ```rust
//! use tsextract_core::prelude::*;
//!
//! let window = compute_endpoints(
//!     "2024-05-16T10:00:00Z",
//!     (0, -2, 0, 0),
//!     (0, 1, 0, 0),
//!     0,
//!     DEFAULT_TIME_FORMAT,
//! )
//! .unwrap();
//!
//! assert_eq!(window.start_utc, "2024-05-16T08:00:00Z");
//! assert_eq!(window.end_utc, "2024-05-16T11:00:00Z");
//! ```

pub mod config;
pub mod dst;
pub mod error;
pub mod executor;
pub mod extract;
pub mod flux;
pub mod influx;
pub mod offset;
pub mod parse;
pub mod persist;
pub mod sequence;
pub mod table;
pub mod tz;
pub mod window;

// Re-export commonly used types at the crate root
pub use config::{AppConfig, ConfigDocument, ExtractionConfig, load_config};
pub use dst::{DstRule, DstTable};
pub use error::{ExtractError, Result};
pub use executor::{QueryExecutor, query_database};
pub use extract::{DayOutcome, Extractor, RangeSummary};
pub use influx::InfluxClient;
pub use offset::RelativeOffset;
pub use sequence::{DateSequence, generate};
pub use table::Table;
pub use window::{QueryWindow, compute_endpoints, shift_formatted_time};

/// Prelude module for convenient imports.
///
/// ```
/// use tsextract_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{AppConfig, ExtractionConfig, load_config};
    pub use crate::dst::{DstRule, DstTable};
    pub use crate::error::{ExtractError, Result};
    pub use crate::executor::{QueryExecutor, query_database};
    pub use crate::extract::{DayOutcome, Extractor};
    pub use crate::offset::{Moment, Operand, RelativeOffset};
    pub use crate::parse::{DEFAULT_TIME_FORMAT, format_time, parse_time};
    pub use crate::sequence::generate;
    pub use crate::window::{QueryWindow, compute_endpoints, shift_formatted_time};
}
