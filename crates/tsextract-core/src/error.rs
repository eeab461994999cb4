//! Error types for tsextract-core.
//!
//! Fatal categories (configuration, type mismatch, connection) propagate to the
//! caller. Persistence failures are reported through this type too, but the
//! orchestration layer logs them and keeps going. Dropping a column that is not
//! in a result is not an error at all; see `Table::drop_columns`.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for extraction operations.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Configuration file does not exist.
    #[error("Config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// Configuration file exists but could not be read or decoded.
    #[error("Config error: {0}")]
    ConfigParse(String),

    /// Unsupported operand kind in offset arithmetic.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Error parsing or formatting a timestamp.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Date arithmetic left the representable range.
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// The database could not be reached.
    #[error("Connection failure: {0}")]
    ConnectionFailure(String),

    /// The database answered, but the query failed.
    #[error("Query failure: {0}")]
    QueryFailure(String),

    /// A result lacks a column the caller relies on.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Writing a result to storage failed.
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;
