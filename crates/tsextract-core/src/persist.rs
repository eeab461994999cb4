//! Writing daily results to disk.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tempfile::NamedTempFile;

use crate::error::{ExtractError, Result};
use crate::parse::format_date;
use crate::table::Table;

/// Writes one CSV file per day under a base directory.
///
/// Files are named `<prefix><YYYY-MM-DD>.csv`. Each write goes to a temporary
/// file in the same directory and is renamed over the target, so an existing
/// file is either fully replaced or left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvSink {
    base_dir: PathBuf,
    prefix: String,
}

impl CsvSink {
    pub fn new(base_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.base_dir
            .join(format!("{}{}.csv", self.prefix, format_date(date)))
    }

    /// Write `table` for `date`, replacing any earlier file for that day.
    pub fn write(&self, date: NaiveDate, table: &Table) -> Result<PathBuf> {
        ensure_dir(&self.base_dir)?;

        let target = self.path_for(date);
        let mut tmp = NamedTempFile::new_in(&self.base_dir).map_err(io_error)?;
        table.write_csv(&mut tmp)?;
        tmp.flush().map_err(io_error)?;
        tmp.as_file_mut().sync_all().map_err(io_error)?;

        tmp.persist(&target).map_err(|e| io_error(e.error))?;
        Ok(target)
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        if !dir.is_dir() {
            return Err(ExtractError::PersistenceFailure(format!(
                "'{}' is not a directory",
                dir.display()
            )));
        }
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| {
        ExtractError::PersistenceFailure(format!("Creating '{}': {}", dir.display(), e))
    })
}

fn io_error(e: std::io::Error) -> ExtractError {
    ExtractError::PersistenceFailure(e.to_string())
}
