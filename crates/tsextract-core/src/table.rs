//! Tabular query results.
//!
//! A [`Table`] is a rectangular grid of optional string cells with named
//! columns. Cells stay as the database rendered them; an empty CSV field is
//! stored as `None`.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{ExtractError, Result};

pub type Cell = Option<String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
    #[serde(skip)]
    index: Option<String>,
}

/// Outcome of [`Table::drop_columns`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DroppedColumns {
    pub dropped: Vec<String>,
    pub missing: Vec<String>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            index: None,
        }
    }

    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(ExtractError::QueryFailure(format!(
                "Row has {} cells, table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.row_count(), self.column_count())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn index(&self) -> Option<&str> {
        self.index.as_deref()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Remove the named columns that exist; names not in the table are
    /// reported in [`DroppedColumns::missing`] and otherwise ignored.
    pub fn drop_columns<S: AsRef<str>>(&mut self, names: &[S]) -> DroppedColumns {
        let mut outcome = DroppedColumns::default();
        let mut positions = Vec::new();

        for name in names {
            let name = name.as_ref();
            match self.column_index(name) {
                Some(pos) if !positions.contains(&pos) => {
                    positions.push(pos);
                    outcome.dropped.push(name.to_string());
                }
                Some(_) => {}
                None => outcome.missing.push(name.to_string()),
            }
        }

        // Remove from the right so earlier positions stay valid.
        positions.sort_unstable_by(|a, b| b.cmp(a));
        for pos in positions {
            self.columns.remove(pos);
            for row in &mut self.rows {
                row.remove(pos);
            }
        }

        if self
            .index
            .as_ref()
            .is_some_and(|index| outcome.dropped.contains(index))
        {
            self.index = None;
        }

        outcome
    }

    /// Make `column` the primary ordering key: move it to the front and sort
    /// rows by it. The sort is stable. RFC 3339 cells compare as instants,
    /// so `00:00:00.5Z` follows `00:00:00Z`; empty cells sort first and
    /// cells that are not timestamps sort last, as strings.
    pub fn set_index(&mut self, column: &str) -> Result<()> {
        let pos = self
            .column_index(column)
            .ok_or_else(|| ExtractError::MissingColumn(column.to_string()))?;

        let name = self.columns.remove(pos);
        self.columns.insert(0, name);
        for row in &mut self.rows {
            let cell = row.remove(pos);
            row.insert(0, cell);
        }

        self.rows.sort_by_cached_key(|row| SortKey::from_cell(&row[0]));
        self.index = Some(column.to_string());
        Ok(())
    }

    /// Remove rows with no value in any column other than the index.
    /// Returns how many rows were removed.
    pub fn drop_empty_rows(&mut self) -> usize {
        let skip = usize::from(self.index.is_some());
        let before = self.rows.len();
        self.rows.retain(|row| {
            row.iter()
                .skip(skip)
                .any(|cell| cell.as_deref().is_some_and(|v| !v.is_empty()))
        });
        before - self.rows.len()
    }

    /// The first `n` rows.
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
            index: self.index.clone(),
        }
    }

    /// Append rows from `other`, aligning columns by name. Columns only
    /// present in one side are filled with `None` on the other.
    pub fn concat(&mut self, other: Table) {
        let mut mapping = Vec::with_capacity(other.columns.len());
        for name in &other.columns {
            let pos = match self.column_index(name) {
                Some(pos) => pos,
                None => {
                    self.columns.push(name.clone());
                    for row in &mut self.rows {
                        row.push(None);
                    }
                    self.columns.len() - 1
                }
            };
            mapping.push(pos);
        }

        for row in other.rows {
            let mut aligned = vec![None; self.columns.len()];
            for (cell, &pos) in row.into_iter().zip(&mapping) {
                aligned[pos] = cell;
            }
            self.rows.push(aligned);
        }
    }

    /// Write the table as CSV with a header row. `None` cells are empty.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(&self.columns).map_err(csv_error)?;
        for row in &self.rows {
            csv.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))
                .map_err(csv_error)?;
        }
        csv.flush()
            .map_err(|e| ExtractError::PersistenceFailure(e.to_string()))
    }

    pub fn to_csv_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        String::from_utf8(buf).map_err(|e| ExtractError::PersistenceFailure(e.to_string()))
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Missing,
    Instant(DateTime<Utc>),
    Text(String),
}

impl SortKey {
    fn from_cell(cell: &Cell) -> Self {
        match cell.as_deref() {
            None => SortKey::Missing,
            Some(raw) => match DateTime::parse_from_rfc3339(raw) {
                Ok(instant) => SortKey::Instant(instant.with_timezone(&Utc)),
                Err(_) => SortKey::Text(raw.to_string()),
            },
        }
    }
}

fn csv_error(e: csv::Error) -> ExtractError {
    ExtractError::PersistenceFailure(format!("CSV write failed: {}", e))
}
