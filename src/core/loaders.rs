//! Data loader for delimited tabular files.
//!
//! Cells are kept as their original text so that serialization can reproduce
//! untouched columns exactly. Numeric interpretation happens on demand via
//! [`parse_cell`].

use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use thiserror::Error;

/// Errors that can occur during file loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("No columns to parse from file: {0}")]
    EmptyFile(PathBuf),

    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("Column '{column}' has {found} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Cell texts treated as missing values.
const MISSING_MARKERS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL"];

/// Interpretation of a single cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellValue<'a> {
    Missing,
    Number(f64),
    Text(&'a str),
}

/// Interpret raw cell text as missing, numeric or plain text.
pub fn parse_cell(raw: &str) -> CellValue<'_> {
    let trimmed = raw.trim();
    if MISSING_MARKERS.contains(&trimmed) {
        return CellValue::Missing;
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_nan() => CellValue::Missing,
        Ok(v) => CellValue::Number(v),
        Err(_) => CellValue::Text(raw),
    }
}

/// A named column of raw cell texts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<String>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }

    /// Builds a column from anything displayable, mostly for tests and fixtures.
    pub fn from_values<T: ToString>(name: impl Into<String>, values: &[T]) -> Self {
        Self::new(name, values.iter().map(|v| v.to_string()).collect())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterates over the interpreted cell values.
    pub fn values(&self) -> impl Iterator<Item = CellValue<'_>> {
        self.cells.iter().map(|c| parse_cell(c))
    }
}

/// An ordered collection of uniquely named, row-aligned columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Table {
    /// Creates a table from columns, checking name uniqueness and row alignment.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let num_rows = columns.first().map_or(0, Column::len);

        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(LoaderError::DuplicateColumn(column.name.clone()));
            }
            if column.len() != num_rows {
                return Err(LoaderError::LengthMismatch {
                    column: column.name.clone(),
                    expected: num_rows,
                    found: column.len(),
                });
            }
        }

        Ok(Self { columns, num_rows })
    }

    /// Column names in table order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    #[inline]
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    #[inline]
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    #[inline]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns the cells of row `index` in column order.
    pub fn row(&self, index: usize) -> Option<Vec<&str>> {
        if index >= self.num_rows {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|c| c.cells[index].as_str())
                .collect(),
        )
    }

    /// Returns a copy holding at most the first `n` rows.
    pub fn head(&self, n: usize) -> Table {
        let take = n.min(self.num_rows);
        let columns = self
            .columns
            .iter()
            .map(|c| Column::new(c.name.clone(), c.cells[..take].to_vec()))
            .collect();

        Table {
            columns,
            num_rows: take,
        }
    }

    /// Replaces the column with the same name, keeping its position.
    ///
    /// Returns `false` (and leaves the table untouched) when no such column
    /// exists or the row count differs.
    pub fn replace_column(&mut self, column: Column) -> bool {
        if column.len() != self.num_rows {
            return false;
        }
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(slot) => {
                *slot = column;
                true
            }
            None => false,
        }
    }
}

/// Load a table from a CSV file whose first row is the header.
///
/// # Errors
///
/// Returns an error if the file cannot be opened, a row has a different
/// number of fields than the header, the content is not valid UTF-8, the
/// file has no header, or a column name is repeated.
pub fn load_table<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(BufReader::new(file));

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for result in reader.records() {
        let record = result?;
        for (column, field) in cells.iter_mut().zip(record.iter()) {
            column.push(field.to_string());
        }
    }

    let columns = headers
        .iter()
        .zip(cells)
        .map(|(name, cells)| Column::new(name, cells))
        .collect();

    Table::from_columns(columns)
}
