//! Column listing for a dataset file.

use std::path::Path;

use log::warn;

use crate::core::loaders::load_table;

/// Separator placed between column names.
const SEPARATOR: &str = ", ";

/// Return the column names of the CSV file at `path`, comma separated.
///
/// A file that cannot be loaded yields the error message instead, so the
/// caller always has a string to display.
pub fn list_columns(path: &Path) -> String {
    match load_table(path) {
        Ok(table) => table.column_names().join(SEPARATOR),
        Err(e) => {
            warn!("Failed to list columns of {}: {}", path.display(), e);
            e.to_string()
        }
    }
}
