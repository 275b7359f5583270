//! Parsing and validation of user-supplied column selections and clamp levels.

use std::fmt;

use thiserror::Error;

use crate::core::loaders::Table;

/// Errors raised while parsing request inputs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SelectionError {
    #[error("No columns were specified")]
    Empty,

    #[error("Column selection has an empty name at position {position}")]
    EmptyName { position: usize },

    #[error("Winsorization level must be a percentage in [0, 50), got {0}")]
    InvalidLevel(f64),
}

/// Ordered list of column names taken from a comma-separated string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelection {
    names: Vec<String>,
}

impl ColumnSelection {
    /// Split `raw` on commas and trim every name.
    ///
    /// Names that are empty after trimming are rejected, reporting their
    /// 1-based position.
    pub fn parse(raw: &str) -> Result<Self, SelectionError> {
        if raw.trim().is_empty() {
            return Err(SelectionError::Empty);
        }

        let names = raw
            .split(',')
            .map(str::trim)
            .enumerate()
            .map(|(i, name)| {
                if name.is_empty() {
                    Err(SelectionError::EmptyName { position: i + 1 })
                } else {
                    Ok(name.to_string())
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names that `table` does not contain, in selection order.
    pub fn missing_from(&self, table: &Table) -> Vec<String> {
        self.names
            .iter()
            .filter(|name| !table.has_column(name))
            .cloned()
            .collect()
    }
}

impl fmt::Display for ColumnSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names.join(", "))
    }
}

/// Percentage clamped on each tail of a column's distribution.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct ClampLevel(f64);

impl ClampLevel {
    /// Upper limit (exclusive); a symmetric clamp at 50% or more would cross over.
    pub const MAX: f64 = 50.0;

    pub fn new(percent: f64) -> Result<Self, SelectionError> {
        if !percent.is_finite() || !(0.0..Self::MAX).contains(&percent) {
            return Err(SelectionError::InvalidLevel(percent));
        }
        Ok(Self(percent))
    }

    #[inline]
    pub fn percent(self) -> f64 {
        self.0
    }
}

impl Default for ClampLevel {
    fn default() -> Self {
        Self(5.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loaders::Column;

    #[test]
    fn test_parse_trims_names() {
        let selection = ColumnSelection::parse(" a ,b,  c d ").unwrap();
        assert_eq!(selection.names(), &["a", "b", "c d"]);
        assert_eq!(selection.to_string(), "a, b, c d");
    }

    #[test]
    fn test_parse_keeps_order_and_duplicates() {
        let selection = ColumnSelection::parse("b,a,b").unwrap();
        assert_eq!(selection.names(), &["b", "a", "b"]);
    }

    #[test]
    fn test_parse_rejects_empty_tokens() {
        assert_eq!(
            ColumnSelection::parse("a,,b"),
            Err(SelectionError::EmptyName { position: 2 })
        );
        assert_eq!(
            ColumnSelection::parse("a, "),
            Err(SelectionError::EmptyName { position: 2 })
        );
        assert_eq!(ColumnSelection::parse("   "), Err(SelectionError::Empty));
    }

    #[test]
    fn test_missing_from() {
        let table = Table::from_columns(vec![
            Column::from_values("a", &[1]),
            Column::from_values("b", &[2]),
        ])
        .unwrap();

        let selection = ColumnSelection::parse("a, z, b, y").unwrap();
        assert_eq!(selection.missing_from(&table), vec!["z", "y"]);

        let selection = ColumnSelection::parse("b,a").unwrap();
        assert!(selection.missing_from(&table).is_empty());
    }

    #[test]
    fn test_clamp_level_range() {
        assert_eq!(ClampLevel::new(0.0).unwrap().percent(), 0.0);
        assert_eq!(ClampLevel::new(5.0).unwrap().percent(), 5.0);
        assert!(ClampLevel::new(49.9).is_ok());

        assert_eq!(ClampLevel::new(50.0), Err(SelectionError::InvalidLevel(50.0)));
        assert_eq!(ClampLevel::new(-1.0), Err(SelectionError::InvalidLevel(-1.0)));
        assert!(ClampLevel::new(f64::NAN).is_err());
        assert!(ClampLevel::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_default_level() {
        assert_eq!(ClampLevel::default().percent(), 5.0);
    }
}
