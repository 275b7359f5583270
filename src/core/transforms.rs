//! Column statistics and symmetric percentile clamping.
//!
//! Percentiles use the nearest-rank definition, so both clamp bounds are
//! observed values of the column. Clamped cells therefore take the exact
//! text of the bound observation and no float formatting is involved.
//!
//! Tail counts are uneven: with `n` distinct values at level `L` (as a
//! fraction), at most `ceil(L·n) - 1` low values and `floor(L·n)` high
//! values are clamped.

use std::cmp::Ordering;

use thiserror::Error;

use super::loaders::{CellValue, Column};

/// Tolerance applied before taking the ceiling of a percentile rank.
const RANK_EPSILON: f64 = 1e-9;

/// Errors that can occur while transforming a column.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("Column '{column}' contains non-numeric value '{value}' at row {row}")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Column '{0}' has no numeric values")]
    NoNumericValues(String),
}

/// Result type for transform operations.
pub type Result<T> = std::result::Result<T, TransformError>;

/// Minimum, maximum and mean of a column's numeric values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Lower and upper clamp values with the rows they were observed at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClampBounds {
    pub lower: f64,
    pub upper: f64,
    pub lower_row: usize,
    pub upper_row: usize,
}

/// Outcome of winsorizing one column.
#[derive(Debug, Clone, PartialEq)]
pub struct WinsorizedColumn {
    pub column: Column,
    pub before: Summary,
    pub after: Summary,
    pub bounds: ClampBounds,
    /// Number of cells that were replaced.
    pub clamped: usize,
}

/// Interpret every cell of a column as an optional number.
///
/// Missing cells become `None`; any other non-numeric cell is an error.
pub fn numeric_values(column: &Column) -> Result<Vec<Option<f64>>> {
    column
        .values()
        .enumerate()
        .map(|(row, value)| match value {
            CellValue::Number(v) => Ok(Some(v)),
            CellValue::Missing => Ok(None),
            CellValue::Text(text) => Err(TransformError::NonNumeric {
                column: column.name.clone(),
                row,
                value: text.to_string(),
            }),
        })
        .collect()
}

/// Summarize the present values, or `None` when there are none.
pub fn summarize(values: &[Option<f64>]) -> Option<Summary> {
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for v in values.iter().flatten() {
        count += 1;
        sum += v;
        min = min.min(*v);
        max = max.max(*v);
    }

    if count == 0 {
        return None;
    }

    Some(Summary {
        min,
        max,
        mean: sum / count as f64,
    })
}

/// Zero-based index of the nearest-rank `percent` percentile among `n` sorted values.
///
/// The 1-based rank is `ceil(percent / 100 * n)`, floored at 1.
pub fn nearest_rank_index(n: usize, percent: f64) -> usize {
    debug_assert!(n > 0, "nearest rank of an empty sample");
    let rank = (percent * n as f64 / 100.0 - RANK_EPSILON).ceil();
    let rank = if rank < 1.0 { 1 } else { rank as usize };
    rank.min(n) - 1
}

/// Compute the symmetric clamp bounds for `level` percent.
///
/// The lower bound is the `level`-th percentile and the upper bound the
/// `(100 - level)`-th percentile. Returns `None` when no value is present.
pub fn clamp_bounds(values: &[Option<f64>], level: f64) -> Option<ClampBounds> {
    let mut observed: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(row, v)| v.map(|v| (row, v)))
        .collect();

    if observed.is_empty() {
        return None;
    }

    // Stable sort keeps the first occurrence of tied values first.
    observed.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    let n = observed.len();
    let (lower_row, lower) = observed[nearest_rank_index(n, level)];
    let (upper_row, upper) = observed[nearest_rank_index(n, 100.0 - level)];

    Some(ClampBounds {
        lower,
        upper,
        lower_row,
        upper_row,
    })
}

/// Winsorize a column at `level` percent on both tails.
///
/// Values below the lower bound are replaced by the lower bound, values above
/// the upper bound by the upper bound. Missing cells and values within the
/// bounds keep their original text.
pub fn winsorize_column(column: &Column, level: f64) -> Result<WinsorizedColumn> {
    let values = numeric_values(column)?;
    let no_values = || TransformError::NoNumericValues(column.name.clone());

    let before = summarize(&values).ok_or_else(no_values)?;
    let bounds = clamp_bounds(&values, level).ok_or_else(no_values)?;

    let lower_text = &column.cells[bounds.lower_row];
    let upper_text = &column.cells[bounds.upper_row];

    let mut cells = Vec::with_capacity(column.len());
    let mut clamped_values = Vec::with_capacity(column.len());
    let mut clamped = 0;

    for (raw, value) in column.cells.iter().zip(&values) {
        match *value {
            Some(v) if v < bounds.lower => {
                cells.push(lower_text.clone());
                clamped_values.push(Some(bounds.lower));
                clamped += 1;
            }
            Some(v) if v > bounds.upper => {
                cells.push(upper_text.clone());
                clamped_values.push(Some(bounds.upper));
                clamped += 1;
            }
            other => {
                cells.push(raw.clone());
                clamped_values.push(other);
            }
        }
    }

    let after = summarize(&clamped_values).ok_or_else(no_values)?;

    Ok(WinsorizedColumn {
        column: Column::new(column.name.clone(), cells),
        before,
        after,
        bounds,
        clamped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outlier_column() -> Column {
        Column::from_values("x", &[1, 2, 3, 4, 5, 6, 7, 8, 9, 100])
    }

    #[test]
    fn test_nearest_rank_index() {
        assert_eq!(nearest_rank_index(10, 10.0), 0);
        assert_eq!(nearest_rank_index(10, 90.0), 8);
        assert_eq!(nearest_rank_index(10, 0.0), 0);
        assert_eq!(nearest_rank_index(10, 100.0), 9);
        assert_eq!(nearest_rank_index(10, 95.0), 9);
        assert_eq!(nearest_rank_index(20, 5.0), 0);
        assert_eq!(nearest_rank_index(20, 95.0), 18);
        assert_eq!(nearest_rank_index(1, 50.0), 0);
    }

    #[test]
    fn test_summarize_skips_missing() {
        let summary = summarize(&[Some(1.0), None, Some(3.0)]).unwrap();
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 3.0);
        assert!((summary.mean - 2.0).abs() < 1e-12);

        assert!(summarize(&[None, None]).is_none());
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn test_winsorize_outlier_scenario() {
        let result = winsorize_column(&outlier_column(), 10.0).unwrap();

        assert_eq!(result.before.max, 100.0);
        assert!((result.before.mean - 14.5).abs() < 1e-12);

        assert_eq!(result.bounds.lower, 1.0);
        assert_eq!(result.bounds.upper, 9.0);
        assert_eq!(result.after.min, 1.0);
        assert_eq!(result.after.max, 9.0);
        assert!((result.after.mean - 5.4).abs() < 1e-12);
        assert_eq!(result.clamped, 1);
        assert_eq!(result.column.cells[9], "9");
        assert_eq!(result.column.len(), 10);
    }

    #[test]
    fn test_winsorize_clamps_both_tails() {
        let values: Vec<i32> = (1..=20).collect();
        let column = Column::from_values("v", &values);

        let result = winsorize_column(&column, 10.0).unwrap();

        // ranks 2 and 18 of 20
        assert_eq!(result.bounds.lower, 2.0);
        assert_eq!(result.bounds.upper, 18.0);
        assert_eq!(result.column.cells[0], "2");
        assert_eq!(result.column.cells[19], "18");
        assert_eq!(result.column.cells[10], "11");
        assert_eq!(result.clamped, 3);
    }

    #[test]
    fn test_winsorize_tail_counts() {
        let values: Vec<i32> = (1..=20).collect();
        let column = Column::from_values("v", &values);

        let result = winsorize_column(&column, 10.0).unwrap();
        let after = numeric_values(&result.column).unwrap();

        // ceil(0.1 * 20) - 1 below, floor(0.1 * 20) above
        let low = values.iter().zip(&after).filter(|&(&b, a)| a.unwrap() > b as f64).count();
        let high = values.iter().zip(&after).filter(|&(&b, a)| a.unwrap() < b as f64).count();
        assert_eq!(low, 1);
        assert_eq!(high, 2);
    }

    #[test]
    fn test_winsorize_bound_property() {
        let column = Column::from_values(
            "v",
            &[-50.0, 3.5, 2.25, 8.0, 1.0, 7.75, 4.0, 6.5, 5.0, 900.0, 0.5, 2.0],
        );
        let level = 20.0;

        let original = numeric_values(&column).unwrap();
        let bounds = clamp_bounds(&original, level).unwrap();
        let result = winsorize_column(&column, level).unwrap();
        let after = numeric_values(&result.column).unwrap();

        for (before, after) in original.iter().zip(&after) {
            let (before, after) = (before.unwrap(), after.unwrap());
            assert!(after >= bounds.lower && after <= bounds.upper);
            if before > bounds.lower && before < bounds.upper {
                assert_eq!(before, after);
            }
        }
    }

    #[test]
    fn test_winsorize_keeps_missing_and_original_text() {
        let column = Column::new(
            "v",
            ["1.50", "", "2.0", "NA", "3", "1000.000"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );

        let result = winsorize_column(&column, 25.0).unwrap();

        assert_eq!(result.column.cells, vec!["1.50", "", "2.0", "NA", "3", "3"]);
        assert_eq!(result.after.max, 3.0);
    }

    #[test]
    fn test_winsorize_level_zero_is_identity() {
        let result = winsorize_column(&outlier_column(), 0.0).unwrap();

        assert_eq!(result.column, outlier_column());
        assert_eq!(result.before, result.after);
        assert_eq!(result.clamped, 0);
    }

    #[test]
    fn test_winsorize_non_numeric_column() {
        let column = Column::from_values("name", &["a", "b"]);

        match winsorize_column(&column, 5.0) {
            Err(TransformError::NonNumeric { column, row, value }) => {
                assert_eq!(column, "name");
                assert_eq!(row, 0);
                assert_eq!(value, "a");
            }
            other => panic!("Expected NonNumeric error, got {:?}", other),
        }
    }

    #[test]
    fn test_winsorize_empty_column() {
        let column = Column::from_values("v", &["", "NA"]);

        let result = winsorize_column(&column, 5.0);
        assert_eq!(result, Err(TransformError::NoNumericValues("v".to_string())));
    }
}
