//! Winsorization of selected dataset columns.
//!
//! The pipeline runs strictly in sequence: load, parse the request, check
//! every selected column exists, clamp, then write the dataset and render
//! the comparison plot. Nothing is written unless every column could be
//! transformed.

use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use thiserror::Error;

use crate::config::PlotConfig;
use crate::core::loaders::{load_table, LoaderError, Table};
use crate::core::transforms::{winsorize_column, Summary, TransformError};
use crate::core::writers::{write_table_csv, WriteError};
use crate::visualization::{plot_comparison, VisualizationError};

use super::artifacts::ArtifactPaths;
use super::selection::{ClampLevel, ColumnSelection, SelectionError};

/// Errors that can occur while processing a winsorization request.
#[derive(Debug, Error)]
pub enum WinsorError {
    #[error(transparent)]
    Load(#[from] LoaderError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// The offending names are kept for callers and logs but are not part
    /// of the message.
    #[error("One or more specified variables do not exist in the dataset.")]
    MissingColumns { missing: Vec<String> },

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Plot(#[from] VisualizationError),
}

/// Result type for winsorization operations.
pub type Result<T> = std::result::Result<T, WinsorError>;

/// Whether a statistics record describes the raw or the clamped column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Before,
    After,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Before => write!(f, "Before"),
            Phase::After => write!(f, "After"),
        }
    }
}

/// Min, max and mean of one column in one phase.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsRecord {
    pub variable: String,
    pub phase: Phase,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl StatisticsRecord {
    fn new(variable: &str, phase: Phase, summary: Summary) -> Self {
        Self {
            variable: variable.to_string(),
            phase,
            min: summary.min,
            max: summary.max,
            mean: summary.mean,
        }
    }
}

/// Statistics of a run: for each selected column, its Before record
/// followed by its After record, in selection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticsTable {
    records: Vec<StatisticsRecord>,
}

impl StatisticsTable {
    pub const HEADERS: [&'static str; 5] = ["Variable", "Type", "Min", "Max", "Mean"];

    pub fn records(&self) -> &[StatisticsRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records of `variable`, as (before, after).
    pub fn get(&self, variable: &str) -> Option<(&StatisticsRecord, &StatisticsRecord)> {
        let pos = self
            .records
            .iter()
            .position(|r| r.variable == variable && r.phase == Phase::Before)?;
        Some((&self.records[pos], self.records.get(pos + 1)?))
    }

    /// Rows formatted for display, matching [`Self::HEADERS`].
    pub fn rows(&self) -> Vec<[String; 5]> {
        self.records
            .iter()
            .map(|r| {
                [
                    r.variable.clone(),
                    r.phase.to_string(),
                    format_stat(r.min),
                    format_stat(r.max),
                    format_stat(r.mean),
                ]
            })
            .collect()
    }

    fn push_pair(&mut self, variable: &str, before: Summary, after: Summary) {
        self.records.push(StatisticsRecord::new(variable, Phase::Before, before));
        self.records.push(StatisticsRecord::new(variable, Phase::After, after));
    }
}

/// Shortest text that round-trips the value.
fn format_stat(value: f64) -> String {
    format!("{}", value)
}

/// The transformed table and its statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Winsorization {
    pub table: Table,
    pub statistics: StatisticsTable,
}

/// Everything a successful request produces.
#[derive(Debug, Clone)]
pub struct WinsorizeOutput {
    pub dataset_path: PathBuf,
    pub preview: Table,
    pub statistics: StatisticsTable,
    pub plot_path: PathBuf,
}

/// Winsorize the selected columns of `table` without touching the filesystem.
///
/// All selected names are checked before any column is transformed. The
/// returned table is a copy in which only the selected columns differ.
pub fn winsorize_table(table: &Table, selection: &ColumnSelection, level: ClampLevel) -> Result<Winsorization> {
    let missing = selection.missing_from(table);
    if !missing.is_empty() {
        warn!("Unknown columns requested: {}", missing.join(", "));
        return Err(WinsorError::MissingColumns { missing });
    }

    let mut transformed = table.clone();
    let mut statistics = StatisticsTable::default();

    for name in selection.names() {
        // Presence was checked above; a repeated name re-reads the original column.
        let Some(column) = table.column(name) else {
            return Err(WinsorError::MissingColumns {
                missing: vec![name.clone()],
            });
        };

        let result = winsorize_column(column, level.percent())?;
        debug!(
            "Column '{}': bounds [{}, {}], {} value(s) clamped",
            name, result.bounds.lower, result.bounds.upper, result.clamped
        );

        statistics.push_pair(name, result.before, result.after);
        if !transformed.replace_column(result.column) {
            return Err(WinsorError::MissingColumns {
                missing: vec![name.clone()],
            });
        }
    }

    Ok(Winsorization {
        table: transformed,
        statistics,
    })
}

/// Run the full request: load `path`, winsorize `columns` at `level` percent,
/// write the processed dataset and the comparison plot to `artifacts`.
///
/// # Arguments
///
/// * `path` - CSV file to process
/// * `columns` - Comma-separated column names
/// * `level` - Clamp level in percent, in [0, 50)
/// * `artifacts` - Where the dataset and plot are written (overwritten)
/// * `plot` - Plot rendering options
/// * `preview_rows` - Number of rows kept in the returned preview
pub fn winsorize_file(
    path: &Path,
    columns: &str,
    level: f64,
    artifacts: &ArtifactPaths,
    plot: &PlotConfig,
    preview_rows: usize,
) -> Result<WinsorizeOutput> {
    let table = load_table(path)?;
    info!(
        "Loaded {} rows x {} columns from {}",
        table.num_rows(),
        table.num_columns(),
        path.display()
    );

    let selection = ColumnSelection::parse(columns)?;
    let level = ClampLevel::new(level)?;

    let Winsorization { table: transformed, statistics } = winsorize_table(&table, &selection, level)?;

    write_table_csv(&artifacts.dataset, &transformed)?;
    info!("Wrote processed dataset to {}", artifacts.dataset.display());

    plot_comparison(&artifacts.plot, &table, &transformed, selection.names(), plot)?;
    info!("Wrote comparison plot to {}", artifacts.plot.display());

    Ok(WinsorizeOutput {
        dataset_path: artifacts.dataset.clone(),
        preview: transformed.head(preview_rows),
        statistics,
        plot_path: artifacts.plot.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loaders::Column;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn quiet_plot() -> PlotConfig {
        PlotConfig {
            annotate: false,
            ..PlotConfig::default()
        }
    }

    fn sample_table() -> Table {
        Table::from_columns(vec![
            Column::from_values("id", &["r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10"]),
            Column::from_values("a", &[1, 2, 3, 4, 5, 6, 7, 8, 9, 100]),
            Column::from_values("b", &["-40", "1.0", "1.5", "2.0", "2.5", "3.0", "3.5", "4.0", "4.5", "5.0"]),
        ])
        .unwrap()
    }

    fn write_sample(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("input.csv");
        write_table_csv(&path, &sample_table()).unwrap();
        path
    }

    fn artifacts_in(dir: &TempDir) -> ArtifactPaths {
        ArtifactPaths {
            dataset: dir.path().join("out").join("winsorized_dataset.csv"),
            plot: dir.path().join("out").join("comparison_boxplots.png"),
        }
    }

    #[test]
    fn test_repeated_column_is_clamped_once() {
        let level = ClampLevel::new(10.0).unwrap();
        let once = winsorize_table(&sample_table(), &ColumnSelection::parse("a").unwrap(), level).unwrap();
        let twice = winsorize_table(&sample_table(), &ColumnSelection::parse("a, a").unwrap(), level).unwrap();

        assert_eq!(twice.table, once.table);
        assert_eq!(twice.statistics.len(), 4);
        assert_eq!(twice.statistics.records()[0], twice.statistics.records()[2]);
        assert_eq!(twice.statistics.records()[1], twice.statistics.records()[3]);
        assert!(StatisticsTable::default().is_empty());
        assert!(!twice.statistics.is_empty());
    }

    #[test]
    fn test_statistics_order_follows_selection() {
        let selection = ColumnSelection::parse("b, a").unwrap();
        let result = winsorize_table(&sample_table(), &selection, ClampLevel::new(10.0).unwrap()).unwrap();

        let order: Vec<(&str, Phase)> = result
            .statistics
            .records()
            .iter()
            .map(|r| (r.variable.as_str(), r.phase))
            .collect();
        assert_eq!(
            order,
            vec![
                ("b", Phase::Before),
                ("b", Phase::After),
                ("a", Phase::Before),
                ("a", Phase::After),
            ]
        );
    }

    #[test]
    fn test_scenario_single_outlier() {
        let table = Table::from_columns(vec![Column::from_values("x", &[1, 2, 3, 4, 5, 6, 7, 8, 9, 100])]).unwrap();
        let selection = ColumnSelection::parse("x").unwrap();

        let result = winsorize_table(&table, &selection, ClampLevel::new(10.0).unwrap()).unwrap();
        let (before, after) = result.statistics.get("x").unwrap();

        assert_eq!(before.phase, Phase::Before);
        assert_eq!(after.phase, Phase::After);
        assert_eq!(after.max, 9.0);
        assert_eq!(after.min, before.min);
        assert_eq!(result.statistics.len(), 2);
        assert_eq!(result.table.num_rows(), 10);
    }

    #[test]
    fn test_unselected_columns_untouched() {
        let table = sample_table();
        let selection = ColumnSelection::parse("a").unwrap();

        let result = winsorize_table(&table, &selection, ClampLevel::new(10.0).unwrap()).unwrap();

        assert_eq!(result.table.column_names(), table.column_names());
        assert_eq!(result.table.num_rows(), table.num_rows());
        assert_eq!(result.table.column("id"), table.column("id"));
        assert_eq!(result.table.column("b"), table.column("b"));
        assert_ne!(result.table.column("a"), table.column("a"));
    }

    #[test]
    fn test_missing_column_is_reported() {
        let selection = ColumnSelection::parse("a, nope, b, gone").unwrap();

        match winsorize_table(&sample_table(), &selection, ClampLevel::default()) {
            Err(WinsorError::MissingColumns { missing }) => {
                assert_eq!(missing, vec!["nope", "gone"]);
            }
            other => panic!("Expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_column_fails() {
        let selection = ColumnSelection::parse("id").unwrap();

        let result = winsorize_table(&sample_table(), &selection, ClampLevel::default());
        assert!(matches!(result, Err(WinsorError::Transform(TransformError::NonNumeric { .. }))));
    }

    #[test]
    fn test_statistics_rows() {
        let table = Table::from_columns(vec![Column::from_values("x", &[1, 2, 3, 4, 5, 6, 7, 8, 9, 100])]).unwrap();
        let selection = ColumnSelection::parse("x").unwrap();

        let result = winsorize_table(&table, &selection, ClampLevel::new(10.0).unwrap()).unwrap();
        let rows = result.statistics.rows();

        assert_eq!(rows[0], ["x", "Before", "1", "100", "14.5"].map(String::from));
        assert_eq!(rows[1], ["x", "After", "1", "9", "5.4"].map(String::from));
    }

    #[test]
    fn test_winsorize_file_writes_artifacts() {
        let dir = tempdir().unwrap();
        let input = write_sample(&dir);
        let artifacts = artifacts_in(&dir);

        let output = winsorize_file(&input, "a, b", 10.0, &artifacts, &quiet_plot(), 5).unwrap();

        assert_eq!(output.dataset_path, artifacts.dataset);
        assert_eq!(output.plot_path, artifacts.plot);
        assert_eq!(output.preview.num_rows(), 5);
        assert_eq!(output.statistics.len(), 4);

        let written = load_table(&artifacts.dataset).unwrap();
        assert_eq!(written.num_rows(), 10);
        assert_eq!(written.column("a").unwrap().cells[9], "9");
        // nearest-rank 10th percentile of ten values is the minimum
        assert_eq!(written.column("b").unwrap().cells[0], "-40");
        assert_eq!(written.column("b").unwrap().cells[9], "4.5");
        assert_eq!(written.column("id"), sample_table().column("id"));
        assert!(artifacts.plot.exists());
    }

    #[test]
    fn test_winsorize_file_is_idempotent() {
        let dir = tempdir().unwrap();
        let input = write_sample(&dir);
        let artifacts = artifacts_in(&dir);

        let first = winsorize_file(&input, "a,b", 10.0, &artifacts, &quiet_plot(), 5).unwrap();
        let first_csv = fs::read_to_string(&artifacts.dataset).unwrap();
        let second = winsorize_file(&input, "a,b", 10.0, &artifacts, &quiet_plot(), 5).unwrap();
        let second_csv = fs::read_to_string(&artifacts.dataset).unwrap();

        assert_eq!(first.statistics, second.statistics);
        assert_eq!(first.preview, second.preview);
        assert_eq!(first_csv, second_csv);
    }

    #[test]
    fn test_winsorize_file_validation_writes_nothing() {
        let dir = tempdir().unwrap();
        let input = write_sample(&dir);
        let artifacts = artifacts_in(&dir);

        let result = winsorize_file(&input, "a, missing", 10.0, &artifacts, &quiet_plot(), 5);

        assert!(matches!(result, Err(WinsorError::MissingColumns { .. })));
        assert!(!artifacts.dataset.exists());
        assert!(!artifacts.plot.exists());
    }

    #[test]
    fn test_winsorize_file_rejects_bad_inputs() {
        let dir = tempdir().unwrap();
        let input = write_sample(&dir);
        let artifacts = artifacts_in(&dir);

        let result = winsorize_file(&input, "a,,b", 10.0, &artifacts, &quiet_plot(), 5);
        assert!(matches!(result, Err(WinsorError::Selection(SelectionError::EmptyName { position: 2 }))));

        let result = winsorize_file(&input, "a", 75.0, &artifacts, &quiet_plot(), 5);
        assert!(matches!(result, Err(WinsorError::Selection(SelectionError::InvalidLevel(_)))));

        let result = winsorize_file(&dir.path().join("absent.csv"), "a", 5.0, &artifacts, &quiet_plot(), 5);
        assert!(matches!(result, Err(WinsorError::Load(LoaderError::Io(_)))));

        assert!(!artifacts.dataset.exists());
    }
}
