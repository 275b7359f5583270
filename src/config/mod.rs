//! Configuration types for the winsorization tool.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Defaults applied to requests that leave a value unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Clamp level in percent, applied to both tails
    #[serde(default = "default_level")]
    pub level: f64,

    /// Number of rows shown in the preview of the processed table
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

fn default_level() -> f64 {
    5.0
}

fn default_preview_rows() -> usize {
    5
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            preview_rows: default_preview_rows(),
        }
    }
}

/// Where artifacts of a run are placed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactLayout {
    /// `<dir>/runs/<session-id>/<file>`, one namespace per session
    #[default]
    Session,
    /// `<dir>/<file>`, shared by every session
    Shared,
}

/// Configuration for output artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Base output directory
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// File name of the processed dataset
    #[serde(default = "default_dataset_file")]
    pub dataset_file: String,

    /// File name of the comparison image
    #[serde(default = "default_plot_file")]
    pub plot_file: String,

    #[serde(default)]
    pub layout: ArtifactLayout,

    /// Also copy the last successful artifacts to `<dir>/latest/`
    #[serde(default)]
    pub latest_alias: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_dataset_file() -> String {
    "winsorized_dataset.csv".to_string()
}

fn default_plot_file() -> String {
    "comparison_boxplots.png".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            dataset_file: default_dataset_file(),
            plot_file: default_plot_file(),
            layout: ArtifactLayout::default(),
            latest_alias: false,
        }
    }
}

/// Configuration for the comparison plot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotConfig {
    /// Width in pixels of each column's subplot
    #[serde(default = "default_column_width")]
    pub column_width: u32,

    /// Image height in pixels
    #[serde(default = "default_plot_height")]
    pub height: u32,

    /// Draw captions and axis labels
    #[serde(default = "default_annotate")]
    pub annotate: bool,

    /// TrueType font used for labels; common system fonts are tried when unset
    #[serde(default)]
    pub font: Option<PathBuf>,
}

fn default_column_width() -> u32 {
    600
}

fn default_plot_height() -> u32 {
    500
}

fn default_annotate() -> bool {
    true
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            column_width: default_column_width(),
            height: default_plot_height(),
            annotate: default_annotate(),
            font: None,
        }
    }
}

/// Main configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WinsorConfig {
    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub plot: PlotConfig,
}

impl WinsorConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: WinsorConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self).context("serializing config")?;
        std::fs::write(path, content)
            .with_context(|| format!("writing config {}", path.display()))?;
        Ok(())
    }
}
