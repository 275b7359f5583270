//! Session controller: the two user-facing triggers.
//!
//! `list_columns` and `process` are independent; each reloads the file it is
//! given. Failures never escape as `Err`: they are reported in the first
//! output slot, with the remaining slots left empty.

use std::path::{Path, PathBuf};

use log::{error, info};

use crate::config::WinsorConfig;
use crate::core::loaders::Table;

use super::artifacts::ArtifactStore;
use super::columns;
use super::winsorizer::{self, StatisticsTable, WinsorError, WinsorizeOutput};

/// First output slot of a process request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSlot {
    /// Path of the processed dataset.
    Artifact(PathBuf),
    /// Error message shown in place of the dataset.
    Error(String),
}

/// The four outputs of a process request.
#[derive(Debug, Clone)]
pub struct ProcessResponse {
    pub file: FileSlot,
    pub preview: Option<Table>,
    pub statistics: Option<StatisticsTable>,
    pub plot: Option<PathBuf>,
}

impl ProcessResponse {
    fn failure(message: String) -> Self {
        Self {
            file: FileSlot::Error(message),
            preview: None,
            statistics: None,
            plot: None,
        }
    }

    /// The error message, if the request failed.
    pub fn error(&self) -> Option<&str> {
        match &self.file {
            FileSlot::Error(message) => Some(message),
            FileSlot::Artifact(_) => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.file, FileSlot::Artifact(_))
    }
}

impl From<WinsorizeOutput> for ProcessResponse {
    fn from(output: WinsorizeOutput) -> Self {
        Self {
            file: FileSlot::Artifact(output.dataset_path),
            preview: Some(output.preview),
            statistics: Some(output.statistics),
            plot: Some(output.plot_path),
        }
    }
}

/// Message shown for a failed request.
fn error_message(err: &WinsorError) -> String {
    match err {
        WinsorError::MissingColumns { .. } => format!("Error: {}", err),
        other => other.to_string(),
    }
}

/// One user session: configuration plus its artifact namespace.
#[derive(Debug, Clone)]
pub struct Session {
    config: WinsorConfig,
    artifacts: ArtifactStore,
}

impl Session {
    pub fn new(config: WinsorConfig) -> Self {
        let artifacts = ArtifactStore::new(&config.output);
        if let Some(id) = artifacts.namespace() {
            info!("Started session {}", id);
        }
        Self { config, artifacts }
    }

    pub fn config(&self) -> &WinsorConfig {
        &self.config
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Trigger "list": column names of `path`, or the load error text.
    pub fn list_columns(&self, path: &Path) -> String {
        columns::list_columns(path)
    }

    /// Trigger "process": winsorize `columns` of `path` at `level` percent.
    pub fn process(&self, path: &Path, columns: &str, level: f64) -> ProcessResponse {
        match self.try_process(path, columns, level) {
            Ok(output) => output.into(),
            Err(e) => {
                error!("Processing {} failed: {}", path.display(), e);
                ProcessResponse::failure(error_message(&e))
            }
        }
    }

    /// Like [`Session::process`] but returns the typed error.
    pub fn try_process(&self, path: &Path, columns: &str, level: f64) -> Result<WinsorizeOutput, WinsorError> {
        let paths = self.artifacts.paths();
        let output = winsorizer::winsorize_file(
            path,
            columns,
            level,
            &paths,
            &self.config.plot,
            self.config.defaults.preview_rows,
        )?;

        self.artifacts.publish_latest(&paths)?;
        Ok(output)
    }
}
