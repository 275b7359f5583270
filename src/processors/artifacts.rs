//! Output locations for processed datasets and comparison images.

use std::path::{Path, PathBuf};

use log::debug;
use uuid::Uuid;

use crate::config::{ArtifactLayout, OutputConfig};
use crate::core::writers::{copy_artifact, WriteError};

/// Sub-directory holding per-session namespaces.
const RUNS_DIR: &str = "runs";

/// Sub-directory holding the copy of the most recent artifacts.
const LATEST_DIR: &str = "latest";

/// Paths of the two files produced by one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub dataset: PathBuf,
    pub plot: PathBuf,
}

/// Resolves artifact paths for one session.
///
/// With [`ArtifactLayout::Session`] every store gets its own namespace, so
/// two sessions never write the same files while repeated runs of one
/// session overwrite their previous output.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    output_dir: PathBuf,
    dataset_file: String,
    plot_file: String,
    namespace: Option<String>,
    latest_alias: bool,
}

impl ArtifactStore {
    pub fn new(config: &OutputConfig) -> Self {
        let namespace = match config.layout {
            ArtifactLayout::Session => Some(Uuid::new_v4().to_string()),
            ArtifactLayout::Shared => None,
        };

        Self {
            output_dir: config.dir.clone(),
            dataset_file: config.dataset_file.clone(),
            plot_file: config.plot_file.clone(),
            namespace,
            latest_alias: config.latest_alias,
        }
    }

    /// The session identifier, if artifacts are namespaced.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Directory the artifacts of this store are written to.
    pub fn run_dir(&self) -> PathBuf {
        match &self.namespace {
            Some(id) => self.output_dir.join(RUNS_DIR).join(id),
            None => self.output_dir.clone(),
        }
    }

    pub fn paths(&self) -> ArtifactPaths {
        self.paths_in(&self.run_dir())
    }

    /// Paths of the "latest" alias.
    pub fn latest_paths(&self) -> ArtifactPaths {
        self.paths_in(&self.output_dir.join(LATEST_DIR))
    }

    fn paths_in(&self, dir: &Path) -> ArtifactPaths {
        ArtifactPaths {
            dataset: dir.join(&self.dataset_file),
            plot: dir.join(&self.plot_file),
        }
    }

    /// Copy finished artifacts to the "latest" alias when enabled.
    ///
    /// Returns the alias paths, or `None` when the alias is disabled.
    pub fn publish_latest(&self, produced: &ArtifactPaths) -> Result<Option<ArtifactPaths>, WriteError> {
        if !self.latest_alias {
            return Ok(None);
        }

        let latest = self.latest_paths();
        copy_artifact(&produced.dataset, &latest.dataset)?;
        copy_artifact(&produced.plot, &latest.plot)?;
        debug!("Published latest artifacts to {}", self.output_dir.join(LATEST_DIR).display());

        Ok(Some(latest))
    }
}
