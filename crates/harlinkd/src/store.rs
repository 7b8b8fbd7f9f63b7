//! Run-artifact store.
//!
//! Each run owns a directory under the configured data root holding its
//! capture and generated scripts. The store is the only component that
//! touches those paths; handlers consume it through the [`RunStore`] trait
//! so tests can substitute a fabricated store.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use harlink_config::{InvalidRunId, RunPaths};

/// Narrow interface over run artefact persistence.
pub trait RunStore: Send {
    /// Reports whether a capture has been saved for the run.
    fn has_capture(&self, run_id: &str) -> bool;

    /// Path of the run's capture file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the run identifier is invalid.
    fn capture_path(&self, run_id: &str) -> Result<PathBuf, StoreError>;

    /// Directory receiving the run's generated scripts, created on demand.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the run identifier is invalid or the
    /// directory cannot be created.
    fn scripts_dir(&self, run_id: &str) -> Result<PathBuf, StoreError>;

    /// Persists a capture for the run, returning the file path.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the capture cannot be written.
    fn save_capture(&self, run_id: &str, har: &Value) -> Result<PathBuf, StoreError>;
}

/// Filesystem-backed run store rooted at the configured data directory.
#[derive(Debug, Clone)]
pub struct FsRunStore {
    data_dir: PathBuf,
}

impl FsRunStore {
    /// Creates a store rooted at `data_dir`.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn paths(&self, run_id: &str) -> Result<RunPaths, StoreError> {
        Ok(RunPaths::for_run(&self.data_dir, run_id)?)
    }
}

impl RunStore for FsRunStore {
    fn has_capture(&self, run_id: &str) -> bool {
        self.paths(run_id)
            .is_ok_and(|paths| paths.capture_path().exists())
    }

    fn capture_path(&self, run_id: &str) -> Result<PathBuf, StoreError> {
        Ok(self.paths(run_id)?.capture_path())
    }

    fn scripts_dir(&self, run_id: &str) -> Result<PathBuf, StoreError> {
        let dir = self.paths(run_id)?.scripts_dir();
        create_dir(&dir)?;
        Ok(dir)
    }

    fn save_capture(&self, run_id: &str, har: &Value) -> Result<PathBuf, StoreError> {
        let paths = self.paths(run_id)?;
        create_dir(&paths.capture_dir())?;

        let path = paths.capture_path();
        // Compact serialization: captures can be very large.
        let payload = serde_json::to_vec(har)?;
        fs::write(&path, payload).map_err(|source| StoreError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

fn create_dir(dir: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(dir).map_err(|source| StoreError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Errors surfaced by the run store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The run identifier cannot be used as a path component.
    #[error(transparent)]
    InvalidRunId(#[from] InvalidRunId),
    /// A run directory could not be created.
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Writing an artefact failed.
    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Serialising an artefact failed.
    #[error("failed to serialize capture: {0}")]
    Serialize(#[from] serde_json::Error),
}
