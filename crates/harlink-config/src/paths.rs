//! Derives per-run artefact paths shared by the host and tooling.
//!
//! Each run owns a directory under the data root holding its capture and any
//! generated scripts. Run identifiers come from the extension, so they are
//! validated before being used as a path component.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// File name of the capture stored for a run.
const CAPTURE_FILE: &str = "recording.har";

/// Canonical artefact paths for a single run.
#[derive(Debug, Clone)]
pub struct RunPaths {
    run_dir: PathBuf,
}

impl RunPaths {
    /// Derives the artefact paths for `run_id` under `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRunId`] if the identifier is empty or contains path
    /// separators or parent-directory components.
    pub fn for_run(data_dir: &Path, run_id: &str) -> Result<Self, InvalidRunId> {
        validate_run_id(run_id)?;
        Ok(Self {
            run_dir: data_dir.join("runs").join(run_id),
        })
    }

    /// Directory owning all artefacts for this run.
    #[must_use]
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Directory holding the capture file.
    #[must_use]
    pub fn capture_dir(&self) -> PathBuf {
        self.run_dir.join("har")
    }

    /// Path of the capture file.
    #[must_use]
    pub fn capture_path(&self) -> PathBuf {
        self.capture_dir().join(CAPTURE_FILE)
    }

    /// Directory receiving generated scripts.
    #[must_use]
    pub fn scripts_dir(&self) -> PathBuf {
        self.run_dir.join("scripts")
    }
}

fn validate_run_id(run_id: &str) -> Result<(), InvalidRunId> {
    if run_id.is_empty() {
        return Err(InvalidRunId::empty());
    }
    let has_separator = run_id
        .chars()
        .any(|c| c == '/' || c == '\\' || c == '\0');
    if has_separator || run_id == "." || run_id == ".." {
        return Err(InvalidRunId::unsafe_component(run_id));
    }
    Ok(())
}

/// Error raised when a run identifier cannot be used as a path component.
#[derive(Debug, Error)]
pub enum InvalidRunId {
    /// The identifier was empty.
    #[error("run identifier is empty")]
    Empty,
    /// The identifier would escape the runs directory.
    #[error("run identifier '{run_id}' is not a safe path component")]
    UnsafeComponent { run_id: String },
}

impl InvalidRunId {
    const fn empty() -> Self {
        Self::Empty
    }

    fn unsafe_component(run_id: impl Into<String>) -> Self {
        Self::UnsafeComponent {
            run_id: run_id.into(),
        }
    }
}
