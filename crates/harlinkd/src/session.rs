//! Per-process session state and the run registry.
//!
//! The session tracks the "current" run: the identifier most recently
//! associated with the host by a successful capture upload, generation, or
//! chat turn. Handlers that need a run id but were not given one fall back
//! to it. The state is an explicit value threaded through dispatch rather
//! than a global, so tests can fabricate sessions freely; the
//! one-request-at-a-time dispatch policy means it needs no synchronisation.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

/// Mutable per-process session state.
#[derive(Debug, Default, Clone)]
pub struct SessionState {
    current_run_id: Option<String>,
}

impl SessionState {
    /// Creates an empty session with no current run.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current run identifier, if one has been established.
    #[must_use]
    pub fn current_run_id(&self) -> Option<&str> {
        self.current_run_id.as_deref()
    }

    /// Associates the session with a run.
    pub fn set_current_run(&mut self, run_id: impl Into<String>) {
        self.current_run_id = Some(run_id.into());
    }

    /// Resolves a run identifier: an explicit one wins, otherwise the
    /// session's current run.
    #[must_use]
    pub fn resolve_run_id(&self, explicit: Option<&str>) -> Option<String> {
        explicit
            .map(str::to_owned)
            .or_else(|| self.current_run_id.clone())
    }
}

/// Metadata recorded for a completed run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunRecord {
    pub run_id: String,
    pub prompt: String,
    pub model: Option<String>,
    pub mode: String,
    pub created_at: u64,
}

impl RunRecord {
    /// Creates a record for a run driven through the extension.
    #[must_use]
    pub fn extension_run(run_id: impl Into<String>, prompt: impl Into<String>, model: Option<String>) -> Self {
        Self {
            run_id: run_id.into(),
            prompt: prompt.into(),
            model,
            mode: "extension".to_owned(),
            created_at: unix_timestamp(),
        }
    }
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

/// Persistent registry of completed runs.
///
/// Persistence is fire-and-forget: [`RunRegistry::record_run`] reports
/// failures so callers can log them, but a registry failure must never
/// abort a response that has already been computed.
#[derive(Debug, Clone)]
pub struct RunRegistry {
    path: PathBuf,
}

impl RunRegistry {
    /// Creates a registry stored at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Records a run, replacing any earlier record with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the registry file cannot be read or
    /// written.
    pub fn record_run(&self, record: RunRecord) -> Result<(), RegistryError> {
        let mut records = self.load()?;
        records.retain(|existing| existing.run_id != record.run_id);
        records.push(record);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| RegistryError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let payload = serde_json::to_vec_pretty(&records)?;
        fs::write(&self.path, payload).map_err(|source| RegistryError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// Records a run, demoting any failure to a warning.
    pub fn record_run_best_effort(&self, record: RunRecord) {
        if let Err(error) = self.record_run(record) {
            warn!(target: SESSION_TARGET, %error, "failed to record run");
        }
    }

    /// Loads all recorded runs; a missing file is an empty registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the registry file exists but cannot be
    /// read or parsed.
    pub fn load(&self) -> Result<Vec<RunRecord>, RegistryError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path).map_err(|source| RegistryError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Errors surfaced by the run registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Reading or writing the registry file failed.
    #[error("registry IO error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The registry file is not valid JSON.
    #[error("registry serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn explicit_run_id_wins_over_session() {
        let mut session = SessionState::new();
        session.set_current_run("session-run");
        assert_eq!(
            session.resolve_run_id(Some("explicit")),
            Some("explicit".to_owned())
        );
    }

    #[test]
    fn falls_back_to_current_run() {
        let mut session = SessionState::new();
        assert_eq!(session.resolve_run_id(None), None);

        session.set_current_run("r1");
        assert_eq!(session.resolve_run_id(None), Some("r1".to_owned()));
    }

    #[test]
    fn records_and_replaces_runs() {
        let dir = TempDir::new().expect("temp dir");
        let registry = RunRegistry::new(dir.path().join("runs.json"));

        registry
            .record_run(RunRecord::extension_run("r1", "first", None))
            .expect("record first");
        registry
            .record_run(RunRecord::extension_run("r2", "second", None))
            .expect("record second");
        registry
            .record_run(RunRecord::extension_run("r1", "replaced", None))
            .expect("replace first");

        let records = registry.load().expect("load records");
        assert_eq!(records.len(), 2);
        let replaced = records
            .iter()
            .find(|record| record.run_id == "r1")
            .expect("r1 present");
        assert_eq!(replaced.prompt, "replaced");
    }

    #[test]
    fn best_effort_recording_swallows_failures() {
        let dir = TempDir::new().expect("temp dir");
        let file_as_dir = dir.path().join("not-a-dir");
        std::fs::write(&file_as_dir, b"occupied").expect("write blocker");

        // Parent path is a file, so writing must fail; this must not panic.
        let registry = RunRegistry::new(file_as_dir.join("runs.json"));
        registry.record_run_best_effort(RunRecord::extension_run("r1", "p", None));
    }
}
