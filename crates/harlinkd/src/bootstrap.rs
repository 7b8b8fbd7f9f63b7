//! Host bootstrap: configuration, telemetry, and collaborator wiring.

use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use harlink_config::{Config, ConfigError};

use crate::dispatch::{HostContext, HostLoop};
use crate::engine::ProcessEngine;
use crate::session::RunRegistry;
use crate::store::FsRunStore;
use crate::telemetry::{self, TelemetryError};

const BOOTSTRAP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bootstrap");

/// Source of the host configuration.
///
/// The indirection exists for tests: production code loads from the
/// filesystem, tests inject a fabricated [`Config`].
pub trait ConfigLoader {
    /// Loads the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a configuration file exists but cannot
    /// be read or parsed.
    fn load(&self) -> Result<Config, ConfigError>;
}

/// Loads the configuration from the default system locations.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Config::load()
    }
}

/// Serves a pre-built configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Creates a loader serving `config`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Ok(self.config.clone())
    }
}

/// Errors raised while bringing the host up.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Loading the configuration failed.
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    /// Installing telemetry failed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    /// The data directory could not be created.
    #[error("failed to create data directory '{path}': {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Builds a ready-to-run host loop from the given configuration source.
///
/// Telemetry is installed before anything else can fail, so later
/// bootstrap failures are logged as well as returned.
///
/// # Errors
///
/// Returns [`BootstrapError`] if configuration loading, telemetry
/// installation, or data directory creation fails.
pub fn bootstrap_with(loader: &dyn ConfigLoader) -> Result<HostLoop, BootstrapError> {
    let config = loader.load()?;
    telemetry::initialise(&config)?;

    let data_dir = config.data_dir().to_path_buf();
    fs::create_dir_all(&data_dir).map_err(|source| BootstrapError::DataDir {
        path: data_dir.clone(),
        source,
    })?;

    info!(
        target: BOOTSTRAP_TARGET,
        data_dir = %data_dir.display(),
        config_path = config.source_path().map(|path| path.display().to_string()),
        agent_command = %config.agent_command,
        "host configured"
    );

    let engine = ProcessEngine::from_config(&config);
    let context = HostContext {
        store: Box::new(FsRunStore::new(&data_dir)),
        registry: RunRegistry::new(data_dir.join("runs.json")),
        generation: Box::new(engine.clone()),
        chat: Box::new(engine),
        config,
    };
    Ok(HostLoop::new(context))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn bootstrap_creates_the_data_directory() {
        let dir = TempDir::new().expect("temp dir");
        let mut config = Config::default();
        config.data_dir = dir.path().join("nested").join("data");

        bootstrap_with(&StaticConfigLoader::new(config.clone())).expect("bootstrap");
        assert!(config.data_dir.is_dir());
    }

    #[test]
    fn bootstrap_surfaces_data_dir_failures() {
        let dir = TempDir::new().expect("temp dir");
        let blocker = dir.path().join("occupied");
        fs::write(&blocker, b"file").expect("write blocker");

        let mut config = Config::default();
        config.data_dir = blocker.join("data");
        let error = bootstrap_with(&StaticConfigLoader::new(config))
            .err()
            .expect("bootstrap should fail when the data dir is blocked");
        assert!(matches!(error, BootstrapError::DataDir { .. }));
    }
}
