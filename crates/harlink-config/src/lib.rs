//! Shared configuration for the harlink binaries.
//!
//! The native messaging host is launched by the browser with a minimal
//! environment and no useful command line, so configuration comes from a
//! TOML file plus a small set of environment overrides. Both the host and
//! any tooling that inspects run artefacts need to agree on the directory
//! layout, which is derived here.

mod defaults;
mod logging;
mod paths;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_AGENT_COMMAND, DEFAULT_LOG_FILTER, default_agent_command, default_allowed_tools,
    default_data_dir, default_log_filter, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use paths::{InvalidRunId, RunPaths};

/// Environment variable naming an alternative configuration file.
pub const CONFIG_PATH_ENV: &str = "HARLINK_CONFIG";

/// Environment variable overriding the log filter expression.
pub const LOG_FILTER_ENV: &str = "HARLINK_LOG";

/// Resolved configuration shared by the host binaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log filter expression consumed by the tracing subscriber.
    pub log_filter: String,
    /// Output format for structured logs.
    pub log_format: LogFormat,
    /// Root directory for run artefacts (captures, generated scripts).
    pub data_dir: PathBuf,
    /// Default model forwarded to the agent engines when a request does not
    /// name one.
    pub model: Option<String>,
    /// External agent command invoked by the engines.
    pub agent_command: String,
    /// Extra arguments prepended to every engine invocation.
    pub agent_args: Vec<String>,
    /// Tool allowlist forwarded to the chat engine.
    pub allowed_tools: Vec<String>,
    /// Path the configuration was loaded from, if any.
    #[serde(skip)]
    source_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: defaults::default_log_filter_string(),
            log_format: default_log_format(),
            data_dir: default_data_dir(),
            model: None,
            agent_command: default_agent_command(),
            agent_args: Vec::new(),
            allowed_tools: default_allowed_tools(),
            source_path: None,
        }
    }
}

impl Config {
    /// Loads the configuration from the default location.
    ///
    /// The path is taken from [`CONFIG_PATH_ENV`] when set, otherwise
    /// `<config dir>/harlink/config.toml`. A missing file yields the
    /// defaults; a present but malformed file is an error so that a typo
    /// cannot silently revert the host to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or
    /// parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(default_config_path);
        Self::load_from(&path)
    }

    /// Loads the configuration from an explicit path, applying environment
    /// overrides afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or
    /// parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            let mut parsed: Self =
                toml::from_str(&content).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: Box::new(source),
                })?;
            parsed.source_path = Some(path.to_path_buf());
            parsed
        } else {
            Self::default()
        };

        if let Some(filter) = env::var_os(LOG_FILTER_ENV) {
            config.log_filter = filter.to_string_lossy().into_owned();
        }
        Ok(config)
    }

    /// Log filter expression for the tracing subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Output format for structured logs.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Root directory for run artefacts.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path the configuration was loaded from, if a file was present.
    #[must_use]
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Derives the artefact paths for a run.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRunId`] if the run identifier cannot be used as a
    /// path component.
    pub fn run_paths(&self, run_id: &str) -> Result<RunPaths, InvalidRunId> {
        RunPaths::for_run(&self.data_dir, run_id)
    }
}

/// Default configuration file path.
#[must_use]
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(env::temp_dir)
        .join("harlink")
        .join("config.toml")
}

/// Errors raised while loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("failed to read configuration file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The configuration file exists but is not valid TOML.
    #[error("failed to parse configuration file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },
}
