use std::env;
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default external agent command invoked by the engines.
pub const DEFAULT_AGENT_COMMAND: &str = "pi";

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::default()
}

/// Default agent command as an owned string.
#[must_use]
pub fn default_agent_command() -> String {
    DEFAULT_AGENT_COMMAND.to_owned()
}

/// Default root directory for run artefacts.
#[must_use]
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(env::temp_dir)
        .join(".harlink")
}

/// Default tool allowlist forwarded to the chat engine.
#[must_use]
pub fn default_allowed_tools() -> Vec<String> {
    ["Read", "Write", "Bash", "Glob", "Grep"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}
