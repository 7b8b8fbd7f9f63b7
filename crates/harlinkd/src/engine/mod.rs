//! External agent engine collaborators.
//!
//! The host treats the agent as an opaque producer of ordered events: the
//! generation engine yields progress updates then completes, and the chat
//! engine yields incremental agent events (text, thinking, tool use, tool
//! results) before finishing. The traits here are the narrow interface the
//! protocol engine consumes; [`ProcessEngine`] adapts them onto an external
//! agent command.

mod process;

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use self::process::ProcessEngine;

/// One incremental unit of agent progress, as carried on the wire inside
/// `agent_event` responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A block of assistant text.
    Text { content: String },
    /// A block of assistant thinking.
    Thinking { content: String },
    /// The agent invoked a tool.
    ToolUse {
        tool_name: String,
        tool_input: Map<String, Value>,
    },
    /// A tool returned a result to the agent.
    ToolResult {
        tool_name: String,
        is_error: bool,
        output: String,
    },
    /// The agent finished its turn.
    Done {
        is_error: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        cost: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
        /// Numeric usage counters reported by the engine, preserved
        /// verbatim under their original keys.
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        usage: BTreeMap<String, f64>,
    },
    /// The engine failed mid-operation.
    Error { message: String },
}

/// One event from a generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GenerationEvent {
    /// Incremental progress with a percentage and a short description.
    Progress { percent: u8, message: String },
    /// The generation finished successfully.
    Complete,
}

/// Parameters for one generation run.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub run_id: String,
    pub capture_path: PathBuf,
    pub output_dir: PathBuf,
    pub model: Option<String>,
}

/// Parameters for one chat turn.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub run_id: String,
    pub prompt: String,
    pub capture_path: PathBuf,
    pub scripts_dir: PathBuf,
    pub model: Option<String>,
    pub allowed_tools: Vec<String>,
}

/// Ordered stream of agent events from a chat turn.
pub type AgentEventStream = Box<dyn Iterator<Item = Result<AgentEvent, EngineError>> + Send>;

/// Ordered stream of events from a generation run.
pub type GenerationStream = Box<dyn Iterator<Item = Result<GenerationEvent, EngineError>> + Send>;

/// Drives one API-client generation run against a stored capture.
#[cfg_attr(test, mockall::automock)]
pub trait GenerationEngine: Send {
    /// Starts a generation run, returning its ordered event stream.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the run cannot be started.
    fn generate(&self, request: GenerateRequest) -> Result<GenerationStream, EngineError>;
}

/// Drives one agent chat turn with tool use.
#[cfg_attr(test, mockall::automock)]
pub trait ChatEngine: Send {
    /// Starts a chat turn, returning its ordered event stream.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the turn cannot be started.
    fn chat(&self, request: ChatRequest) -> Result<AgentEventStream, EngineError>;
}

/// Errors surfaced by the agent engines.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The agent command could not be launched.
    #[error("failed to launch agent command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    /// Reading the agent's event stream failed.
    #[error("agent stream error: {0}")]
    Io(#[from] io::Error),
    /// The agent violated the event protocol.
    #[error("agent protocol error: {message}")]
    Protocol { message: String },
    /// The agent reported failure or exited abnormally.
    #[error("agent failed: {message}")]
    Failed { message: String },
}

impl EngineError {
    /// Creates a protocol violation error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an engine failure error.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}
