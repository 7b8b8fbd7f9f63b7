//! Subprocess adapter for the agent engines.
//!
//! The external agent is a separate command (configured via
//! `agent_command`/`agent_args`) that emits one JSON event per stdout line:
//! generation runs emit `{"event":"progress",...}` lines followed by
//! `{"event":"complete"}`, and chat turns emit `event_type`-tagged agent
//! events. Lines that do not parse as events are skipped with a debug log so
//! a chatty CLI cannot corrupt the stream. The child's stderr is inherited
//! and therefore lands in the host's own stderr log.

use std::io::{self, BufRead, BufReader, Write};
use std::marker::PhantomData;
use std::process::{Child, ChildStdout, Command, Stdio};

use serde::de::DeserializeOwned;
use tracing::debug;

use harlink_config::Config;

use super::{
    AgentEventStream, ChatEngine, ChatRequest, EngineError, GenerateRequest, GenerationEngine,
    GenerationStream,
};

const ENGINE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::engine");

/// Agent engine that shells out to the configured agent command.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    command: String,
    base_args: Vec<String>,
}

impl ProcessEngine {
    /// Creates an engine invoking `command` with `base_args` prepended to
    /// every run.
    #[must_use]
    pub fn new(command: impl Into<String>, base_args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            base_args,
        }
    }

    /// Creates an engine from the host configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.agent_command.clone(), config.agent_args.clone())
    }

    fn spawn(&self, args: &[String], stdin: Stdio) -> Result<Child, EngineError> {
        Command::new(&self.command)
            .args(&self.base_args)
            .args(args)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| EngineError::Spawn {
                command: self.command.clone(),
                source,
            })
    }
}

impl GenerationEngine for ProcessEngine {
    fn generate(&self, request: GenerateRequest) -> Result<GenerationStream, EngineError> {
        let mut args = vec![
            "generate".to_owned(),
            "--capture".to_owned(),
            request.capture_path.display().to_string(),
            "--output-dir".to_owned(),
            request.output_dir.display().to_string(),
        ];
        if let Some(model) = &request.model {
            args.push("--model".to_owned());
            args.push(model.clone());
        }

        let child = self.spawn(&args, Stdio::null())?;
        Ok(Box::new(EventLines::over(child)?))
    }
}

impl ChatEngine for ProcessEngine {
    fn chat(&self, request: ChatRequest) -> Result<AgentEventStream, EngineError> {
        let mut args = vec![
            "chat".to_owned(),
            "--capture".to_owned(),
            request.capture_path.display().to_string(),
            "--output-dir".to_owned(),
            request.scripts_dir.display().to_string(),
        ];
        if let Some(model) = &request.model {
            args.push("--model".to_owned());
            args.push(model.clone());
        }
        if !request.allowed_tools.is_empty() {
            args.push("--tools".to_owned());
            args.push(request.allowed_tools.join(","));
        }

        let mut child = self.spawn(&args, Stdio::piped())?;
        // The prompt is fed once and stdin closed before the event stream is
        // consumed; the agent reads it to completion before emitting events.
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(request.prompt.as_bytes())?;
            stdin.write_all(b"\n")?;
        }
        Ok(Box::new(EventLines::over(child)?))
    }
}

/// Iterator draining JSON events from a child's stdout, one per line.
///
/// When the stream ends the child is reaped; a non-zero exit is surfaced as
/// one final [`EngineError::Failed`] item.
struct EventLines<T> {
    lines: io::Lines<BufReader<ChildStdout>>,
    child: Child,
    finished: bool,
    reaped: bool,
    _event: PhantomData<T>,
}

impl<T> EventLines<T> {
    fn over(mut child: Child) -> Result<Self, EngineError> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::protocol("agent stdout was not captured"))?;
        Ok(Self {
            lines: BufReader::new(stdout).lines(),
            child,
            finished: false,
            reaped: false,
            _event: PhantomData,
        })
    }

    fn reap(&mut self) -> Option<EngineError> {
        self.reaped = true;
        match self.child.wait() {
            Ok(status) if status.success() => None,
            Ok(status) => Some(EngineError::failed(format!("agent exited with {status}"))),
            Err(error) => Some(error.into()),
        }
    }
}

impl<T> Drop for EventLines<T> {
    // A stream dropped before exhaustion still holds a live child; the
    // host runs for the browser's whole session, so an unreaped child is
    // a zombie for that lifetime.
    fn drop(&mut self) {
        if !self.reaped {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

impl<T: DeserializeOwned> Iterator for EventLines<T> {
    type Item = Result<T, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            match self.lines.next() {
                Some(Ok(line)) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<T>(trimmed) {
                        Ok(event) => return Some(Ok(event)),
                        Err(error) => {
                            debug!(
                                target: ENGINE_TARGET,
                                %error,
                                "skipping unrecognised engine output line"
                            );
                        }
                    }
                }
                Some(Err(error)) => {
                    self.finished = true;
                    return Some(Err(error.into()));
                }
                None => {
                    self.finished = true;
                    return self.reap().map(Err);
                }
            }
        }
    }
}
