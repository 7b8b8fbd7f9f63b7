//! Streaming bridge between the agent engines and the wire.
//!
//! The bridge drains an engine's event stream, rewrites each event into its
//! wire shape, and frames it through the shared response writer before the
//! handler's terminal response is produced. Large payloads are trimmed here:
//! the extension's side panel shows previews, not transcripts, so thinking
//! blocks, tool results, and tool inputs are truncated to fixed budgets
//! while assistant text passes through untouched.

use std::collections::BTreeMap;
use std::io::Write;

use serde_json::{Map, Value};
use tracing::debug;

use crate::dispatch::{DispatchError, Response, ResponseWriter};
use crate::engine::{AgentEvent, AgentEventStream, EngineError, GenerationEvent, GenerationStream};

const BRIDGE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bridge");

/// Budget for thinking blocks and tool result output.
const PREVIEW_LIMIT: usize = 500;

/// Budget for shell commands in tool-use summaries.
const COMMAND_LIMIT: usize = 200;

/// Budget for string values in generic tool-use summaries and for file
/// content previews.
const STRING_LIMIT: usize = 100;

/// Budget for the replaced text in edit summaries.
const OLD_STRING_LIMIT: usize = 50;

/// What a completed chat turn left behind.
#[derive(Debug, Default)]
pub struct ChatOutcome {
    /// Assistant text blocks, concatenated in arrival order.
    pub final_text: String,
    /// Numeric usage counters reported by the engine, keys preserved
    /// verbatim.
    pub usage: BTreeMap<String, f64>,
}

/// Relays a chat turn's events to the wire, returning its outcome.
///
/// Every relayed frame carries the originating request's callback token.
/// A failing stream still produces a final `agent_event` error frame
/// before the failure propagates, so the client sees why the turn died.
///
/// # Errors
///
/// Returns [`DispatchError`] if the engine stream fails or a frame cannot
/// be written.
pub fn relay_chat<W: Write>(
    events: AgentEventStream,
    writer: &mut ResponseWriter<W>,
    callback_id: Option<&Value>,
) -> Result<ChatOutcome, DispatchError> {
    let mut outcome = ChatOutcome::default();

    for event in events {
        let event = match event {
            Ok(event) => event,
            Err(error) => {
                let notice = AgentEvent::Error {
                    message: error.to_string(),
                };
                writer.write(&Response::agent_event(notice), callback_id)?;
                return Err(error.into());
            }
        };

        match event {
            AgentEvent::Text { content } => {
                if !outcome.final_text.is_empty() {
                    outcome.final_text.push('\n');
                }
                outcome.final_text.push_str(&content);
                let relayed = AgentEvent::Text { content };
                writer.write(&Response::agent_event(relayed), callback_id)?;
            }
            AgentEvent::Thinking { content } => {
                let relayed = AgentEvent::Thinking {
                    content: truncate(&content, PREVIEW_LIMIT),
                };
                writer.write(&Response::agent_event(relayed), callback_id)?;
            }
            AgentEvent::ToolUse {
                tool_name,
                tool_input,
            } => {
                let summary = summarize_tool_input(&tool_name, &tool_input);
                let relayed = AgentEvent::ToolUse {
                    tool_name,
                    tool_input: summary,
                };
                writer.write(&Response::agent_event(relayed), callback_id)?;
            }
            AgentEvent::ToolResult {
                tool_name,
                is_error,
                output,
            } => {
                let relayed = AgentEvent::ToolResult {
                    tool_name,
                    is_error,
                    output: truncate(&output, PREVIEW_LIMIT),
                };
                writer.write(&Response::agent_event(relayed), callback_id)?;
            }
            AgentEvent::Done {
                is_error,
                cost,
                duration_ms,
                usage,
            } => {
                debug!(
                    target: BRIDGE_TARGET,
                    is_error,
                    cost,
                    duration_ms,
                    "chat turn finished"
                );
                for (key, value) in &usage {
                    *outcome.usage.entry(key.clone()).or_insert(0.0) += value;
                }
                // An error turn still completes normally: the frames already
                // relayed carry the detail, and the accumulated text (if any)
                // becomes the terminal response.
                let relayed = AgentEvent::Done {
                    is_error,
                    cost,
                    duration_ms,
                    usage,
                };
                writer.write(&Response::agent_event(relayed), callback_id)?;
            }
            AgentEvent::Error { message } => {
                let relayed = AgentEvent::Error {
                    message: message.clone(),
                };
                writer.write(&Response::agent_event(relayed), callback_id)?;
                return Err(EngineError::failed(message).into());
            }
        }
    }

    Ok(outcome)
}

/// Relays a generation run's progress to the wire.
///
/// # Errors
///
/// Returns [`DispatchError`] if the stream fails, a frame cannot be
/// written, or the stream ends without a completion event.
pub fn relay_generation<W: Write>(
    events: GenerationStream,
    writer: &mut ResponseWriter<W>,
    callback_id: Option<&Value>,
) -> Result<(), DispatchError> {
    for event in events {
        match event? {
            GenerationEvent::Progress { percent, message } => {
                writer.write(&Response::progress(percent, message), callback_id)?;
            }
            GenerationEvent::Complete => return Ok(()),
        }
    }
    Err(EngineError::protocol("generation stream ended without completion").into())
}

/// Reduces a tool invocation's input to the fields worth showing.
///
/// Known tools get a hand-picked summary; anything else keeps its input
/// with long string values truncated and non-strings passed through.
fn summarize_tool_input(tool_name: &str, input: &Map<String, Value>) -> Map<String, Value> {
    let mut summary = Map::new();
    match tool_name {
        "Read" | "Glob" | "Grep" => {
            copy_field(input, &mut summary, "file_path");
            copy_field(input, &mut summary, "pattern");
            copy_field(input, &mut summary, "path");
        }
        "Write" => {
            copy_field(input, &mut summary, "file_path");
            if let Some(content) = input.get("content").and_then(Value::as_str) {
                summary.insert("content_length".to_owned(), content.len().into());
                summary.insert(
                    "content_preview".to_owned(),
                    truncate(content, STRING_LIMIT).into(),
                );
            }
        }
        "Bash" => {
            if let Some(command) = input.get("command").and_then(Value::as_str) {
                summary.insert("command".to_owned(), truncate(command, COMMAND_LIMIT).into());
            }
        }
        "Edit" => {
            copy_field(input, &mut summary, "file_path");
            if let Some(old) = input.get("old_string").and_then(Value::as_str) {
                summary.insert(
                    "old_string".to_owned(),
                    truncate(old, OLD_STRING_LIMIT).into(),
                );
            }
        }
        _ => {
            for (key, value) in input {
                let trimmed = match value.as_str() {
                    Some(text) if text.chars().count() > STRING_LIMIT => {
                        truncate(text, STRING_LIMIT).into()
                    }
                    _ => value.clone(),
                };
                summary.insert(key.clone(), trimmed);
            }
        }
    }
    summary
}

fn copy_field(input: &Map<String, Value>, summary: &mut Map<String, Value>, key: &str) {
    if let Some(value) = input.get(key) {
        summary.insert(key.to_owned(), value.clone());
    }
}

/// Truncates on a character boundary, marking the cut with an ellipsis.
fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_owned();
    }
    let mut truncated: String = text.chars().take(limit).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::transport::read_frame;

    use super::*;

    fn frames(buffer: Vec<u8>) -> Vec<Value> {
        let mut reader = std::io::Cursor::new(buffer);
        let mut decoded = Vec::new();
        while let Some(payload) = read_frame(&mut reader).expect("read frame") {
            decoded.push(serde_json::from_slice(&payload).expect("valid JSON"));
        }
        decoded
    }

    fn chat_stream(events: Vec<Result<AgentEvent, EngineError>>) -> AgentEventStream {
        Box::new(events.into_iter())
    }

    #[test]
    fn text_is_relayed_untruncated_and_accumulated() {
        let long = "x".repeat(2_000);
        let mut buffer = Vec::new();
        let mut writer = ResponseWriter::new(&mut buffer);

        let outcome = relay_chat(
            chat_stream(vec![
                Ok(AgentEvent::Text {
                    content: long.clone(),
                }),
                Ok(AgentEvent::Text {
                    content: "done".to_owned(),
                }),
            ]),
            &mut writer,
            None,
        )
        .expect("relay");

        assert_eq!(outcome.final_text, format!("{long}\ndone"));
        let decoded = frames(buffer);
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0]["content"].as_str().expect("content"), long);
    }

    #[test]
    fn thinking_is_truncated() {
        let mut buffer = Vec::new();
        let mut writer = ResponseWriter::new(&mut buffer);

        relay_chat(
            chat_stream(vec![Ok(AgentEvent::Thinking {
                content: "t".repeat(PREVIEW_LIMIT + 10),
            })]),
            &mut writer,
            None,
        )
        .expect("relay");

        let decoded = frames(buffer);
        let content = decoded[0]["content"].as_str().expect("content");
        assert_eq!(content.chars().count(), PREVIEW_LIMIT + 3);
        assert!(content.ends_with("..."));
    }

    #[test]
    fn tool_results_are_truncated() {
        let mut buffer = Vec::new();
        let mut writer = ResponseWriter::new(&mut buffer);

        relay_chat(
            chat_stream(vec![Ok(AgentEvent::ToolResult {
                tool_name: "Bash".to_owned(),
                is_error: false,
                output: "o".repeat(PREVIEW_LIMIT * 2),
            })]),
            &mut writer,
            None,
        )
        .expect("relay");

        let decoded = frames(buffer);
        let output = decoded[0]["output"].as_str().expect("output");
        assert_eq!(output.chars().count(), PREVIEW_LIMIT + 3);
    }

    #[test]
    fn bash_input_summarizes_the_command() {
        let input = json!({
            "command": "c".repeat(COMMAND_LIMIT + 50),
            "timeout": 120_000,
        });
        let Value::Object(input) = input else {
            unreachable!()
        };

        let summary = summarize_tool_input("Bash", &input);
        let command = summary["command"].as_str().expect("command");
        assert_eq!(command.chars().count(), COMMAND_LIMIT + 3);
        assert!(summary.get("timeout").is_none());
    }

    #[test]
    fn write_input_previews_content() {
        let input = json!({
            "file_path": "/tmp/out.py",
            "content": "c".repeat(400),
        });
        let Value::Object(input) = input else {
            unreachable!()
        };

        let summary = summarize_tool_input("Write", &input);
        assert_eq!(summary["file_path"], "/tmp/out.py");
        assert_eq!(summary["content_length"], 400);
        let preview = summary["content_preview"].as_str().expect("preview");
        assert_eq!(preview.chars().count(), STRING_LIMIT + 3);
    }

    #[test]
    fn edit_input_truncates_old_string() {
        let input = json!({
            "file_path": "/tmp/out.py",
            "old_string": "o".repeat(200),
            "new_string": "replacement",
        });
        let Value::Object(input) = input else {
            unreachable!()
        };

        let summary = summarize_tool_input("Edit", &input);
        let old = summary["old_string"].as_str().expect("old_string");
        assert_eq!(old.chars().count(), OLD_STRING_LIMIT + 3);
        assert!(summary.get("new_string").is_none());
    }

    #[test]
    fn generic_input_truncates_long_strings_only() {
        let input = json!({
            "query": "q".repeat(150),
            "short": "ok",
            "count": 7,
        });
        let Value::Object(input) = input else {
            unreachable!()
        };

        let summary = summarize_tool_input("CustomTool", &input);
        let query = summary["query"].as_str().expect("query");
        assert_eq!(query.chars().count(), STRING_LIMIT + 3);
        assert_eq!(summary["short"], "ok");
        assert_eq!(summary["count"], 7);
    }

    #[test]
    fn usage_counters_are_merged() {
        let mut buffer = Vec::new();
        let mut writer = ResponseWriter::new(&mut buffer);

        let usage = BTreeMap::from([
            ("input_tokens".to_owned(), 120.0),
            ("output_tokens".to_owned(), 40.0),
        ]);
        let outcome = relay_chat(
            chat_stream(vec![Ok(AgentEvent::Done {
                is_error: false,
                cost: Some(0.01),
                duration_ms: Some(900),
                usage,
            })]),
            &mut writer,
            None,
        )
        .expect("relay");

        assert_eq!(outcome.usage["input_tokens"], 120.0);
        assert_eq!(outcome.usage["output_tokens"], 40.0);
    }

    #[test]
    fn done_event_is_relayed_to_the_wire() {
        let mut buffer = Vec::new();
        let mut writer = ResponseWriter::new(&mut buffer);

        relay_chat(
            chat_stream(vec![
                Ok(AgentEvent::Text {
                    content: "hi".to_owned(),
                }),
                Ok(AgentEvent::Done {
                    is_error: false,
                    cost: Some(0.02),
                    duration_ms: Some(1_200),
                    usage: BTreeMap::new(),
                }),
            ]),
            &mut writer,
            None,
        )
        .expect("relay");

        let decoded = frames(buffer);
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[1]["event_type"], "done");
        assert_eq!(decoded[1]["is_error"], false);
        assert_eq!(decoded[1]["cost"], 0.02);
        assert_eq!(decoded[1]["duration_ms"], 1_200);
    }

    #[test]
    fn error_turn_still_completes_with_accumulated_text() {
        let mut buffer = Vec::new();
        let mut writer = ResponseWriter::new(&mut buffer);

        let outcome = relay_chat(
            chat_stream(vec![
                Ok(AgentEvent::Text {
                    content: "partial answer".to_owned(),
                }),
                Ok(AgentEvent::Done {
                    is_error: true,
                    cost: None,
                    duration_ms: None,
                    usage: BTreeMap::new(),
                }),
            ]),
            &mut writer,
            None,
        )
        .expect("relay");

        assert_eq!(outcome.final_text, "partial answer");
        let decoded = frames(buffer);
        assert_eq!(decoded[1]["event_type"], "done");
        assert_eq!(decoded[1]["is_error"], true);
    }

    #[test]
    fn stream_failure_emits_a_final_error_event() {
        let mut buffer = Vec::new();
        let mut writer = ResponseWriter::new(&mut buffer);

        let result = relay_chat(
            chat_stream(vec![
                Ok(AgentEvent::Text {
                    content: "partial".to_owned(),
                }),
                Err(EngineError::failed("agent crashed")),
            ]),
            &mut writer,
            Some(&json!("cb-1")),
        );

        assert!(result.is_err());
        let decoded = frames(buffer);
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[1]["event_type"], "error");
        assert_eq!(decoded[1]["_callbackId"], "cb-1");
    }

    #[test]
    fn generation_progress_is_relayed() {
        let mut buffer = Vec::new();
        let mut writer = ResponseWriter::new(&mut buffer);

        let stream: GenerationStream = Box::new(
            vec![
                Ok(GenerationEvent::Progress {
                    percent: 40,
                    message: "Planning endpoints".to_owned(),
                }),
                Ok(GenerationEvent::Complete),
            ]
            .into_iter(),
        );
        relay_generation(stream, &mut writer, None).expect("relay");

        let decoded = frames(buffer);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0]["type"], "progress");
        assert_eq!(decoded[0]["percent"], 40);
    }

    #[test]
    fn generation_without_completion_is_a_protocol_error() {
        let mut buffer = Vec::new();
        let mut writer = ResponseWriter::new(&mut buffer);

        let stream: GenerationStream = Box::new(
            vec![Ok(GenerationEvent::Progress {
                percent: 40,
                message: "Planning endpoints".to_owned(),
            })]
            .into_iter(),
        );
        let error = relay_generation(stream, &mut writer, None).expect_err("incomplete stream");
        assert!(matches!(
            error,
            DispatchError::Engine(EngineError::Protocol { .. })
        ));
    }
}
