//! Transcript line parsing.
//!
//! A transcript is JSONL. Only two line types matter here; everything else,
//! including malformed lines, parses as [`TranscriptLine::Other`] or `None`.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptLine {
    /// The assistant asked to run these tool calls.
    ToolRequests(Vec<String>),
    /// A tool call started executing, i.e. it was approved.
    ToolExecutionStart(String),
    Other,
}

#[derive(Deserialize)]
struct RawLine {
    #[serde(rename = "type")]
    line_type: String,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssistantMessage {
    #[serde(default)]
    tool_requests: Vec<ToolRequest>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolRequest {
    tool_call_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolExecutionStart {
    tool_call_id: String,
}

impl TranscriptLine {
    /// Parse one line. Returns `None` when the line is not valid JSON or has
    /// no `type`.
    pub fn parse(line: &str) -> Option<Self> {
        let raw: RawLine = serde_json::from_str(line).ok()?;
        let parsed = match raw.line_type.as_str() {
            "assistant.message" => serde_json::from_value::<AssistantMessage>(raw.data)
                .ok()
                .map(|msg| {
                    msg.tool_requests
                        .into_iter()
                        .filter_map(|req| req.tool_call_id)
                        .collect::<Vec<_>>()
                })
                .filter(|ids| !ids.is_empty())
                .map(TranscriptLine::ToolRequests),
            "tool.execution_start" => serde_json::from_value::<ToolExecutionStart>(raw.data)
                .ok()
                .map(|start| TranscriptLine::ToolExecutionStart(start.tool_call_id)),
            _ => None,
        };
        Some(parsed.unwrap_or(TranscriptLine::Other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assistant_message_with_tool_requests() {
        let line = r#"{"type":"assistant.message","id":"m1","data":{"content":"","toolRequests":[{"toolCallId":"call_a","name":"bash"},{"toolCallId":"call_b"}]}}"#;
        assert_eq!(
            TranscriptLine::parse(line),
            Some(TranscriptLine::ToolRequests(vec![
                "call_a".to_string(),
                "call_b".to_string()
            ]))
        );
    }

    #[test]
    fn assistant_message_without_tools_is_other() {
        let line = r#"{"type":"assistant.message","data":{"content":"hello","toolRequests":[]}}"#;
        assert_eq!(TranscriptLine::parse(line), Some(TranscriptLine::Other));

        let line = r#"{"type":"assistant.message","data":{"content":"hello"}}"#;
        assert_eq!(TranscriptLine::parse(line), Some(TranscriptLine::Other));
    }

    #[test]
    fn tool_execution_start() {
        let line = r#"{"type":"tool.execution_start","data":{"toolCallId":"call_a","toolName":"bash"}}"#;
        assert_eq!(
            TranscriptLine::parse(line),
            Some(TranscriptLine::ToolExecutionStart("call_a".to_string()))
        );
    }

    #[test]
    fn execution_start_without_id_is_other() {
        let line = r#"{"type":"tool.execution_start","data":{}}"#;
        assert_eq!(TranscriptLine::parse(line), Some(TranscriptLine::Other));
    }

    #[test]
    fn unrelated_type_is_other() {
        let line = r#"{"type":"user.message","data":{"content":"hi"}}"#;
        assert_eq!(TranscriptLine::parse(line), Some(TranscriptLine::Other));
    }

    #[test]
    fn malformed_json_is_none() {
        assert_eq!(TranscriptLine::parse("{not json"), None);
        assert_eq!(TranscriptLine::parse(r#"{"data":{}}"#), None);
    }
}
