//! Raw hook payloads as posted by agent integrations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{BeaconError, Result};

/// Union of the fields both integrations send.
///
/// Claude Code uses snake_case keys, Copilot uses camelCase; whichever is
/// present also tells us which agent sent the payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookPayload {
    #[serde(rename = "hook_event_name")]
    pub claude_hook_event_name: Option<String>,

    #[serde(rename = "hookEventName")]
    pub copilot_hook_event_name: Option<String>,

    #[serde(rename = "session_id")]
    pub session_id: Option<String>,

    #[serde(rename = "sessionId")]
    pub copilot_session_id: Option<String>,

    #[serde(rename = "transcript_path")]
    pub transcript_path: Option<PathBuf>,

    #[serde(rename = "transcriptPath")]
    pub copilot_transcript_path: Option<PathBuf>,

    pub tool_name: Option<String>,
    pub notification_type: Option<String>,
    pub stop_hook_active: Option<bool>,
    pub source: Option<String>,
    pub agent_type: Option<String>,
    pub message: Option<String>,
}

impl HookPayload {
    /// Parse a request body. Unknown fields are ignored.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| BeaconError::InvalidPayload(e.to_string()))
    }

    pub fn hook_event_name(&self) -> &str {
        self.claude_hook_event_name
            .as_deref()
            .or(self.copilot_hook_event_name.as_deref())
            .unwrap_or("Unknown")
    }

    pub fn resolved_session_id(&self) -> &str {
        self.session_id
            .as_deref()
            .or(self.copilot_session_id.as_deref())
            .filter(|s| !s.is_empty())
            .unwrap_or("unknown")
    }

    pub fn resolved_transcript_path(&self) -> Option<&PathBuf> {
        self.transcript_path
            .as_ref()
            .or(self.copilot_transcript_path.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_claude_payload() {
        let json = r#"{
            "hook_event_name": "PermissionRequest",
            "session_id": "abc",
            "transcript_path": "/tmp/t.jsonl",
            "tool_name": "Bash",
            "cwd": "/ignored"
        }"#;
        let payload: HookPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.hook_event_name(), "PermissionRequest");
        assert_eq!(payload.resolved_session_id(), "abc");
        assert_eq!(payload.tool_name.as_deref(), Some("Bash"));
        assert_eq!(
            payload.resolved_transcript_path(),
            Some(&PathBuf::from("/tmp/t.jsonl"))
        );
    }

    #[test]
    fn parses_copilot_payload() {
        let json = r#"{"hookEventName": "PreToolUse", "sessionId": "cp-1", "transcriptPath": "/x.jsonl"}"#;
        let payload: HookPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.hook_event_name(), "PreToolUse");
        assert_eq!(payload.resolved_session_id(), "cp-1");
        assert_eq!(payload.resolved_transcript_path(), Some(&PathBuf::from("/x.jsonl")));
    }

    #[test]
    fn missing_fields_fall_back() {
        let payload: HookPayload = serde_json::from_str("{}").unwrap();
        assert_eq!(payload.hook_event_name(), "Unknown");
        assert_eq!(payload.resolved_session_id(), "unknown");
        assert!(payload.resolved_transcript_path().is_none());
    }

    #[test]
    fn malformed_body_is_invalid_payload() {
        let result = HookPayload::from_json(b"{\"hook_event_name\": ");
        assert!(matches!(result, Err(BeaconError::InvalidPayload(_))));

        let result = HookPayload::from_json(b"42");
        assert!(matches!(result, Err(BeaconError::InvalidPayload(_))));
    }

    #[test]
    fn from_json_accepts_either_spelling() {
        let payload =
            HookPayload::from_json(br#"{"hookEventName": "Stop", "sessionId": "s"}"#).unwrap();
        assert_eq!(payload.hook_event_name(), "Stop");
        assert_eq!(payload.resolved_session_id(), "s");
    }

    #[test]
    fn empty_session_id_falls_back() {
        let payload: HookPayload = serde_json::from_str(r#"{"session_id": ""}"#).unwrap();
        assert_eq!(payload.resolved_session_id(), "unknown");
    }
}
