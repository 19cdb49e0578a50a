//! Maps raw hook payloads onto actions via the per-agent tables.

use std::collections::HashMap;

use super::{HookAction, HookPayload, NormalizedHook};
use crate::config::BeaconConfig;
use crate::events::AgentSource;
use crate::session::SessionId;

pub struct HookNormalizer {
    copilot_mappings: HashMap<String, HookAction>,
    claude_mappings: HashMap<String, HookAction>,
}

impl HookNormalizer {
    pub fn new(config: &BeaconConfig) -> Self {
        Self {
            copilot_mappings: config.copilot_event_mappings.clone(),
            claude_mappings: config.claude_event_mappings.clone(),
        }
    }

    /// Resolve a payload to an action, or `None` when it should be ignored.
    pub fn normalize(&self, payload: &HookPayload) -> Option<NormalizedHook> {
        if payload.stop_hook_active == Some(true) {
            log::debug!("Skipping payload: stop_hook_active is true");
            return None;
        }

        let hook_event = payload.hook_event_name();
        let source = detect_agent(payload);
        log::debug!("Received hook event '{}' from {}", hook_event, source);

        let session_id = SessionId::from(payload.resolved_session_id());
        if session_id.is_broadcast() {
            log::warn!("Ignoring '{}' hook with reserved session id", hook_event);
            return None;
        }

        let key = mapping_key(hook_event, payload);
        let mappings = match source {
            AgentSource::ClaudeCode => &self.claude_mappings,
            AgentSource::Copilot | AgentSource::Unknown => &self.copilot_mappings,
        };
        let Some(&action) = mappings.get(&key) else {
            log::trace!("No mapping for '{}' in {} table, ignoring", key, source);
            return None;
        };

        log::info!("Mapped '{}' -> {:?} (source: {})", key, action, source);

        Some(NormalizedHook {
            session_id,
            source,
            action,
            hook_event: hook_event.to_string(),
            reason: build_reason(hook_event, payload),
            transcript_path: payload.resolved_transcript_path().cloned(),
        })
    }
}

fn detect_agent(payload: &HookPayload) -> AgentSource {
    if payload.claude_hook_event_name.is_some() {
        AgentSource::ClaudeCode
    } else if payload.copilot_hook_event_name.is_some() {
        AgentSource::Copilot
    } else {
        AgentSource::Unknown
    }
}

fn mapping_key(hook_event: &str, payload: &HookPayload) -> String {
    match &payload.notification_type {
        Some(kind) if hook_event.eq_ignore_ascii_case("Notification") => {
            format!("Notification:{}", kind)
        }
        _ => hook_event.to_string(),
    }
}

fn build_reason(hook_event: &str, payload: &HookPayload) -> String {
    match hook_event {
        "Stop" => "Agent finished responding".to_string(),
        "SubagentStop" => format!(
            "Subagent completed ({})",
            payload.agent_type.as_deref().unwrap_or("unknown")
        ),
        "Notification" => format!(
            "Notification: {}",
            payload
                .message
                .as_deref()
                .or(payload.notification_type.as_deref())
                .unwrap_or("unknown")
        ),
        "PermissionRequest" => format!(
            "Permission requested for {}",
            payload.tool_name.as_deref().unwrap_or("unknown tool")
        ),
        "PreToolUse" => format!(
            "Tool requested: {}",
            payload.tool_name.as_deref().unwrap_or("unknown tool")
        ),
        "UserPromptSubmit" => "User submitted a prompt".to_string(),
        "SessionStart" => format!(
            "Session started ({})",
            payload.source.as_deref().unwrap_or("new")
        ),
        other => format!("Hook event: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> HookNormalizer {
        HookNormalizer::new(&BeaconConfig::default())
    }

    fn parse(json: &str) -> HookPayload {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn claude_permission_request_is_waiting() {
        let hook = normalizer()
            .normalize(&parse(
                r#"{"hook_event_name":"PermissionRequest","session_id":"s1","tool_name":"Bash"}"#,
            ))
            .unwrap();
        assert_eq!(hook.action, HookAction::Waiting);
        assert_eq!(hook.source, AgentSource::ClaudeCode);
        assert_eq!(hook.session_id, SessionId::from("s1"));
        assert_eq!(hook.reason, "Permission requested for Bash");
    }

    #[test]
    fn claude_notification_uses_type_key() {
        let hook = normalizer()
            .normalize(&parse(
                r#"{"hook_event_name":"Notification","session_id":"s1","notification_type":"idle_prompt","message":"Claude is waiting"}"#,
            ))
            .unwrap();
        assert_eq!(hook.action, HookAction::Waiting);
        assert_eq!(hook.reason, "Notification: Claude is waiting");
    }

    #[test]
    fn unmapped_notification_type_is_ignored() {
        let result = normalizer().normalize(&parse(
            r#"{"hook_event_name":"Notification","session_id":"s1","notification_type":"auth_success"}"#,
        ));
        assert!(result.is_none());
    }

    #[test]
    fn stop_hook_active_is_ignored() {
        let result = normalizer().normalize(&parse(
            r#"{"hook_event_name":"Stop","session_id":"s1","stop_hook_active":true}"#,
        ));
        assert!(result.is_none());
    }

    #[test]
    fn copilot_pre_tool_use_watches_transcript() {
        let hook = normalizer()
            .normalize(&parse(
                r#"{"hookEventName":"PreToolUse","sessionId":"c1","transcriptPath":"/tmp/c1.jsonl"}"#,
            ))
            .unwrap();
        assert_eq!(hook.action, HookAction::WatchTranscript);
        assert_eq!(hook.source, AgentSource::Copilot);
        assert_eq!(
            hook.transcript_path.as_deref(),
            Some(std::path::Path::new("/tmp/c1.jsonl"))
        );
    }

    #[test]
    fn unknown_agent_uses_copilot_table() {
        let mut payload = HookPayload::default();
        payload.session_id = Some("x".to_string());
        // No event name at all resolves to "Unknown", which is unmapped.
        assert!(normalizer().normalize(&payload).is_none());
    }

    #[test]
    fn reserved_session_id_is_rejected() {
        let result = normalizer()
            .normalize(&parse(r#"{"hook_event_name":"Stop","session_id":"*"}"#));
        assert!(result.is_none());
    }

    #[test]
    fn unknown_hook_name_reason() {
        let payload = parse(r#"{"hook_event_name":"Custom"}"#);
        assert_eq!(build_reason("Custom", &payload), "Hook event: Custom");
    }

    #[test]
    fn state_change_carries_hook_fields() {
        let hook = normalizer()
            .normalize(&parse(r#"{"hook_event_name":"Stop","session_id":"s9"}"#))
            .unwrap();
        let change = hook.state_change();
        assert_eq!(change.session_id, SessionId::from("s9"));
        assert_eq!(change.action, HookAction::Done);
        assert_eq!(change.hook_event, "Stop");
        assert_eq!(change.reason, "Agent finished responding");
    }
}
