//! Per-session state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::{AgentSource, BeaconMode};
use crate::platform::WindowHandle;
use crate::timer::TimerSlot;

const BROADCAST_ID: &str = "*";

/// Agent-assigned session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// The reserved identity meaning "all sessions".
    pub fn broadcast() -> Self {
        Self(BROADCAST_ID.to_string())
    }

    pub fn is_broadcast(&self) -> bool {
        self.0 == BROADCAST_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One tracked agent session.
///
/// `internal_state` is the orchestrator's latest decision; `published_state`
/// is what subscribers have actually been told. They differ only while the
/// AFK debounce timer is pending.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub window: WindowHandle,
    pub source: AgentSource,
    pub internal_state: BeaconMode,
    pub published_state: BeaconMode,
    pub state_changed_at: DateTime<Utc>,
    pub input_tick_at_change: u64,
    pub(crate) afk_timer: TimerSlot,
}

impl Session {
    pub fn new(id: SessionId, window: WindowHandle, source: AgentSource) -> Self {
        Self {
            id,
            window,
            source,
            internal_state: BeaconMode::Idle,
            published_state: BeaconMode::Idle,
            state_changed_at: Utc::now(),
            input_tick_at_change: 0,
            afk_timer: TimerSlot::new(),
        }
    }

    pub fn cancel_afk_timer(&mut self) {
        self.afk_timer.cancel();
    }

    pub fn has_pending_timer(&self) -> bool {
        self.afk_timer.is_armed()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            window_handle: self.window,
            source: self.source,
            internal_state: self.internal_state,
            published_state: self.published_state,
            state_changed_at: self.state_changed_at,
        }
    }
}

/// Copy-out view of a session for queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub window_handle: WindowHandle,
    pub source: AgentSource,
    pub internal_state: BeaconMode,
    pub published_state: BeaconMode,
    pub state_changed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    mod session_id {
        use super::*;

        #[test]
        fn display_shows_inner_string() {
            let id = SessionId("test-session-123".to_string());
            assert_eq!(format!("{}", id), "test-session-123");
        }

        #[test]
        fn broadcast_is_recognized() {
            assert!(SessionId::broadcast().is_broadcast());
            assert!(!SessionId::from("abc").is_broadcast());
        }

        #[test]
        fn serializes_as_plain_string() {
            let id = SessionId::from("s-1");
            assert_eq!(serde_json::to_string(&id).unwrap(), "\"s-1\"");
        }

        #[test]
        fn can_be_used_as_hashmap_key() {
            use std::collections::HashMap;
            let mut map = HashMap::new();
            let id = SessionId("test-id".to_string());
            map.insert(id.clone(), "value");
            assert_eq!(map.get(&id), Some(&"value"));
        }
    }

    mod session {
        use super::*;

        #[test]
        fn new_starts_idle_on_both_tracks() {
            let session = Session::new(
                SessionId::from("s"),
                WindowHandle(10),
                AgentSource::ClaudeCode,
            );
            assert_eq!(session.internal_state, BeaconMode::Idle);
            assert_eq!(session.published_state, BeaconMode::Idle);
            assert!(!session.has_pending_timer());
        }

        #[test]
        fn snapshot_copies_fields() {
            let mut session =
                Session::new(SessionId::from("s"), WindowHandle(10), AgentSource::Copilot);
            session.internal_state = BeaconMode::Waiting;

            let snap = session.snapshot();
            assert_eq!(snap.session_id, SessionId::from("s"));
            assert_eq!(snap.window_handle, WindowHandle(10));
            assert_eq!(snap.source, AgentSource::Copilot);
            assert_eq!(snap.internal_state, BeaconMode::Waiting);
            assert_eq!(snap.published_state, BeaconMode::Idle);
        }

        #[test]
        fn snapshot_serializes_camel_case() {
            let session = Session::new(SessionId::from("s"), WindowHandle(1), AgentSource::Unknown);
            let json = serde_json::to_value(session.snapshot()).unwrap();
            assert_eq!(json["sessionId"], "s");
            assert_eq!(json["windowHandle"], 1);
            assert_eq!(json["internalState"], "idle");
            assert_eq!(json["publishedState"], "idle");
        }
    }
}
