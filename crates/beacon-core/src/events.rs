//! Wire events and the small enums they are built from.
//!
//! A [`WireEvent`] is the only thing subscribers ever see. It carries published
//! transitions only; the orchestrator's internal (pre-debounce) state never
//! leaves the process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::SessionId;

/// Which agent integration a session or event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AgentSource {
    Copilot,
    ClaudeCode,
    #[default]
    Unknown,
}

impl std::fmt::Display for AgentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AgentSource::Copilot => "Copilot",
            AgentSource::ClaudeCode => "ClaudeCode",
            AgentSource::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// What the user should see for a session (or for everything, when aggregated).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BeaconMode {
    #[default]
    Idle,
    Waiting,
    Done,
}

impl BeaconMode {
    /// True for the two modes that represent a pending notification.
    pub fn is_active(self) -> bool {
        matches!(self, BeaconMode::Waiting | BeaconMode::Done)
    }

    /// Waiting beats Done beats Idle.
    pub fn aggregate<I>(modes: I) -> BeaconMode
    where
        I: IntoIterator<Item = BeaconMode>,
    {
        let mut result = BeaconMode::Idle;
        for mode in modes {
            match mode {
                BeaconMode::Waiting => return BeaconMode::Waiting,
                BeaconMode::Done => result = BeaconMode::Done,
                BeaconMode::Idle => {}
            }
        }
        result
    }
}

impl std::fmt::Display for BeaconMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BeaconMode::Idle => "idle",
            BeaconMode::Waiting => "waiting",
            BeaconMode::Done => "done",
        };
        f.write_str(name)
    }
}

/// Kind of a wire event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Waiting,
    Done,
    Clear,
    SessionStarted,
    SessionEnded,
}

impl EventKind {
    /// The wire kind that publishes a mode change.
    pub fn for_mode(mode: BeaconMode) -> EventKind {
        match mode {
            BeaconMode::Idle => EventKind::Clear,
            BeaconMode::Waiting => EventKind::Waiting,
            BeaconMode::Done => EventKind::Done,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Waiting => "Waiting",
            EventKind::Done => "Done",
            EventKind::Clear => "Clear",
            EventKind::SessionStarted => "SessionStarted",
            EventKind::SessionEnded => "SessionEnded",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record broadcast to every stream subscriber.
///
/// Construct with [`WireEvent::session`] or [`WireEvent::broadcast_clear`]; the
/// broadcast identity is only ever paired with `Clear`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEvent {
    event_type: EventKind,
    session_id: SessionId,
    source: AgentSource,
    hook_event: String,
    reason: String,
    timestamp: DateTime<Utc>,
}

impl WireEvent {
    /// An event addressed to a single session.
    pub fn session(
        kind: EventKind,
        session_id: SessionId,
        source: AgentSource,
        hook_event: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        assert!(
            !session_id.is_broadcast(),
            "session events must not use the broadcast identity"
        );
        Self {
            event_type: kind,
            session_id,
            source,
            hook_event: hook_event.into(),
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    /// A Clear addressed to every session at once.
    pub fn broadcast_clear(hook_event: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            event_type: EventKind::Clear,
            session_id: SessionId::broadcast(),
            source: AgentSource::Unknown,
            hook_event: hook_event.into(),
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn kind(&self) -> EventKind {
        self.event_type
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn source(&self) -> AgentSource {
        self.source
    }

    pub fn hook_event(&self) -> &str {
        &self.hook_event
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_broadcast(&self) -> bool {
        self.session_id.is_broadcast()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod beacon_mode {
        use super::*;

        #[test]
        fn aggregate_of_nothing_is_idle() {
            assert_eq!(BeaconMode::aggregate(Vec::new()), BeaconMode::Idle);
        }

        #[test]
        fn waiting_wins_over_done() {
            let modes = [BeaconMode::Done, BeaconMode::Idle, BeaconMode::Waiting];
            assert_eq!(BeaconMode::aggregate(modes), BeaconMode::Waiting);
        }

        #[test]
        fn done_wins_over_idle() {
            let modes = [BeaconMode::Idle, BeaconMode::Done, BeaconMode::Idle];
            assert_eq!(BeaconMode::aggregate(modes), BeaconMode::Done);
        }

        #[test]
        fn serializes_lowercase() {
            assert_eq!(serde_json::to_string(&BeaconMode::Waiting).unwrap(), "\"waiting\"");
        }
    }

    mod wire_event {
        use super::*;

        #[test]
        fn serializes_camel_case_fields() {
            let event = WireEvent::session(
                EventKind::Done,
                SessionId::from("abc"),
                AgentSource::ClaudeCode,
                "Stop",
                "Agent finished responding",
            );
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["eventType"], "Done");
            assert_eq!(json["sessionId"], "abc");
            assert_eq!(json["source"], "ClaudeCode");
            assert_eq!(json["hookEvent"], "Stop");
            assert_eq!(json["reason"], "Agent finished responding");
            assert!(json["timestamp"].is_string());
        }

        #[test]
        fn broadcast_clear_targets_everyone() {
            let event = WireEvent::broadcast_clear("ManualClear", "Dismissed");
            assert!(event.is_broadcast());
            assert_eq!(event.kind(), EventKind::Clear);
            assert_eq!(event.source(), AgentSource::Unknown);
        }

        #[test]
        #[should_panic(expected = "broadcast identity")]
        fn session_event_rejects_broadcast_identity() {
            WireEvent::session(
                EventKind::Waiting,
                SessionId::broadcast(),
                AgentSource::Unknown,
                "x",
                "y",
            );
        }

        #[test]
        fn kind_for_mode() {
            assert_eq!(EventKind::for_mode(BeaconMode::Waiting), EventKind::Waiting);
            assert_eq!(EventKind::for_mode(BeaconMode::Done), EventKind::Done);
            assert_eq!(EventKind::for_mode(BeaconMode::Idle), EventKind::Clear);
        }
    }
}
