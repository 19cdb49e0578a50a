//! Per-session state aggregation and fan-out of wire events.
//!
//! The EventBus keeps what each session last published and delivers every
//! published event to every stream subscriber (SSE clients, the event
//! journal, tests).
//!
//! # Example
//!
//! ```rust
//! use beacon_core::event_bus::EventBus;
//! use beacon_core::events::{AgentSource, BeaconMode, EventKind, WireEvent};
//! use beacon_core::session::SessionId;
//!
//! let bus = EventBus::new();
//! let mut subscription = bus.subscribe();
//!
//! bus.publish(WireEvent::session(
//!     EventKind::Waiting,
//!     SessionId::from("abc"),
//!     AgentSource::ClaudeCode,
//!     "PermissionRequest",
//!     "Permission requested for Bash",
//! ));
//!
//! assert_eq!(bus.current_mode(), BeaconMode::Waiting);
//! assert!(subscription.try_recv().is_some());
//! ```

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use crate::events::{AgentSource, BeaconMode, EventKind, WireEvent};
use crate::session::SessionId;

/// Default per-subscriber queue length.
/// Events published while a subscriber's queue is full are dropped for that
/// subscriber only.
const DEFAULT_CAPACITY: usize = 256;

/// Unique identifier for a stream subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub String);

impl SubscriberId {
    fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Published state of one session as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub session_id: SessionId,
    pub mode: BeaconMode,
    pub source: AgentSource,
    pub reason: String,
    pub updated_at: DateTime<Utc>,
}

/// Receiving end of a subscription. Events arrive in publish order.
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<WireEvent>,
}

impl Subscription {
    pub fn id(&self) -> &SubscriberId {
        &self.id
    }

    /// Wait for the next event. Returns `None` once unsubscribed.
    pub async fn recv(&mut self) -> Option<WireEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<WireEvent> {
        self.receiver.try_recv().ok()
    }
}

#[derive(Default)]
struct BusInner {
    subscribers: HashMap<SubscriberId, mpsc::Sender<WireEvent>>,
    sessions: HashMap<SessionId, SessionState>,
}

impl BusInner {
    fn apply(&mut self, event: &WireEvent) {
        if event.is_broadcast() {
            if event.kind() == EventKind::Clear {
                for state in self.sessions.values_mut() {
                    state.mode = BeaconMode::Idle;
                    state.reason = event.reason().to_string();
                    state.updated_at = event.timestamp();
                }
            }
            return;
        }

        let mode = match event.kind() {
            EventKind::SessionEnded => {
                self.sessions.remove(event.session_id());
                return;
            }
            EventKind::Waiting => Some(BeaconMode::Waiting),
            EventKind::Done => Some(BeaconMode::Done),
            EventKind::Clear => Some(BeaconMode::Idle),
            EventKind::SessionStarted => None,
        };

        let state = self
            .sessions
            .entry(event.session_id().clone())
            .or_insert_with(|| SessionState {
                session_id: event.session_id().clone(),
                mode: BeaconMode::Idle,
                source: event.source(),
                reason: String::new(),
                updated_at: event.timestamp(),
            });
        if let Some(mode) = mode {
            state.mode = mode;
        }
        state.source = event.source();
        state.reason = event.reason().to_string();
        state.updated_at = event.timestamp();
    }
}

/// Single-topic event bus with per-session published state.
///
/// The subscriber list and the session-state map share one lock. Publishing
/// never blocks: delivery uses bounded queues and drops the event for any
/// subscriber whose queue is full.
pub struct EventBus {
    inner: Mutex<BusInner>,
    capacity: usize,
}

impl EventBus {
    /// Create a new EventBus with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new EventBus with the given per-subscriber queue length.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(BusInner::default()),
            capacity: capacity.max(1),
        }
    }

    /// Register a new subscriber. Only events published after this call are
    /// delivered to it.
    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let id = SubscriberId::new();
        self.inner
            .lock()
            .unwrap()
            .subscribers
            .insert(id.clone(), sender);
        Subscription { id, receiver }
    }

    /// Remove a subscriber. Undelivered events are abandoned.
    pub fn unsubscribe(&self, id: &SubscriberId) -> bool {
        self.inner.lock().unwrap().subscribers.remove(id).is_some()
    }

    /// Record the event's effect on session state and fan it out.
    ///
    /// Returns the number of subscribers the event was queued for.
    pub fn publish(&self, event: WireEvent) -> usize {
        let mut inner = self.inner.lock().unwrap();
        inner.apply(&event);

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, sender) in &inner.subscribers {
            match sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    log::warn!(
                        "Subscriber {} is full, dropping {} event",
                        id.0,
                        event.kind()
                    );
                }
                Err(TrySendError::Closed(_)) => closed.push(id.clone()),
            }
        }
        for id in closed {
            inner.subscribers.remove(&id);
        }
        delivered
    }

    /// Waiting if any session is Waiting, else Done if any is Done, else Idle.
    pub fn current_mode(&self) -> BeaconMode {
        let inner = self.inner.lock().unwrap();
        BeaconMode::aggregate(inner.sessions.values().map(|s| s.mode))
    }

    /// Copy of every session's published state, sorted by session id.
    pub fn sessions(&self) -> Vec<SessionState> {
        let inner = self.inner.lock().unwrap();
        let mut sessions: Vec<SessionState> = inner.sessions.values().cloned().collect();
        sessions.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        sessions
    }

    /// Get the current number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().unwrap().subscribers.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
