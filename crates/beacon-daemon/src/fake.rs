//! Synthetic event generator for demoing status indicators without agents.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use beacon_core::event_bus::EventBus;
use beacon_core::events::{AgentSource, EventKind, WireEvent};
use beacon_core::session::SessionId;

const FAKE_SESSION: &str = "fake-session";
const CYCLE: Duration = Duration::from_secs(10);

const SEQUENCE: [(EventKind, &str); 3] = [
    (EventKind::Waiting, "[fake] Agent is waiting for approval"),
    (EventKind::Done, "[fake] Agent has finished"),
    (EventKind::Clear, "[fake] User returned"),
];

fn fake_event(kind: EventKind, reason: &str) -> WireEvent {
    WireEvent::session(
        kind,
        SessionId::from(FAKE_SESSION),
        AgentSource::Unknown,
        "Fake",
        reason,
    )
}

/// Publish Waiting, Done, Clear in a loop, one every ten seconds.
pub async fn run_fake_events(bus: Arc<EventBus>, cancel: CancellationToken) {
    log::info!("Fake event emitter started, cycling events every {}s", CYCLE.as_secs());
    bus.publish(fake_event(EventKind::SessionStarted, "[fake] Session started"));

    for (kind, reason) in SEQUENCE.iter().cycle() {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(CYCLE) => {
                log::info!("Emitting fake event: {}", kind);
                bus.publish(fake_event(*kind, reason));
            }
        }
    }
}
