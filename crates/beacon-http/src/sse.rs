//! Server-Sent Events stream of wire events.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;

use beacon_core::event_bus::{EventBus, Subscription};

use super::SharedState;

/// Unsubscribes from the bus when the client's stream is dropped.
struct SubscriptionGuard {
    event_bus: Arc<EventBus>,
    subscription: Subscription,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.event_bus.unsubscribe(self.subscription.id());
        log::info!("SSE client disconnected");
    }
}

/// Handler for GET /events
///
/// One SSE message per wire event, named after the event kind.
pub async fn events_handler(
    State(state): State<Arc<SharedState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let guard = SubscriptionGuard {
        event_bus: Arc::clone(&state.event_bus),
        subscription: state.event_bus.subscribe(),
    };
    log::info!(
        "SSE client connected ({} subscribers)",
        state.event_bus.subscriber_count()
    );

    let stream = futures::stream::unfold(guard, |mut guard| async move {
        let event = guard.subscription.recv().await?;
        let message = match Event::default().event(event.kind().as_str()).json_data(&event) {
            Ok(message) => message,
            Err(e) => {
                log::warn!("Cannot serialize {} event: {}", event.kind(), e);
                Event::default().comment("serialization error")
            }
        };
        Some((Ok::<_, Infallible>(message), guard))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
