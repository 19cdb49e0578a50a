//! HTTP surface for Beacon.
//!
//! Agents post hooks to `/hook`; status indicators follow `/events` (SSE) or
//! poll `/state`.

mod routes;
mod sse;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

pub use state::SharedState;

/// Build the router over the given state.
pub fn router(state: Arc<SharedState>) -> Router {
    Router::new()
        .route("/hook", post(routes::hook_handler))
        .route("/events", get(sse::events_handler))
        .route("/state", get(routes::state_handler))
        .route("/sessions", get(routes::sessions_handler))
        .route("/sessions/{id}", delete(routes::end_session_handler))
        .route("/clear", post(routes::clear_handler))
        .route("/health", get(routes::health_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Bind `addr` and serve until `cancel` fires.
pub async fn serve(
    state: Arc<SharedState>,
    addr: SocketAddr,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("HTTP server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
            log::info!("HTTP server shutting down");
        })
        .await
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use beacon_core::config::BeaconConfig;
    use beacon_core::event_bus::EventBus;
    use beacon_core::events::{AgentSource, EventKind, WireEvent};
    use beacon_core::hooks::HookNormalizer;
    use beacon_core::platform::{NullPlatformMonitor, PlatformMonitor};
    use beacon_core::session::{OrchestratorConfig, SessionId, SessionOrchestrator, SessionRegistry};
    use beacon_core::transcript::TranscriptWatcher;
    use futures::StreamExt;
    use serde_json::Value;
    use tower::ServiceExt;

    fn test_state() -> Arc<SharedState> {
        let config = BeaconConfig::default();
        let event_bus = Arc::new(EventBus::new());
        let monitor: Arc<dyn PlatformMonitor> = Arc::new(NullPlatformMonitor::new());
        let orchestrator = Arc::new(SessionOrchestrator::new(
            Arc::new(SessionRegistry::new()),
            monitor,
            Arc::clone(&event_bus),
            OrchestratorConfig::from(&config),
        ));
        let watcher = Arc::new(TranscriptWatcher::new(
            orchestrator.clone(),
            config.approval_delay(),
            config.transcript_poll_interval(),
        ));
        Arc::new(SharedState::new(
            event_bus,
            orchestrator,
            watcher,
            HookNormalizer::new(&config),
        ))
    }

    async fn send(state: &Arc<SharedState>, method: Method, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router(Arc::clone(state)).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn post_hook(state: &Arc<SharedState>, body: &str) -> (StatusCode, Value) {
        send(state, Method::POST, "/hook", body).await
    }

    mod hook {
        use super::*;

        #[tokio::test]
        async fn invalid_json_is_rejected() {
            let state = test_state();
            let (status, body) = post_hook(&state, "{not json").await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, serde_json::json!({ "error": "Invalid JSON" }));
        }

        #[tokio::test]
        async fn unmapped_hook_is_accepted_but_ignored() {
            let state = test_state();
            let (status, body) =
                post_hook(&state, r#"{"hook_event_name":"PostToolUse","session_id":"s1"}"#).await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, serde_json::json!({ "accepted": true, "mapped": false }));
            assert!(state.orchestrator.sessions().is_empty());
        }

        #[tokio::test]
        async fn mapped_hook_reaches_orchestrator() {
            let state = test_state();
            let (status, body) = post_hook(
                &state,
                r#"{"hook_event_name":"PermissionRequest","session_id":"s1","tool_name":"Bash"}"#,
            )
            .await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["mapped"], true);
            assert_eq!(body["action"], "Waiting");

            let (_, current) = send(&state, Method::GET, "/state", "").await;
            assert_eq!(current["mode"], "waiting");
            assert_eq!(current["sessions"][0]["sessionId"], "s1");
            assert_eq!(current["sessions"][0]["reason"], "Permission requested for Bash");
        }

        #[tokio::test]
        async fn clear_hook_returns_to_idle() {
            let state = test_state();
            post_hook(&state, r#"{"hook_event_name":"Stop","session_id":"s1"}"#).await;
            post_hook(&state, r#"{"hook_event_name":"UserPromptSubmit","session_id":"s1"}"#).await;

            let (_, current) = send(&state, Method::GET, "/state", "").await;
            assert_eq!(current["mode"], "idle");
        }

        #[tokio::test]
        async fn pre_tool_use_registers_transcript() {
            let state = test_state();
            let (_, body) = post_hook(
                &state,
                r#"{"hookEventName":"PreToolUse","sessionId":"c1","transcriptPath":"/nonexistent/c1.jsonl"}"#,
            )
            .await;

            assert_eq!(body["action"], "WatchTranscript");
            assert!(state.transcript_watcher.is_watching(&SessionId::from("c1")));
            assert_eq!(state.orchestrator.sessions().len(), 1);
        }
    }

    mod queries {
        use super::*;

        #[tokio::test]
        async fn health_reports_version() {
            let state = test_state();
            let (status, body) = send(&state, Method::GET, "/health", "").await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["ok"], true);
            assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        }

        #[tokio::test]
        async fn sessions_lists_registry_snapshots() {
            let state = test_state();
            post_hook(&state, r#"{"hook_event_name":"Stop","session_id":"b"}"#).await;
            post_hook(&state, r#"{"hook_event_name":"Stop","session_id":"a"}"#).await;

            let (_, body) = send(&state, Method::GET, "/sessions", "").await;
            let sessions = body.as_array().unwrap();
            assert_eq!(sessions.len(), 2);
            assert_eq!(sessions[0]["sessionId"], "a");
            assert_eq!(sessions[0]["publishedState"], "done");
            assert_eq!(sessions[0]["source"], "ClaudeCode");
        }

        #[tokio::test]
        async fn empty_state_is_idle() {
            let state = test_state();
            let (_, body) = send(&state, Method::GET, "/state", "").await;

            assert_eq!(body["mode"], "idle");
            assert_eq!(body["sessions"], serde_json::json!([]));
        }
    }

    mod commands {
        use super::*;

        #[tokio::test]
        async fn clear_dismisses_everything() {
            let state = test_state();
            post_hook(&state, r#"{"hook_event_name":"Stop","session_id":"a"}"#).await;
            post_hook(&state, r#"{"hook_event_name":"PermissionRequest","session_id":"b"}"#).await;

            let (status, body) = send(&state, Method::POST, "/clear", "").await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["cleared"], true);
            let (_, current) = send(&state, Method::GET, "/state", "").await;
            assert_eq!(current["mode"], "idle");
        }

        #[tokio::test]
        async fn delete_session_ends_it_once() {
            let state = test_state();
            post_hook(&state, r#"{"hook_event_name":"Stop","session_id":"a"}"#).await;

            let (first, _) = send(&state, Method::DELETE, "/sessions/a", "").await;
            let (second, _) = send(&state, Method::DELETE, "/sessions/a", "").await;

            assert_eq!(first, StatusCode::NO_CONTENT);
            assert_eq!(second, StatusCode::NOT_FOUND);
            assert!(state.orchestrator.sessions().is_empty());
        }
    }

    mod events {
        use super::*;

        #[tokio::test]
        async fn stream_delivers_named_events_and_unsubscribes_on_drop() {
            let state = test_state();
            let response = router(Arc::clone(&state))
                .oneshot(Request::get("/events").body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(
                response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
                "text/event-stream"
            );
            assert_eq!(state.event_bus.subscriber_count(), 1);

            state.event_bus.publish(WireEvent::session(
                EventKind::Waiting,
                SessionId::from("s1"),
                AgentSource::ClaudeCode,
                "PermissionRequest",
                "Permission requested for Bash",
            ));

            let mut body = response.into_body().into_data_stream();
            let chunk = body.next().await.unwrap().unwrap();
            let text = String::from_utf8(chunk.to_vec()).unwrap();
            assert!(text.contains("event: Waiting"));
            assert!(text.contains("\"sessionId\":\"s1\""));

            drop(body);
            assert_eq!(state.event_bus.subscriber_count(), 0);
        }
    }

    #[tokio::test]
    async fn server_starts_and_stops() {
        let cancel = CancellationToken::new();
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let server = tokio::spawn(serve(test_state(), addr, cancel.clone()));

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        cancel.cancel();

        assert!(server.await.unwrap().is_ok());
    }
}
