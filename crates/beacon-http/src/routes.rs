//! HTTP route handlers.
//!
//! `/hook` is the only write path agents use; the rest are queries and the
//! manual dismiss.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;
use serde_json::json;

use beacon_core::event_bus::SessionState;
use beacon_core::events::BeaconMode;
use beacon_core::hooks::{HookAction, HookPayload};
use beacon_core::session::{SessionId, SessionSnapshot};

use super::SharedState;

/// Response for POST /hook.
#[derive(Serialize)]
pub struct HookResponse {
    pub accepted: bool,
    pub mapped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<HookAction>,
}

/// Response for GET /state.
#[derive(Serialize)]
pub struct StateResponse {
    pub mode: BeaconMode,
    pub sessions: Vec<SessionState>,
}

/// Handler for POST /hook
///
/// Accepts a raw hook payload from either agent integration.
pub async fn hook_handler(
    State(state): State<Arc<SharedState>>,
    body: Bytes,
) -> (StatusCode, Json<serde_json::Value>) {
    let payload = match HookPayload::from_json(&body) {
        Ok(payload) => payload,
        Err(e) => {
            log::warn!("Rejected hook payload: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid JSON" })),
            );
        }
    };

    let response = match state.normalizer.normalize(&payload) {
        Some(hook) => {
            state.dispatch(&hook);
            HookResponse {
                accepted: true,
                mapped: true,
                action: Some(hook.action),
            }
        }
        None => HookResponse {
            accepted: true,
            mapped: false,
            action: None,
        },
    };

    (
        StatusCode::OK,
        Json(serde_json::to_value(response).unwrap_or_default()),
    )
}

/// Handler for GET /state
pub async fn state_handler(State(state): State<Arc<SharedState>>) -> Json<StateResponse> {
    Json(StateResponse {
        mode: state.event_bus.current_mode(),
        sessions: state.event_bus.sessions(),
    })
}

/// Handler for GET /sessions
pub async fn sessions_handler(State(state): State<Arc<SharedState>>) -> Json<Vec<SessionSnapshot>> {
    Json(state.orchestrator.sessions())
}

/// Handler for DELETE /sessions/{id}
pub async fn end_session_handler(
    State(state): State<Arc<SharedState>>,
    Path(id): Path<String>,
) -> StatusCode {
    let session_id = SessionId::from(id);
    state.transcript_watcher.unwatch(&session_id);
    if state.orchestrator.end_session(&session_id, "Ended via API") {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Handler for POST /clear
pub async fn clear_handler(State(state): State<Arc<SharedState>>) -> Json<serde_json::Value> {
    state
        .orchestrator
        .clear_all("ManualClear", "Dismissed by user");
    Json(json!({ "cleared": true }))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "ok": true,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
