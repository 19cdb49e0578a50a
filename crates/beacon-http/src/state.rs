//! Shared state for the HTTP server.
//!
//! Wraps the core components the handlers route hooks into.

use std::sync::Arc;

use beacon_core::event_bus::EventBus;
use beacon_core::hooks::{HookAction, HookNormalizer, NormalizedHook};
use beacon_core::session::SessionOrchestrator;
use beacon_core::transcript::TranscriptWatcher;

/// Shared state available to all HTTP handlers.
pub struct SharedState {
    pub event_bus: Arc<EventBus>,
    pub orchestrator: Arc<SessionOrchestrator>,
    pub transcript_watcher: Arc<TranscriptWatcher>,
    pub normalizer: HookNormalizer,
}

impl SharedState {
    pub fn new(
        event_bus: Arc<EventBus>,
        orchestrator: Arc<SessionOrchestrator>,
        transcript_watcher: Arc<TranscriptWatcher>,
        normalizer: HookNormalizer,
    ) -> Self {
        Self {
            event_bus,
            orchestrator,
            transcript_watcher,
            normalizer,
        }
    }

    /// Route a mapped hook to the watcher and the orchestrator.
    pub fn dispatch(&self, hook: &NormalizedHook) {
        if hook.action == HookAction::WatchTranscript {
            match &hook.transcript_path {
                Some(path) => self
                    .transcript_watcher
                    .watch(&hook.session_id, path, hook.source),
                None => log::debug!(
                    "'{}' for session {} carried no transcript path",
                    hook.hook_event,
                    hook.session_id
                ),
            }
        }

        self.orchestrator.handle_state_change(hook.state_change());

        if hook.action == HookAction::Clear {
            self.transcript_watcher.clear_pending(&hook.session_id);
        }
    }
}
