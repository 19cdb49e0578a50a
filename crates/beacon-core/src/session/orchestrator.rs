//! SessionOrchestrator - the notification state machine.
//!
//! Every session has two tracks. The internal state follows hook actions
//! immediately. The published state is what subscribers were told, and it
//! lags the internal state while the user is looking at the session's window:
//! in that case a Waiting/Done is held back for the AFK threshold and only
//! published if the user produced no input in the meantime.
//!
//! Inputs arrive concurrently from hook requests, the platform monitor's
//! focus channel, the poll loop and the debounce timers. A fired timer
//! re-checks the input tick and the internal state under the session lock, so
//! a stale timer degrades to a no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::registry::{SessionRegistry, SharedSession};
use super::state::{Session, SessionId, SessionSnapshot};
use crate::config::BeaconConfig;
use crate::event_bus::EventBus;
use crate::events::{AgentSource, BeaconMode, EventKind, WireEvent};
use crate::hooks::HookAction;
use crate::platform::{FocusChange, FocusEvents, PlatformMonitor, WindowHandle};

/// A normalized action for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    pub session_id: SessionId,
    pub source: AgentSource,
    pub action: HookAction,
    pub hook_event: String,
    pub reason: String,
}

/// Anything that accepts state changes. Implemented by the orchestrator;
/// the transcript watcher feeds it.
pub trait StateChangeSink: Send + Sync {
    fn handle_state_change(&self, change: StateChange);
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub afk_threshold: Duration,
    pub poll_interval: Duration,
    pub target_process_name: String,
}

impl From<&BeaconConfig> for OrchestratorConfig {
    fn from(config: &BeaconConfig) -> Self {
        Self {
            afk_threshold: config.afk_threshold(),
            poll_interval: config.poll_interval(),
            target_process_name: config.target_process_name.clone(),
        }
    }
}

pub struct SessionOrchestrator {
    registry: Arc<SessionRegistry>,
    monitor: Arc<dyn PlatformMonitor>,
    bus: Arc<EventBus>,
    config: OrchestratorConfig,
    was_afk: AtomicBool,
}

impl SessionOrchestrator {
    pub fn new(
        registry: Arc<SessionRegistry>,
        monitor: Arc<dyn PlatformMonitor>,
        bus: Arc<EventBus>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            registry,
            monitor,
            bus,
            config,
            was_afk: AtomicBool::new(false),
        }
    }

    /// Hook the platform monitor and run the focus listener and poll loop
    /// until `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut focus_events = match self.monitor.start(cancel.clone()) {
            Ok(rx) => Some(rx),
            Err(e) => {
                log::warn!("{}; focus-based clearing disabled", e);
                None
            }
        };

        log::info!(
            "Session orchestrator started (AFK threshold={}s, poll={}ms)",
            self.config.afk_threshold.as_secs(),
            self.config.poll_interval.as_millis()
        );

        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                change = next_focus_change(&mut focus_events) => match change {
                    Some(change) => self.handle_focus_change(&change),
                    None => {
                        log::debug!("Focus channel closed");
                        focus_events = None;
                    }
                },
                _ = interval.tick() => {
                    self.poll_afk();
                    self.poll_dead_windows();
                }
            }
        }

        log::info!("Session orchestrator stopped");
    }

    /// Apply one normalized hook action.
    pub fn handle_state_change(&self, change: StateChange) {
        let StateChange {
            session_id,
            source,
            action,
            hook_event,
            reason,
        } = change;

        let window = self.resolve_window(&session_id);
        if window.is_unknown() {
            log::warn!(
                "Session {} has no correlated window handle (focused={:?}, process={:?})",
                session_id,
                self.monitor.focused_window(),
                self.monitor.focused_process_name()
            );
        }

        let registration = self.registry.register_or_update(&session_id, window, source);

        if let Some(displaced) = &registration.displaced {
            log::info!(
                "Session {} displaced by {} on window {}",
                displaced.session_id,
                session_id,
                displaced.window_handle
            );
            self.bus.publish(WireEvent::session(
                EventKind::SessionEnded,
                displaced.session_id.clone(),
                displaced.source,
                "SessionDisplaced",
                format!("Replaced by new session {}", session_id),
            ));
        }

        if registration.is_new {
            log::info!(
                "New session {} registered on window {} ({})",
                session_id,
                window,
                source
            );
            self.bus.publish(WireEvent::session(
                EventKind::SessionStarted,
                session_id.clone(),
                source,
                hook_event.as_str(),
                format!("Session started ({})", source),
            ));
        }

        match action {
            HookAction::Clear => {
                let mut session = registration.session.lock().unwrap();
                self.apply_clear(&mut session, &hook_event, &reason);
            }
            HookAction::Waiting => {
                self.apply_notify(&registration.session, BeaconMode::Waiting, hook_event, reason)
            }
            HookAction::Done => {
                self.apply_notify(&registration.session, BeaconMode::Done, hook_event, reason)
            }
            HookAction::WatchTranscript => {
                log::debug!("Session {} is now watched via transcript", session_id);
            }
        }
    }

    /// The target editor gained focus on some window: treat it as the user
    /// acknowledging that window's session.
    pub fn handle_focus_change(&self, change: &FocusChange) {
        if !self.is_target_process(&change.process_name) {
            return;
        }
        let Some(shared) = self.registry.get_by_handle(change.handle) else {
            return;
        };
        let mut session = shared.lock().unwrap();
        self.acknowledge(&mut session, "FocusGained", "Editor window gained focus");
    }

    /// Detect the idle -> active edge and clear the focused session.
    pub fn poll_afk(&self) {
        let idle = self.monitor.user_idle_duration();
        let is_afk = idle > self.config.afk_threshold;
        let was_afk = self.was_afk.swap(is_afk, Ordering::SeqCst);

        if is_afk && !was_afk {
            log::debug!("User went AFK (idle {:?})", idle);
            return;
        }
        if !(was_afk && !is_afk) {
            return;
        }

        log::debug!("User returned from AFK (idle {:?})", idle);
        let Some(focused) = self.monitor.focused_window() else {
            return;
        };
        if let Some(shared) = self.registry.get_by_handle(focused) {
            let mut session = shared.lock().unwrap();
            self.acknowledge(
                &mut session,
                "AfkReturn",
                "User returned from AFK while session window is focused",
            );
        }
    }

    /// End every session whose window no longer exists.
    pub fn poll_dead_windows(&self) {
        let monitor = Arc::clone(&self.monitor);
        let dead = self
            .registry
            .remove_dead_sessions(|handle| monitor.is_window_alive(handle));

        for session in dead {
            log::info!(
                "Session {} window ({}) closed, ending session",
                session.session_id,
                session.window_handle
            );
            self.bus.publish(WireEvent::session(
                EventKind::SessionEnded,
                session.session_id,
                session.source,
                "WindowClosed",
                "Editor window closed",
            ));
        }
    }

    /// Reset every session to Idle and publish a single broadcast Clear.
    pub fn clear_all(&self, hook_event: &str, reason: &str) {
        for shared in self.registry.all() {
            let mut session = shared.lock().unwrap();
            session.cancel_afk_timer();
            session.internal_state = BeaconMode::Idle;
            session.published_state = BeaconMode::Idle;
        }
        log::info!("Clearing all sessions ({})", reason);
        self.bus.publish(WireEvent::broadcast_clear(hook_event, reason));
    }

    /// Explicitly end a session. Returns false if it was not tracked.
    pub fn end_session(&self, session_id: &SessionId, reason: &str) -> bool {
        let Some(ended) = self.registry.end(session_id) else {
            return false;
        };
        log::info!("Session {} ended ({})", session_id, reason);
        self.bus.publish(WireEvent::session(
            EventKind::SessionEnded,
            ended.session_id,
            ended.source,
            "SessionEnd",
            reason,
        ));
        true
    }

    pub fn sessions(&self) -> Vec<SessionSnapshot> {
        self.registry.snapshots()
    }

    /// Prefer the focused window if it belongs to the target editor,
    /// otherwise keep whatever the session was bound to before. Only a new
    /// session takes the result; existing bindings never move.
    fn resolve_window(&self, session_id: &SessionId) -> WindowHandle {
        let focused_target = self
            .monitor
            .focused_process_name()
            .filter(|name| self.is_target_process(name))
            .and(self.monitor.focused_window());

        focused_target
            .or_else(|| self.registry.window_of(session_id))
            .unwrap_or(WindowHandle::UNKNOWN)
    }

    fn is_target_process(&self, process_name: &str) -> bool {
        process_name.eq_ignore_ascii_case(&self.config.target_process_name)
    }

    fn is_focused(&self, window: WindowHandle) -> bool {
        !window.is_unknown() && self.monitor.focused_window() == Some(window)
    }

    fn apply_clear(&self, session: &mut Session, hook_event: &str, reason: &str) {
        session.cancel_afk_timer();
        session.internal_state = BeaconMode::Idle;
        session.state_changed_at = Utc::now();

        if session.published_state.is_active() {
            session.published_state = BeaconMode::Idle;
            self.bus.publish(WireEvent::session(
                EventKind::Clear,
                session.id.clone(),
                session.source,
                hook_event,
                reason,
            ));
        } else {
            session.published_state = BeaconMode::Idle;
        }
    }

    fn apply_notify(
        &self,
        shared: &SharedSession,
        mode: BeaconMode,
        hook_event: String,
        reason: String,
    ) {
        let mut session = shared.lock().unwrap();
        session.cancel_afk_timer();
        session.internal_state = mode;
        session.state_changed_at = Utc::now();
        session.input_tick_at_change = self.monitor.last_input_tick();

        if !self.is_focused(session.window) {
            log::info!(
                "Session {} window not focused, publishing {} immediately",
                session.id,
                mode
            );
            session.published_state = mode;
            self.bus.publish(WireEvent::session(
                EventKind::for_mode(mode),
                session.id.clone(),
                session.source,
                hook_event,
                reason,
            ));
            return;
        }

        log::info!(
            "Session {} window is focused, starting AFK timer ({}s)",
            session.id,
            self.config.afk_threshold.as_secs()
        );

        let timer_session = Arc::clone(shared);
        let monitor = Arc::clone(&self.monitor);
        let bus = Arc::clone(&self.bus);
        let captured_tick = session.input_tick_at_change;

        session.afk_timer.arm(self.config.afk_threshold, move |token| {
            let mut session = timer_session.lock().unwrap();
            if token.is_cancelled() {
                return;
            }
            if monitor.last_input_tick() != captured_tick {
                log::debug!(
                    "Session {} AFK timer expired but user was active, skipping publish",
                    session.id
                );
                return;
            }
            if session.internal_state != mode {
                return;
            }

            session.published_state = mode;
            log::info!(
                "Session {} AFK timer expired with no input, publishing {}",
                session.id,
                mode
            );
            bus.publish(WireEvent::session(
                EventKind::for_mode(mode),
                session.id.clone(),
                session.source,
                hook_event,
                reason,
            ));
        });
    }

    /// Clear a session the user is evidently looking at.
    fn acknowledge(&self, session: &mut Session, hook_event: &str, reason: &str) {
        if !session.published_state.is_active() {
            return;
        }
        log::info!(
            "Session {} acknowledged while {} ({}), publishing Clear",
            session.id,
            session.published_state,
            hook_event
        );
        session.cancel_afk_timer();
        session.internal_state = BeaconMode::Idle;
        session.published_state = BeaconMode::Idle;
        session.state_changed_at = Utc::now();
        self.bus.publish(WireEvent::session(
            EventKind::Clear,
            session.id.clone(),
            session.source,
            hook_event,
            reason,
        ));
    }
}

impl StateChangeSink for SessionOrchestrator {
    fn handle_state_change(&self, change: StateChange) {
        SessionOrchestrator::handle_state_change(self, change);
    }
}

async fn next_focus_change(events: &mut Option<FocusEvents>) -> Option<FocusChange> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
