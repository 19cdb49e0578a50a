//! In-process monitor driven by explicit calls instead of OS hooks.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{FocusChange, FocusEvents, PlatformMonitor, WindowHandle};
use crate::error::{BeaconError, Result};

#[derive(Default)]
struct ScriptedState {
    focused: Option<FocusChange>,
    idle: Duration,
    input_tick: u64,
    closed: HashSet<WindowHandle>,
    focus_tx: Option<mpsc::UnboundedSender<FocusChange>>,
}

/// A controllable [`PlatformMonitor`].
///
/// `focus` behaves like the OS bringing a window to the foreground: it
/// updates the focused window and pushes a notification to whoever called
/// `start`. `input` simulates a keystroke.
#[derive(Default)]
pub struct ScriptedMonitor {
    state: Mutex<ScriptedState>,
}

impl ScriptedMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Focus a window and raise a focus-change notification.
    pub fn focus(&self, handle: WindowHandle, process_name: &str) {
        let change = FocusChange {
            handle,
            process_name: process_name.to_string(),
        };
        let mut state = self.state.lock().unwrap();
        state.focused = Some(change.clone());
        if let Some(tx) = &state.focus_tx {
            let _ = tx.send(change);
        }
    }

    /// Focus a window without notifying listeners.
    pub fn set_focused(&self, handle: WindowHandle, process_name: &str) {
        self.state.lock().unwrap().focused = Some(FocusChange {
            handle,
            process_name: process_name.to_string(),
        });
    }

    pub fn clear_focus(&self) {
        self.state.lock().unwrap().focused = None;
    }

    /// Simulate user input: bumps the tick and resets idle time.
    pub fn input(&self) {
        let mut state = self.state.lock().unwrap();
        state.input_tick += 1;
        state.idle = Duration::ZERO;
    }

    pub fn set_idle(&self, idle: Duration) {
        self.state.lock().unwrap().idle = idle;
    }

    pub fn close_window(&self, handle: WindowHandle) {
        let mut state = self.state.lock().unwrap();
        state.closed.insert(handle);
        if state.focused.as_ref().is_some_and(|f| f.handle == handle) {
            state.focused = None;
        }
    }
}

impl PlatformMonitor for ScriptedMonitor {
    fn start(&self, cancel: CancellationToken) -> Result<FocusEvents> {
        let mut state = self.state.lock().unwrap();
        if state.focus_tx.as_ref().is_some_and(|tx| !tx.is_closed()) {
            return Err(BeaconError::Monitor("already started".to_string()));
        }
        let (inner_tx, mut inner_rx) = mpsc::unbounded_channel();
        let (tx, rx) = mpsc::unbounded_channel();
        state.focus_tx = Some(inner_tx);

        // Forward until cancelled; dropping `tx` closes the listener's channel.
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    change = inner_rx.recv() => match change {
                        Some(change) => {
                            if tx.send(change).is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
        });
        Ok(rx)
    }

    fn focused_window(&self) -> Option<WindowHandle> {
        self.state.lock().unwrap().focused.as_ref().map(|f| f.handle)
    }

    fn focused_process_name(&self) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .focused
            .as_ref()
            .map(|f| f.process_name.clone())
    }

    fn user_idle_duration(&self) -> Duration {
        self.state.lock().unwrap().idle
    }

    fn last_input_tick(&self) -> u64 {
        self.state.lock().unwrap().input_tick
    }

    fn is_window_alive(&self, handle: WindowHandle) -> bool {
        !self.state.lock().unwrap().closed.contains(&handle)
    }
}
