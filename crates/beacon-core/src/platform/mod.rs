//! Platform monitor capability.
//!
//! The orchestrator never talks to the OS directly. It asks a
//! [`PlatformMonitor`] which window is focused, how long the user has been
//! idle and whether a window still exists, and it receives focus changes on a
//! single channel returned by [`PlatformMonitor::start`].

mod null;
mod scripted;

pub use null::NullPlatformMonitor;
pub use scripted::ScriptedMonitor;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Opaque OS window handle. Zero means unknown / unattached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowHandle(pub u64);

impl WindowHandle {
    pub const UNKNOWN: WindowHandle = WindowHandle(0);

    pub fn is_unknown(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

/// A window gained OS focus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusChange {
    pub handle: WindowHandle,
    pub process_name: String,
}

/// Receiving end of the focus-change notification channel.
pub type FocusEvents = mpsc::UnboundedReceiver<FocusChange>;

/// OS window/focus/idle primitives, one implementation per platform.
pub trait PlatformMonitor: Send + Sync {
    /// Hook into the OS and return the focus-change channel.
    ///
    /// Returns once hooking is complete. Implementations stop delivering
    /// notifications after `cancel` fires.
    fn start(&self, cancel: CancellationToken) -> Result<FocusEvents>;

    fn focused_window(&self) -> Option<WindowHandle>;

    fn focused_process_name(&self) -> Option<String>;

    fn user_idle_duration(&self) -> Duration;

    /// Counter that changes on every user input event.
    fn last_input_tick(&self) -> u64;

    fn is_window_alive(&self, handle: WindowHandle) -> bool;
}
