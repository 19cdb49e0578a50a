//! Monitor used where no OS integration is available.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{FocusEvents, PlatformMonitor, WindowHandle};
use crate::error::Result;

/// Reports nothing: no focused window, never idle, every window alive.
///
/// With this monitor every session has an unknown window, so notifications
/// are always published immediately.
#[derive(Debug, Default)]
pub struct NullPlatformMonitor;

impl NullPlatformMonitor {
    pub fn new() -> Self {
        Self
    }
}

impl PlatformMonitor for NullPlatformMonitor {
    fn start(&self, _cancel: CancellationToken) -> Result<FocusEvents> {
        let (_tx, rx) = mpsc::unbounded_channel();
        Ok(rx)
    }

    fn focused_window(&self) -> Option<WindowHandle> {
        None
    }

    fn focused_process_name(&self) -> Option<String> {
        None
    }

    fn user_idle_duration(&self) -> Duration {
        Duration::ZERO
    }

    fn last_input_tick(&self) -> u64 {
        0
    }

    fn is_window_alive(&self, _handle: WindowHandle) -> bool {
        true
    }
}
