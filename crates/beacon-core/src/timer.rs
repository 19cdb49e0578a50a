//! Revocable single-shot timers.
//!
//! A [`TimerSlot`] holds at most one pending delayed action. Arming the slot
//! cancels whatever was pending first, so two timers never race for the same
//! key. The action receives its own [`CancellationToken`] and must re-check
//! it (and any state it depends on) under the caller's lock before acting:
//! cancellation can land after the delay elapsed but before the body runs.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
pub struct TimerSlot {
    token: Option<CancellationToken>,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any pending action and schedule `action` after `delay`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm<F>(&mut self, delay: Duration, action: F)
    where
        F: FnOnce(&CancellationToken) + Send + 'static,
    {
        self.cancel();
        let token = CancellationToken::new();
        let task_token = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = task_token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    action(&task_token);
                    // Spent: the slot no longer reports armed.
                    task_token.cancel();
                }
            }
        });
        self.token = Some(token);
    }

    /// Revoke the pending action, if any.
    pub fn cancel(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }

    /// True while an action is pending: armed, not revoked, not yet fired.
    pub fn is_armed(&self) -> bool {
        self.token.as_ref().is_some_and(|t| !t.is_cancelled())
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
