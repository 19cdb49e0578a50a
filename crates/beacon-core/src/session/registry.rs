//! SessionRegistry - session identity and window correlation.
//!
//! Two indexes are kept: session id -> session, and window handle -> the one
//! session occupying it. Both are only ever mutated together inside a single
//! critical section, so no reader can observe a handle claimed twice.
//!
//! Lock order is registry, then session. Callers holding a session lock must
//! not call back into the registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::state::{Session, SessionId, SessionSnapshot};
use crate::events::AgentSource;
use crate::platform::WindowHandle;

/// A session record shared between the registry, the orchestrator and the
/// session's own debounce timer.
pub type SharedSession = Arc<Mutex<Session>>;

/// Outcome of [`SessionRegistry::register_or_update`].
pub struct Registration {
    pub session: SharedSession,
    pub is_new: bool,
    /// The session evicted because it occupied the claimed window handle.
    pub displaced: Option<SessionSnapshot>,
}

#[derive(Default)]
struct RegistryInner {
    sessions: HashMap<SessionId, SharedSession>,
    by_handle: HashMap<WindowHandle, SessionId>,
}

impl RegistryInner {
    /// Evict a session: cancel its timer and release its handle claim.
    fn remove(&mut self, session_id: &SessionId) -> Option<SessionSnapshot> {
        let shared = self.sessions.remove(session_id)?;
        let mut session = shared.lock().unwrap();
        session.cancel_afk_timer();
        if self.by_handle.get(&session.window) == Some(session_id) {
            self.by_handle.remove(&session.window);
        }
        Some(session.snapshot())
    }

    /// Point `handle` at `session_id`, evicting any other occupant.
    fn claim(&mut self, handle: WindowHandle, session_id: &SessionId) -> Option<SessionSnapshot> {
        if handle.is_unknown() {
            return None;
        }
        let displaced = match self.by_handle.get(&handle) {
            Some(occupant) if occupant != session_id => {
                let occupant = occupant.clone();
                self.remove(&occupant)
            }
            _ => None,
        };
        self.by_handle.insert(handle, session_id.clone());
        displaced
    }
}

/// Owns every live session.
#[derive(Default)]
pub struct SessionRegistry {
    inner: Mutex<RegistryInner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find or create the session for `session_id`.
    ///
    /// An existing session only has its source updated; its window binding
    /// never changes. A new session claiming a handle held by another
    /// session evicts that session in the same critical section and reports
    /// it as displaced.
    pub fn register_or_update(
        &self,
        session_id: &SessionId,
        window: WindowHandle,
        source: AgentSource,
    ) -> Registration {
        let mut inner = self.inner.lock().unwrap();

        if let Some(existing) = inner.sessions.get(session_id).cloned() {
            existing.lock().unwrap().source = source;
            return Registration {
                session: existing,
                is_new: false,
                displaced: None,
            };
        }

        let displaced = inner.claim(window, session_id);
        let session = Arc::new(Mutex::new(Session::new(
            session_id.clone(),
            window,
            source,
        )));
        inner.sessions.insert(session_id.clone(), Arc::clone(&session));

        Registration {
            session,
            is_new: true,
            displaced,
        }
    }

    pub fn get(&self, session_id: &SessionId) -> Option<SharedSession> {
        self.inner.lock().unwrap().sessions.get(session_id).cloned()
    }

    pub fn get_by_handle(&self, handle: WindowHandle) -> Option<SharedSession> {
        let inner = self.inner.lock().unwrap();
        let session_id = inner.by_handle.get(&handle)?;
        inner.sessions.get(session_id).cloned()
    }

    /// The window currently bound to a session, if the session exists.
    pub fn window_of(&self, session_id: &SessionId) -> Option<WindowHandle> {
        let session = self.get(session_id)?;
        let window = session.lock().unwrap().window;
        Some(window)
    }

    /// Explicitly end a session.
    pub fn end(&self, session_id: &SessionId) -> Option<SessionSnapshot> {
        self.inner.lock().unwrap().remove(session_id)
    }

    /// Evict every session whose window is no longer alive.
    ///
    /// Sessions with an unknown window are never swept.
    pub fn remove_dead_sessions<F>(&self, is_alive: F) -> Vec<SessionSnapshot>
    where
        F: Fn(WindowHandle) -> bool,
    {
        let mut inner = self.inner.lock().unwrap();
        let dead: Vec<SessionId> = inner
            .sessions
            .iter()
            .filter_map(|(id, shared)| {
                let window = shared.lock().unwrap().window;
                (!window.is_unknown() && !is_alive(window)).then(|| id.clone())
            })
            .collect();

        dead.iter().filter_map(|id| inner.remove(id)).collect()
    }

    /// All sessions, sorted by id.
    pub fn snapshots(&self) -> Vec<SessionSnapshot> {
        let inner = self.inner.lock().unwrap();
        let mut snapshots: Vec<SessionSnapshot> = inner
            .sessions
            .values()
            .map(|shared| shared.lock().unwrap().snapshot())
            .collect();
        snapshots.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        snapshots
    }

    /// Every live session record, for bulk updates.
    pub(crate) fn all(&self) -> Vec<SharedSession> {
        self.inner.lock().unwrap().sessions.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    fn handle_owner(&self, handle: WindowHandle) -> Option<SessionId> {
        self.inner.lock().unwrap().by_handle.get(&handle).cloned()
    }

    /// Every handle claim whose owner is missing or bound elsewhere.
    #[cfg(test)]
    fn stale_claims(&self) -> Vec<WindowHandle> {
        let inner = self.inner.lock().unwrap();
        inner
            .by_handle
            .iter()
            .filter(|(handle, owner)| {
                inner
                    .sessions
                    .get(*owner)
                    .map_or(true, |s| s.lock().unwrap().window != **handle)
            })
            .map(|(handle, _)| *handle)
            .collect()
    }
}
