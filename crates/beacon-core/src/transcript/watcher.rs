//! TranscriptWatcher - infers pending tool approvals from agent transcripts.
//!
//! Some agents do not raise a hook when they stop to ask for tool approval.
//! Their transcripts do show it: an assistant message lists tool call ids,
//! and each approved call is followed by an execution-start line. If the
//! calls are still pending after the approval delay, the session is reported
//! as Waiting; once every call has started, it is cleared again.
//!
//! Lock order is watcher, then whatever the sink takes. The sink is called
//! with the watcher lock held so a Waiting and its Clear cannot be reordered.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::line::TranscriptLine;
use crate::event_bus::EventBus;
use crate::events::{AgentSource, EventKind};
use crate::hooks::HookAction;
use crate::session::{SessionId, StateChange, StateChangeSink};
use crate::timer::TimerSlot;

const PENDING_HOOK: &str = "TranscriptApprovalPending";
const APPROVED_HOOK: &str = "TranscriptApproval";

struct TranscriptSession {
    path: PathBuf,
    offset: u64,
    source: AgentSource,
    pending: HashSet<String>,
    approval_timer: TimerSlot,
    waiting_published: bool,
}

type Sessions = Arc<Mutex<HashMap<SessionId, TranscriptSession>>>;

/// Complete lines read past a cursor, plus where the next read starts.
struct Appended {
    lines: Vec<String>,
    next_offset: u64,
}

pub struct TranscriptWatcher {
    sessions: Sessions,
    sink: Arc<dyn StateChangeSink>,
    approval_delay: Duration,
    poll_interval: Duration,
}

impl TranscriptWatcher {
    pub fn new(
        sink: Arc<dyn StateChangeSink>,
        approval_delay: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            sink,
            approval_delay,
            poll_interval,
        }
    }

    /// Start (or retarget) watching a session's transcript.
    ///
    /// Only lines appended after this call are considered. Registering the
    /// same path again is a no-op. Retargeting clears a Waiting published for
    /// the previous transcript.
    pub fn watch(&self, session_id: &SessionId, path: &Path, source: AgentSource) {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(existing) = sessions.get_mut(session_id) {
            if existing.path == path {
                return;
            }
            existing.approval_timer.cancel();
            if existing.waiting_published {
                existing.waiting_published = false;
                self.send_clear(session_id, existing.source, "Transcript retargeted");
            }
        }

        let offset = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        log::info!(
            "Transcript watcher targeting session {}: {}",
            session_id,
            path.display()
        );
        sessions.insert(
            session_id.clone(),
            TranscriptSession {
                path: path.to_path_buf(),
                offset,
                source,
                pending: HashSet::new(),
                approval_timer: TimerSlot::new(),
                waiting_published: false,
            },
        );
    }

    /// Stop watching a session. Returns false if it was not watched.
    pub fn unwatch(&self, session_id: &SessionId) -> bool {
        self.sessions.lock().unwrap().remove(session_id).is_some()
    }

    pub fn is_watching(&self, session_id: &SessionId) -> bool {
        self.sessions.lock().unwrap().contains_key(session_id)
    }

    /// Drop the pending batch after the session was cleared by other means.
    pub fn clear_pending(&self, session_id: &SessionId) {
        let mut sessions = self.sessions.lock().unwrap();
        let Some(ts) = sessions.get_mut(session_id) else {
            return;
        };
        ts.pending.clear();
        ts.approval_timer.cancel();
        if ts.waiting_published {
            ts.waiting_published = false;
            self.send_clear(session_id, ts.source, "Pending tool approvals dismissed");
        }
    }

    /// Unwatch every session the bus reports as ended, until `cancel` fires.
    ///
    /// No Clear is sent for an ended session: it would register it again.
    pub async fn forget_ended_sessions(
        self: Arc<Self>,
        bus: Arc<EventBus>,
        cancel: CancellationToken,
    ) {
        let mut subscription = bus.subscribe();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = subscription.recv() => match event {
                    Some(event) if event.kind() == EventKind::SessionEnded => {
                        if self.unwatch(event.session_id()) {
                            log::info!(
                                "Transcript watcher dropped ended session {}",
                                event.session_id()
                            );
                        }
                    }
                    Some(_) => {}
                    None => {
                        log::warn!("Transcript watcher lost its bus subscription");
                        break;
                    }
                },
            }
        }
        bus.unsubscribe(subscription.id());
    }

    /// Poll every watched transcript until `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        log::info!(
            "Transcript watcher started (poll={}ms, approval delay={}ms)",
            self.poll_interval.as_millis(),
            self.approval_delay.as_millis()
        );

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => self.poll_once(),
            }
        }

        for ts in self.sessions.lock().unwrap().values_mut() {
            ts.approval_timer.cancel();
        }
        log::info!("Transcript watcher stopped");
    }

    /// Read and process whatever was appended since the last poll.
    pub fn poll_once(&self) {
        let targets: Vec<(SessionId, PathBuf, u64)> = self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .map(|(id, ts)| (id.clone(), ts.path.clone(), ts.offset))
            .collect();

        for (session_id, path, offset) in targets {
            match read_appended(&path, offset) {
                Ok(Some(appended)) => self.process(&session_id, &path, offset, appended),
                Ok(None) => {}
                Err(e) => log::debug!(
                    "Error reading transcript for session {}: {}",
                    session_id,
                    e
                ),
            }
        }
    }

    fn process(&self, session_id: &SessionId, path: &Path, offset: u64, appended: Appended) {
        let mut sessions = self.sessions.lock().unwrap();
        let Some(ts) = sessions.get_mut(session_id) else {
            return;
        };
        // Retargeted or advanced while we were reading.
        if ts.path != path || ts.offset != offset {
            return;
        }
        ts.offset = appended.next_offset;

        for line in &appended.lines {
            match TranscriptLine::parse(line) {
                Some(TranscriptLine::ToolRequests(ids)) => {
                    log::debug!(
                        "Transcript [{}]: {} tool request(s) pending approval",
                        session_id,
                        ids.len()
                    );
                    ts.pending.extend(ids);
                    self.arm_approval_timer(session_id, ts);
                }
                Some(TranscriptLine::ToolExecutionStart(id)) => {
                    ts.pending.remove(&id);
                    if !ts.pending.is_empty() {
                        continue;
                    }
                    ts.approval_timer.cancel();
                    if ts.waiting_published {
                        ts.waiting_published = false;
                        log::info!("Transcript [{}]: tool approved, sending Clear", session_id);
                        self.send_clear(session_id, ts.source, "User approved tool execution");
                    } else {
                        log::debug!("Transcript [{}]: tool {} started", session_id, id);
                    }
                }
                Some(TranscriptLine::Other) => {}
                None => log::debug!("Transcript [{}]: skipping unparseable line", session_id),
            }
        }
    }

    fn send_clear(&self, session_id: &SessionId, source: AgentSource, reason: &str) {
        self.sink.handle_state_change(StateChange {
            session_id: session_id.clone(),
            source,
            action: HookAction::Clear,
            hook_event: APPROVED_HOOK.to_string(),
            reason: reason.to_string(),
        });
    }

    fn arm_approval_timer(&self, session_id: &SessionId, ts: &mut TranscriptSession) {
        let sessions = Arc::clone(&self.sessions);
        let sink = Arc::clone(&self.sink);
        let session_id = session_id.clone();
        let delay = self.approval_delay;

        ts.approval_timer.arm(delay, move |token| {
            let mut sessions = sessions.lock().unwrap();
            if token.is_cancelled() {
                return;
            }
            let Some(ts) = sessions.get_mut(&session_id) else {
                return;
            };
            if ts.pending.is_empty() || ts.waiting_published {
                return;
            }
            ts.waiting_published = true;
            log::info!(
                "Transcript [{}]: no tool execution after {}ms, sending Waiting",
                session_id,
                delay.as_millis()
            );
            sink.handle_state_change(StateChange {
                session_id: session_id.clone(),
                source: ts.source,
                action: HookAction::Waiting,
                hook_event: PENDING_HOOK.to_string(),
                reason: "Agent waiting for user to approve tool execution".to_string(),
            });
        });
    }
}

/// Read the complete lines appended after `offset`.
///
/// A trailing line without a newline is left for the next read. A file that
/// shrank below `offset` re-seeks the cursor to its new end.
fn read_appended(path: &Path, offset: u64) -> io::Result<Option<Appended>> {
    if !path.exists() {
        return Ok(None);
    }
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();

    if len < offset {
        log::debug!("Transcript {} shrank, re-seeking to end", path.display());
        return Ok(Some(Appended {
            lines: Vec::new(),
            next_offset: len,
        }));
    }
    if len == offset {
        return Ok(None);
    }

    file.seek(SeekFrom::Start(offset))?;
    let mut buf = Vec::with_capacity((len - offset) as usize);
    file.take(len - offset).read_to_end(&mut buf)?;

    let Some(last_newline) = buf.iter().rposition(|&b| b == b'\n') else {
        return Ok(None);
    };
    let complete = &buf[..=last_newline];
    let lines = String::from_utf8_lossy(complete)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect();

    Ok(Some(Appended {
        lines,
        next_offset: offset + last_newline as u64 + 1,
    }))
}
