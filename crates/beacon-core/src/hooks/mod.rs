//! Hook payload normalization.
//!
//! Agent integrations post their raw hook JSON; this module turns it into a
//! [`NormalizedHook`]: which session, which agent, and what the orchestrator
//! should do about it.

mod normalizer;
mod payload;

pub use normalizer::HookNormalizer;
pub use payload::HookPayload;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::events::AgentSource;
use crate::session::{SessionId, StateChange};

/// What a hook asks the orchestrator to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookAction {
    Waiting,
    Done,
    Clear,
    /// Start tailing the session's transcript for pending approvals.
    WatchTranscript,
}

/// A hook resolved through the mapping tables.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedHook {
    pub session_id: SessionId,
    pub source: AgentSource,
    pub action: HookAction,
    pub hook_event: String,
    pub reason: String,
    pub transcript_path: Option<PathBuf>,
}

impl NormalizedHook {
    pub fn state_change(&self) -> StateChange {
        StateChange {
            session_id: self.session_id.clone(),
            source: self.source,
            action: self.action,
            hook_event: self.hook_event.clone(),
            reason: self.reason.clone(),
        }
    }
}
