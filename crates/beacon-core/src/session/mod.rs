//! Session tracking: identity, window correlation and the notification
//! state machine.
//!
//! The registry owns the sessions; the orchestrator decides what each one
//! publishes and when.

mod orchestrator;
mod registry;
mod state;

pub use orchestrator::{OrchestratorConfig, SessionOrchestrator, StateChange, StateChangeSink};
pub use registry::{Registration, SessionRegistry, SharedSession};
pub use state::{Session, SessionId, SessionSnapshot};
