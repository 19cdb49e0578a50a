//! # beacon-core
//!
//! Core state machine for Beacon, a presence daemon that tells the user when
//! an AI coding agent is waiting on them or has finished.
//!
//! This crate is framework-agnostic and can be used by:
//! - the HTTP server (hooks in, SSE out)
//! - the daemon binary
//! - tests, via the scripted platform monitor
//!
//! ## Key Concepts
//!
//! - **Session**: one agent conversation, bound to at most one editor window
//! - **Published state**: what subscribers were told, which may lag the
//!   session's internal state while the AFK debounce runs
//! - **WireEvent**: the only thing that leaves the process

pub mod config;
pub mod error;
pub mod event_bus;
pub mod events;
pub mod hooks;
pub mod logging;
pub mod paths;
pub mod platform;
pub mod session;
pub mod timer;
pub mod transcript;

// Re-export commonly used types
pub use config::BeaconConfig;
pub use error::{BeaconError, Result};
pub use event_bus::{EventBus, SessionState};
pub use events::{AgentSource, BeaconMode, EventKind, WireEvent};
pub use hooks::{HookAction, HookNormalizer, HookPayload, NormalizedHook};
pub use platform::{PlatformMonitor, WindowHandle};
pub use session::{SessionId, SessionOrchestrator, SessionRegistry, StateChange, StateChangeSink};
pub use transcript::TranscriptWatcher;
