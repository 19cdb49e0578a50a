//! Transcript tailing for agents that do not report approval prompts.

mod line;
mod watcher;

pub use line::TranscriptLine;
pub use watcher::TranscriptWatcher;
