//! Event journal.
//!
//! Appends every published wire event to `{log_dir}/{log_id}.log` with a
//! timestamp, independent of the `log` facade's output.

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
    sync::{Arc, Mutex},
};

use chrono::{SecondsFormat, Utc};
use tokio_util::sync::CancellationToken;

use crate::event_bus::EventBus;

/// Thread-safe handle to an append-only log file.
pub type LogHandle = Arc<Mutex<Option<File>>>;

/// Current UTC time as RFC 3339 with milliseconds (e.g. 2026-02-04T10:15:30.123Z).
fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Write a timestamped line to the log file (if present).
pub fn log_line(handle: &LogHandle, label: &str, data: &str) {
    if let Ok(mut guard) = handle.lock() {
        if let Some(ref mut file) = *guard {
            let _ = writeln!(file, "[{}] {}: {}", utc_timestamp(), label, data);
            let _ = file.flush();
        }
    }
}

/// Open (or create) `{log_dir}/{log_id}.log` and return a shared handle.
///
/// Without a directory, or if the file cannot be opened, the handle is empty
/// and writes are discarded.
pub fn open_log_file(log_dir: Option<&Path>, log_id: &str) -> LogHandle {
    let file = log_dir.and_then(|dir| {
        let path = dir.join(format!("{}.log", log_id));
        if let Err(e) = std::fs::create_dir_all(dir) {
            log::warn!("Cannot create log dir {}: {}", dir.display(), e);
            return None;
        }
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => Some(file),
            Err(e) => {
                log::warn!("Cannot open {}: {}", path.display(), e);
                None
            }
        }
    });
    Arc::new(Mutex::new(file))
}

/// Subscribe to the bus and journal every event until `cancel` fires.
pub async fn run_event_journal(bus: Arc<EventBus>, handle: LogHandle, cancel: CancellationToken) {
    let mut subscription = bus.subscribe();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            event = subscription.recv() => match event {
                Some(event) => match serde_json::to_string(&event) {
                    Ok(json) => log_line(&handle, "EVENT", &json),
                    Err(e) => log::warn!("Cannot serialize {} event: {}", event.kind(), e),
                },
                None => break,
            },
        }
    }
    bus.unsubscribe(subscription.id());
}
