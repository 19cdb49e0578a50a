//! Daemon configuration.
//!
//! Stored as camelCase JSON. Every field has a default, so a partial file (or
//! no file at all) is valid.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BeaconError, Result};
use crate::hooks::HookAction;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BeaconConfig {
    pub port: u16,
    /// Editor process whose focused window suppresses notifications.
    pub target_process_name: String,
    pub afk_threshold_seconds: u64,
    pub poll_interval_ms: u64,
    pub transcript_poll_interval_ms: u64,
    pub approval_delay_ms: u64,
    pub subscriber_capacity: usize,
    pub fake_mode: bool,
    pub copilot_event_mappings: HashMap<String, HookAction>,
    pub claude_event_mappings: HashMap<String, HookAction>,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            port: 17321,
            target_process_name: "Code".to_string(),
            afk_threshold_seconds: 30,
            poll_interval_ms: 250,
            transcript_poll_interval_ms: 300,
            approval_delay_ms: 4000,
            subscriber_capacity: 256,
            fake_mode: false,
            copilot_event_mappings: default_copilot_mappings(),
            claude_event_mappings: default_claude_mappings(),
        }
    }
}

impl BeaconConfig {
    /// Load from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| {
            BeaconError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: BeaconConfig = serde_json::from_str(&contents).map_err(|e| {
            BeaconError::Config(format!("cannot parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 || self.transcript_poll_interval_ms == 0 {
            return Err(BeaconError::Config(
                "poll intervals must be greater than zero".to_string(),
            ));
        }
        if self.target_process_name.trim().is_empty() {
            return Err(BeaconError::Config(
                "targetProcessName must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn afk_threshold(&self) -> Duration {
        Duration::from_secs(self.afk_threshold_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn transcript_poll_interval(&self) -> Duration {
        Duration::from_millis(self.transcript_poll_interval_ms)
    }

    pub fn approval_delay(&self) -> Duration {
        Duration::from_millis(self.approval_delay_ms)
    }
}

fn default_copilot_mappings() -> HashMap<String, HookAction> {
    [
        ("Stop", HookAction::Done),
        ("PreToolUse", HookAction::WatchTranscript),
        ("UserPromptSubmit", HookAction::Clear),
        ("SessionStart", HookAction::Clear),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn default_claude_mappings() -> HashMap<String, HookAction> {
    [
        ("Stop", HookAction::Done),
        ("SubagentStop", HookAction::Done),
        ("PermissionRequest", HookAction::Waiting),
        ("Notification:permission_prompt", HookAction::Waiting),
        ("Notification:idle_prompt", HookAction::Waiting),
        ("UserPromptSubmit", HookAction::Clear),
        ("SessionStart", HookAction::Clear),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}
