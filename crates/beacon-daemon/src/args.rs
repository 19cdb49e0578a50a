use std::path::PathBuf;

use clap::Parser;

use beacon_core::config::BeaconConfig;
use beacon_core::error::Result;
use beacon_core::paths::default_config_path;

/// Beacon daemon - tells you when a coding agent needs you
#[derive(Parser, Debug)]
#[command(name = "beacon-daemon", version)]
pub struct Args {
    /// Config file (default: ~/.config/beacon/config.json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// HTTP port on 127.0.0.1
    #[arg(long)]
    pub port: Option<u16>,

    /// Emit synthetic events instead of tracking real sessions
    #[arg(long)]
    pub fake: bool,

    /// Seconds of inactivity before a focused session is notified anyway
    #[arg(long)]
    pub afk_threshold: Option<u64>,

    /// Editor process name whose focused window suppresses notifications
    #[arg(long)]
    pub target_process: Option<String>,

    /// Append every wire event to {dir}/events.log
    #[arg(long, env = "BEACON_EVENT_LOG_DIR")]
    pub event_log_dir: Option<PathBuf>,
}

impl Args {
    /// Load the config file and apply command-line overrides.
    pub fn load_config(&self) -> Result<BeaconConfig> {
        let mut config = match self.config.clone().or_else(default_config_path) {
            Some(path) => BeaconConfig::load(&path)?,
            None => {
                log::warn!("Cannot resolve home directory, using default config");
                BeaconConfig::default()
            }
        };
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut BeaconConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.fake {
            config.fake_mode = true;
        }
        if let Some(seconds) = self.afk_threshold {
            config.afk_threshold_seconds = seconds;
        }
        if let Some(name) = &self.target_process {
            config.target_process_name = name.clone();
        }
    }
}
