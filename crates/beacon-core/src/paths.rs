use std::env;
use std::path::PathBuf;

/// Return the user's home directory path.
///
/// Uses HOME on Unix-like systems and USERPROFILE on Windows.
pub fn get_home_dir() -> Option<PathBuf> {
    ["HOME", "USERPROFILE"]
        .iter()
        .filter_map(|key| env::var(key).ok())
        .find(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Default location of the daemon config file: `~/.config/beacon/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    get_home_dir().map(|home| home.join(".config").join("beacon").join("config.json"))
}
