//! Error types for the edges of the core.
//!
//! The session state machine itself never fails; these errors only come out
//! of configuration loading, payload parsing and monitor startup.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BeaconError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Platform monitor failed to start: {0}")]
    Monitor(String),

    #[error("Invalid hook payload: {0}")]
    InvalidPayload(String),
}

pub type Result<T> = std::result::Result<T, BeaconError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_displays_message() {
        let error = BeaconError::Config("bad port".to_string());
        assert_eq!(error.to_string(), "Invalid configuration: bad port");
    }

    #[test]
    fn io_error_converts() {
        fn open_missing() -> Result<std::fs::File> {
            Ok(std::fs::File::open("/definitely/not/here/beacon")?)
        }
        assert!(matches!(open_missing(), Err(BeaconError::Io(_))));
    }

    #[test]
    fn invalid_payload_displays_message() {
        let error = BeaconError::InvalidPayload("expected value".to_string());
        assert_eq!(error.to_string(), "Invalid hook payload: expected value");
    }
}
