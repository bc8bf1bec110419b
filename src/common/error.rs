//! Error types for zkelect

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config source error: {0}")]
    Config(#[from] config::ConfigError),

    // === Session Errors ===
    #[error("Connect to coordination service timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    // === Coordination Errors ===
    #[error("Node already exists: {0}")]
    NodeExists(String),

    #[error("Node does not exist: {0}")]
    NoNode(String),

    #[error("Coordination error: {0}")]
    Coordination(String),

    #[error("Create returned different path: expected {expected}, got {actual}")]
    ProtocolInvariant { expected: String, actual: String },

    // === Generic ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Is this a retryable error?
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::ConnectTimeout(_) | Error::ConnectionFailed(_) | Error::Coordination(_)
        )
    }

    /// Did the failure come from bad input rather than the coordination service?
    pub fn is_config(&self) -> bool {
        matches!(self, Error::InvalidConfig(_) | Error::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(Error::ConnectTimeout(Duration::from_secs(3)).is_retryable());
        assert!(Error::Coordination("connection loss".into()).is_retryable());
        assert!(!Error::InvalidConfig("empty".into()).is_retryable());
        assert!(!Error::ProtocolInvariant {
            expected: "/a".into(),
            actual: "/b".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_protocol_invariant_message() {
        let err = Error::ProtocolInvariant {
            expected: "/ROOT/MASTER".into(),
            actual: "/ROOT/OTHER".into(),
        };
        assert_eq!(
            err.to_string(),
            "Create returned different path: expected /ROOT/MASTER, got /ROOT/OTHER"
        );
        assert!(!err.is_config());
        assert!(Error::InvalidConfig("x".into()).is_config());
    }
}
