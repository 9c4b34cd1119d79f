//! Domain-level errors
//!
//! [`ProbeError`] describes why a single readiness attempt failed; every variant
//! is retryable and is swallowed by the retry scheduler. [`DomainError`] is what
//! callers of the supervisor and orchestrator see.

use std::time::Duration;
use thiserror::Error;

/// Outcome of one failed readiness attempt
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Expected \"imok\" from health check, but got {0}")]
    UnexpectedResponse(String),

    #[error("Connection timed out")]
    Timeout,

    #[error("The {0} path doesn't exist in ZooKeeper yet")]
    MissingPath(String),

    #[error("There are no kafka brokers registered in ZooKeeper")]
    NoBrokersRegistered,

    #[error("Malformed coordination service reply: {0}")]
    Protocol(String),

    #[error("Coordination service returned error code {code} for {path}")]
    Coordination { path: String, code: i32 },
}

#[derive(Debug, Error, Clone)]
pub enum DomainError {
    #[error("Failed to spawn '{command}': {reason}")]
    Spawn { command: String, reason: String },

    /// Retry budget exhausted. Never produced for a single failed attempt.
    #[error(
        "{service} not ready after {}ms ({attempts} attempts){}",
        elapsed.as_millis(),
        last_error.as_ref().map(|e| format!(", last failure: {e}")).unwrap_or_default()
    )]
    ReadinessTimeout {
        service: String,
        elapsed: Duration,
        attempts: u32,
        last_error: Option<ProbeError>,
    },

    #[error("Port allocation failed: {0}")]
    PortAllocation(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Shutdown of {service} failed: {reason}")]
    Shutdown { service: String, reason: String },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },
}

impl DomainError {
    pub fn io(context: impl std::fmt::Display, err: std::io::Error) -> Self {
        DomainError::Io(format!("{context}: {err}"))
    }

    /// True when the error came from the retry scheduler running out of time.
    pub fn is_readiness_timeout(&self) -> bool {
        matches!(self, DomainError::ReadinessTimeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readiness_timeout_message_includes_last_failure() {
        let err = DomainError::ReadinessTimeout {
            service: "zookeeper".to_string(),
            elapsed: Duration::from_millis(31_000),
            attempts: 32,
            last_error: Some(ProbeError::Timeout),
        };
        assert_eq!(
            err.to_string(),
            "zookeeper not ready after 31000ms (32 attempts), last failure: Connection timed out"
        );
        assert!(err.is_readiness_timeout());
    }

    #[test]
    fn test_readiness_timeout_message_without_failure() {
        let err = DomainError::ReadinessTimeout {
            service: "kafka".to_string(),
            elapsed: Duration::ZERO,
            attempts: 0,
            last_error: None,
        };
        assert_eq!(err.to_string(), "kafka not ready after 0ms (0 attempts)");
    }

    #[test]
    fn test_probe_error_messages() {
        assert_eq!(
            ProbeError::UnexpectedResponse("nope".into()).to_string(),
            "Expected \"imok\" from health check, but got nope"
        );
        assert_eq!(
            ProbeError::MissingPath("/brokers/ids".into()).to_string(),
            "The /brokers/ids path doesn't exist in ZooKeeper yet"
        );
    }

    #[test]
    fn test_spawn_error_is_not_readiness_timeout() {
        let err = DomainError::Spawn {
            command: "/nonexistent".into(),
            reason: "No such file or directory".into(),
        };
        assert!(!err.is_readiness_timeout());
    }
}
