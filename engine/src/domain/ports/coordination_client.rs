//! Coordination client port
//! The subset of the ZooKeeper client API the broker probe needs

use crate::domain::ProbeError;
use async_trait::async_trait;

/// A connected coordination-service session.
#[async_trait]
pub trait CoordinationClient: Send {
    /// Whether a node exists at `path`.
    async fn exists(&mut self, path: &str) -> Result<bool, ProbeError>;

    /// Names of the children of `path`.
    async fn children(&mut self, path: &str) -> Result<Vec<String>, ProbeError>;

    /// End the session. Errors are swallowed; the connection is released either way.
    async fn close(&mut self);
}

/// Opens coordination-service sessions.
#[async_trait]
pub trait CoordinationConnector: Send + Sync {
    async fn connect(&self, port: u16) -> Result<Box<dyn CoordinationClient>, ProbeError>;
}
