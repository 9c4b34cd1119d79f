//! ClusterHandle entity
//! A ready coordination service plus a ready broker, closed as one unit

use crate::domain::entities::ServiceHandle;
use crate::domain::ports::ScratchDir;
use crate::domain::DomainError;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// Both services of a running cluster.
///
/// Exclusively owns the two service handles and the scratch directories
/// they run in. `close` consumes the cluster and removes the directories
/// once both services are down.
pub struct ClusterHandle {
    coordination: ServiceHandle,
    broker: ServiceHandle,
    scratch: Vec<Box<dyn ScratchDir>>,
}

impl ClusterHandle {
    pub(crate) fn new(
        coordination: ServiceHandle,
        broker: ServiceHandle,
        scratch: Vec<Box<dyn ScratchDir>>,
    ) -> Self {
        Self {
            coordination,
            broker,
            scratch,
        }
    }

    pub fn coordination(&self) -> &ServiceHandle {
        &self.coordination
    }

    pub fn broker(&self) -> &ServiceHandle {
        &self.broker
    }

    /// Data and log directories of both services.
    pub fn scratch_dirs(&self) -> impl Iterator<Item = &Path> {
        self.scratch.iter().map(|dir| dir.path())
    }

    pub fn broker_port(&self) -> u16 {
        self.broker.port()
    }

    pub fn coordination_port(&self) -> u16 {
        self.coordination.port()
    }

    /// `host:port` list for Kafka clients.
    pub fn bootstrap_servers(&self) -> String {
        format!("127.0.0.1:{}", self.broker_port())
    }

    /// `host:port` for ZooKeeper clients.
    pub fn zookeeper_connect(&self) -> String {
        format!("127.0.0.1:{}", self.coordination_port())
    }

    /// Stop the broker, then the coordination service.
    ///
    /// The broker's stop script may need the coordination service, so the
    /// order is strict. The coordination service is closed even when closing
    /// the broker failed; the first error wins.
    pub async fn close(self) -> Result<(), DomainError> {
        info!(
            broker_port = self.broker_port(),
            coordination_port = self.coordination_port(),
            "Closing cluster"
        );
        let Self {
            coordination,
            broker,
            scratch,
        } = self;

        let broker = broker.close().await;
        let coordination = coordination.close().await;

        for dir in scratch {
            let path = dir.path().display().to_string();
            drop(dir);
            debug!(path = %path, "Removed scratch directory");
        }
        broker.and(coordination)
    }
}

impl fmt::Debug for ClusterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterHandle")
            .field("coordination", &self.coordination)
            .field("broker", &self.broker)
            .field("scratch", &self.scratch)
            .finish()
    }
}
