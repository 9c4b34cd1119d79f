//! Cluster Orchestrator
//!
//! Dependency-ordered startup of the coordination service and the broker,
//! one sequential step at a time:
//!
//! 1. claim two distinct ports
//! 2. materialize the ZooKeeper config, start ZooKeeper, wait for Ready
//! 3. materialize the Kafka config (pointing at ZooKeeper), start Kafka,
//!    wait the grace delay, wait for Ready
//!
//! Any failure aborts creation with the first error. Whatever was already
//! started is shut down before the error is returned.

use crate::constants::cluster::{KAFKA_DIR_PREFIX, MAX_PORT_ATTEMPTS, ZOOKEEPER_DIR_PREFIX};
use crate::domain::entities::{ClusterHandle, ServiceHandle};
use crate::domain::ports::{
    ConfigMaterializer, PortAllocator, ProbeFactory, ProcessLauncher, ScratchDir, ServiceLayout,
    TempDirProvider,
};
use crate::domain::services::{
    PortRegistry, RetryScheduler, ServiceSupervisor, SupervisedService,
};
use crate::domain::{ClusterSettings, DomainError, RetryBudget, ServiceKind};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Collaborators the orchestrator drives
#[derive(Clone)]
pub struct ClusterDependencies {
    pub launcher: Arc<dyn ProcessLauncher>,
    pub layout: Arc<dyn ServiceLayout>,
    pub ports: Arc<dyn PortAllocator>,
    pub registry: Arc<PortRegistry>,
    pub materializer: Arc<dyn ConfigMaterializer>,
    pub temp_dirs: Arc<dyn TempDirProvider>,
    pub probes: Arc<dyn ProbeFactory>,
}

pub struct ClusterOrchestrator {
    deps: ClusterDependencies,
    settings: ClusterSettings,
}

impl ClusterOrchestrator {
    pub fn new(deps: ClusterDependencies, settings: ClusterSettings) -> Self {
        Self { deps, settings }
    }

    pub fn settings(&self) -> &ClusterSettings {
        &self.settings
    }

    /// Start a ready ZooKeeper + Kafka pair.
    pub async fn create(&self) -> Result<ClusterHandle, DomainError> {
        let ports = self.allocate_ports(2).await?;
        let (coordination_port, broker_port) = (ports[0], ports[1]);
        info!(
            coordination_port = coordination_port,
            broker_port = broker_port,
            "Creating cluster"
        );

        let supervisor = self.supervisor();

        let (coordination, coordination_dir) = self
            .start_coordination(&supervisor, coordination_port)
            .await?;

        match self
            .start_broker(&supervisor, coordination_port, broker_port)
            .await
        {
            Ok((broker, broker_dir)) => {
                info!(
                    coordination_port = coordination_port,
                    broker_port = broker_port,
                    "Cluster ready"
                );
                Ok(ClusterHandle::new(
                    coordination,
                    broker,
                    vec![coordination_dir, broker_dir],
                ))
            }
            Err(e) => {
                warn!(error = %e, "Broker failed to start, stopping coordination service");
                if let Err(close_err) = coordination.close().await {
                    warn!(error = %close_err, "Failed to stop coordination service after broker failure");
                }
                drop(coordination_dir);
                Err(e)
            }
        }
    }

    /// Claim `count` ports no cluster in this process holds yet.
    ///
    /// A port the allocator offers that is already claimed is skipped and the
    /// allocator is asked again, up to [`MAX_PORT_ATTEMPTS`] times per slot.
    pub async fn allocate_ports(&self, count: usize) -> Result<Vec<u16>, DomainError> {
        let mut ports = Vec::with_capacity(count);
        while ports.len() < count {
            let mut attempts = 0;
            loop {
                attempts += 1;
                let candidate = self.deps.ports.find_port().await?;
                if self.deps.registry.claim(candidate) {
                    debug!(port = candidate, "Claimed port");
                    ports.push(candidate);
                    break;
                }
                debug!(port = candidate, "Port already taken, asking again");
                if attempts >= MAX_PORT_ATTEMPTS {
                    return Err(DomainError::PortAllocation(format!(
                        "no unclaimed port after {attempts} attempts"
                    )));
                }
            }
        }
        Ok(ports)
    }

    fn supervisor(&self) -> ServiceSupervisor {
        let budget = RetryBudget::new(self.settings.startup_timeout, self.settings.retry_delay);
        ServiceSupervisor::new(self.deps.launcher.clone())
            .with_scheduler(RetryScheduler::new(budget))
    }

    async fn start_coordination(
        &self,
        supervisor: &ServiceSupervisor,
        port: u16,
    ) -> Result<(ServiceHandle, Box<dyn ScratchDir>), DomainError> {
        let kind = ServiceKind::Coordination;
        let scratch = self.deps.temp_dirs.create(ZOOKEEPER_DIR_PREFIX)?;
        let dir = self
            .deps
            .materializer
            .materialize(kind, scratch.path(), &coordination_overrides(scratch.path(), port))
            .await?;

        let service = SupervisedService::new(
            kind,
            self.deps.layout.launch_spec(kind, &dir, port),
            self.deps.layout.stop_spec(kind),
            self.deps.probes.coordination_probe(port),
        );
        let handle = supervisor.start(service).await?;
        Ok((handle, scratch))
    }

    async fn start_broker(
        &self,
        supervisor: &ServiceSupervisor,
        coordination_port: u16,
        port: u16,
    ) -> Result<(ServiceHandle, Box<dyn ScratchDir>), DomainError> {
        let kind = ServiceKind::Broker;
        let scratch = self.deps.temp_dirs.create(KAFKA_DIR_PREFIX)?;
        let overrides = broker_overrides(scratch.path(), port, coordination_port);
        let dir = self
            .deps
            .materializer
            .materialize(kind, scratch.path(), &overrides)
            .await?;

        let service = SupervisedService::new(
            kind,
            self.deps.layout.launch_spec(kind, &dir, port),
            self.deps.layout.stop_spec(kind),
            self.deps.probes.broker_probe(coordination_port),
        )
        .with_grace_delay(self.settings.broker_grace_delay);
        let handle = supervisor.start(service).await?;
        Ok((handle, scratch))
    }
}

/// `zookeeper.properties` keys that make the template private to one run.
pub fn coordination_overrides(dir: &Path, port: u16) -> Vec<(String, String)> {
    let dir = dir.display().to_string();
    vec![
        ("dataDir".to_string(), dir.clone()),
        ("clientPort".to_string(), port.to_string()),
        ("zookeeper.log.dir".to_string(), dir),
    ]
}

/// `server.properties` keys that make the template private to one run.
pub fn broker_overrides(dir: &Path, port: u16, coordination_port: u16) -> Vec<(String, String)> {
    vec![
        ("log.dirs".to_string(), dir.display().to_string()),
        ("port".to_string(), port.to_string()),
        ("listeners".to_string(), format!("PLAINTEXT://:{port}")),
        (
            "zookeeper.connect".to_string(),
            format!("127.0.0.1:{coordination_port}"),
        ),
    ]
}
