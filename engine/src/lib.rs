//! Disposable single-node ZooKeeper + Kafka clusters for test suites.
//!
//! ```rust,no_run
//! # async fn demo() -> kafka_please::Result<()> {
//! let config = kafka_please::ClusterConfig::from_env()?;
//! let cluster = kafka_please::start_cluster(&config).await?;
//! println!("bootstrap servers: {}", cluster.bootstrap_servers());
//! cluster.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod constants;
pub mod domain;
pub mod infrastructure;
pub mod logging;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_support;

pub use domain::services::{
    wait_for_check, ClusterDependencies, ClusterOrchestrator, PortRegistry, RetryScheduler,
    ServiceSupervisor, SupervisedService,
};
pub use domain::{
    ClusterHandle, ClusterSettings, DomainError, ProbeError, Result, RetryBudget, ServiceHandle,
    ServiceKind, ServiceSpec, ServiceState,
};
pub use infrastructure::ClusterConfig;

use std::sync::Arc;

/// Start a ready cluster with the real adapters.
///
/// Ports are claimed in [`PortRegistry::shared`], so clusters started
/// concurrently from one process never get the same port.
pub async fn start_cluster(config: &ClusterConfig) -> Result<ClusterHandle> {
    start_cluster_with_registry(config, PortRegistry::shared()).await
}

/// Like [`start_cluster`], deduplicating ports against `registry` only.

pub async fn start_cluster_with_registry(
    config: &ClusterConfig,
    registry: Arc<PortRegistry>,
) -> Result<ClusterHandle> {
    config.validate()?;
    let deps = infrastructure::cluster_dependencies(config, registry);
    ClusterOrchestrator::new(deps, config.settings()).create().await
}
