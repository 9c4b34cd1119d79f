//! Infrastructure Layer
//!
//! Adapters that implement the domain ports against the real OS and network:
//!
//! - `TokioProcessLauncher`: child processes via tokio
//! - `CoordinationProbe`, `BrokerProbe`: readiness checks over TCP
//! - `zookeeper`: the minimal coordination-service client behind `BrokerProbe`
//! - `PortFinder`, `TempDirFactory`, `PropertiesMaterializer`,
//!   `KafkaDistribution`: per-run resources
//! - `ClusterConfig`: defaults, YAML file and environment overrides

pub mod broker_probe;
pub mod config;
pub mod coordination_probe;
pub mod kafka_distribution;
pub mod port_finder;
pub mod probe_factory;
pub mod properties;
pub mod temp_dir;
pub mod tokio_launcher;
pub mod zookeeper;

pub use broker_probe::BrokerProbe;
pub use config::{parse_config_file, ClusterConfig, ConfigFile};
pub use coordination_probe::CoordinationProbe;
pub use kafka_distribution::{KafkaDistribution, Platform};
pub use port_finder::PortFinder;
pub use probe_factory::StandardProbeFactory;
pub use properties::{PropertiesFile, PropertiesMaterializer};
pub use temp_dir::TempDirFactory;
pub use tokio_launcher::{TokioProcessHandle, TokioProcessLauncher};
pub use zookeeper::ZooKeeperConnector;

use crate::domain::services::{ClusterDependencies, PortRegistry};
use std::sync::Arc;

/// Real adapters for `config`, sharing `registry` with any other cluster
/// started by this process.
pub fn cluster_dependencies(config: &ClusterConfig, registry: Arc<PortRegistry>) -> ClusterDependencies {
    let distribution = config.distribution();
    ClusterDependencies {
        launcher: Arc::new(TokioProcessLauncher::new()),
        layout: Arc::new(distribution.clone()),
        ports: Arc::new(PortFinder::new(config.base_port)),
        registry,
        materializer: Arc::new(PropertiesMaterializer::new(distribution)),
        temp_dirs: Arc::new(TempDirFactory::new()),
        probes: Arc::new(StandardProbeFactory::new(config.probe_timeout)),
    }
}
