//! Subcommand handlers

use crate::ProbeTarget;
use anyhow::Context;
use kafka_please::domain::ports::ReadinessProbe;
use kafka_please::infrastructure::{BrokerProbe, CoordinationProbe, ZooKeeperConnector};
use kafka_please::{start_cluster, ClusterConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub async fn up(config_file: Option<&Path>, kafka_home: Option<PathBuf>) -> anyhow::Result<()> {
    let mut config = ClusterConfig::load(config_file).context("Failed to load configuration")?;
    if let Some(home) = kafka_home {
        config.kafka_home = home;
    }

    let cluster = start_cluster(&config)
        .await
        .with_context(|| format!("Failed to start cluster from {}", config.kafka_home.display()))?;

    println!("zookeeper: {}", cluster.zookeeper_connect());
    println!("kafka:     {}", cluster.bootstrap_servers());
    info!("Cluster running, press Ctrl-C to stop");

    let interrupted = tokio::signal::ctrl_c().await;
    let closed = cluster.close().await;
    interrupted.context("Failed to listen for Ctrl-C")?;
    closed.context("Failed to stop cluster cleanly")?;
    Ok(())
}

pub async fn probe(target: ProbeTarget) -> ExitCode {
    let probe: Box<dyn ReadinessProbe> = match target {
        ProbeTarget::Zookeeper { port, timeout_ms } => {
            Box::new(CoordinationProbe::new(port).with_timeout(Duration::from_millis(timeout_ms)))
        }
        ProbeTarget::Broker { zk_port, timeout_ms } => {
            let timeout = Duration::from_millis(timeout_ms);
            Box::new(
                BrokerProbe::new(zk_port, Arc::new(ZooKeeperConnector::new(timeout)))
                    .with_timeout(timeout),
            )
        }
    };

    match probe.check(Duration::ZERO).await {
        Ok(()) => {
            println!("{} is ready", probe.service());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} is not ready: {e}", probe.service());
            ExitCode::FAILURE
        }
    }
}
