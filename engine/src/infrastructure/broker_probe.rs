//! Broker probe
//! Kafka readiness as seen from ZooKeeper: at least one registered broker id

use crate::constants::probe::{ATTEMPT_TIMEOUT, BROKERS_PATH, BROKER_IDS_PATH};
use crate::constants::shutdown::CLIENT_CLOSE_TIMEOUT;
use crate::domain::ports::{CoordinationClient, CoordinationConnector, ReadinessProbe};
use crate::domain::{ProbeError, ServiceKind};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, warn};

pub struct BrokerProbe {
    coordination_port: u16,
    timeout: Duration,
    connector: Arc<dyn CoordinationConnector>,
}

impl BrokerProbe {
    pub fn new(coordination_port: u16, connector: Arc<dyn CoordinationConnector>) -> Self {
        Self {
            coordination_port,
            timeout: ATTEMPT_TIMEOUT,
            connector,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ReadinessProbe for BrokerProbe {
    fn service(&self) -> ServiceKind {
        ServiceKind::Broker
    }

    async fn check(&self, elapsed: Duration) -> Result<(), ProbeError> {
        debug!(
            coordination_port = self.coordination_port,
            elapsed_ms = elapsed.as_millis() as u64,
            "Checking kafka broker registration"
        );

        // One deadline covers the connect and all three lookups.
        let deadline = Instant::now() + self.timeout;

        let mut client = match timeout_at(deadline, self.connector.connect(self.coordination_port)).await {
            Ok(Ok(client)) => client,
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(ProbeError::Timeout),
        };

        let outcome = match timeout_at(deadline, broker_registered(client.as_mut())).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProbeError::Timeout),
        };

        if timeout(CLIENT_CLOSE_TIMEOUT, client.close()).await.is_err() {
            warn!(
                coordination_port = self.coordination_port,
                "Coordination client close timed out"
            );
        }
        outcome
    }
}

async fn broker_registered(client: &mut dyn CoordinationClient) -> Result<(), ProbeError> {
    for path in [BROKERS_PATH, BROKER_IDS_PATH] {
        if !client.exists(path).await? {
            return Err(ProbeError::MissingPath(path.to_string()));
        }
    }

    let ids = client.children(BROKER_IDS_PATH).await?;
    if ids.is_empty() {
        return Err(ProbeError::NoBrokersRegistered);
    }
    debug!(brokers = ?ids, "Kafka broker registered");
    Ok(())
}
