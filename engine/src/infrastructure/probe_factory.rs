//! Standard probe factory
//! Builds the real network probes once the cluster's ports are known

use crate::constants::probe::ATTEMPT_TIMEOUT;
use crate::domain::ports::{CoordinationConnector, ProbeFactory, ReadinessProbe};
use crate::infrastructure::zookeeper::ZooKeeperConnector;
use crate::infrastructure::{BrokerProbe, CoordinationProbe};
use std::sync::Arc;
use std::time::Duration;

pub struct StandardProbeFactory {
    attempt_timeout: Duration,
    connector: Arc<dyn CoordinationConnector>,
}

impl StandardProbeFactory {
    pub fn new(attempt_timeout: Duration) -> Self {
        Self {
            attempt_timeout,
            connector: Arc::new(ZooKeeperConnector::new(attempt_timeout)),
        }
    }

    /// Use a different coordination client for the broker probe.
    pub fn with_connector(mut self, connector: Arc<dyn CoordinationConnector>) -> Self {
        self.connector = connector;
        self
    }
}

impl Default for StandardProbeFactory {
    fn default() -> Self {
        Self::new(ATTEMPT_TIMEOUT)
    }
}

impl ProbeFactory for StandardProbeFactory {
    fn coordination_probe(&self, port: u16) -> Box<dyn ReadinessProbe> {
        Box::new(CoordinationProbe::new(port).with_timeout(self.attempt_timeout))
    }

    fn broker_probe(&self, coordination_port: u16) -> Box<dyn ReadinessProbe> {
        Box::new(
            BrokerProbe::new(coordination_port, self.connector.clone())
                .with_timeout(self.attempt_timeout),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ServiceKind;
    use crate::test_support::FakeZooKeeper;

    #[tokio::test]
    async fn test_probes_target_the_same_server() {
        let server = FakeZooKeeper::start()
            .await
            .unwrap()
            .with_node("/brokers/ids/1");
        let factory = StandardProbeFactory::default();

        let coordination = factory.coordination_probe(server.port());
        let broker = factory.broker_probe(server.port());

        assert_eq!(coordination.service(), ServiceKind::Coordination);
        assert_eq!(broker.service(), ServiceKind::Broker);
        coordination.check(Duration::ZERO).await.unwrap();
        broker.check(Duration::ZERO).await.unwrap();
        assert_eq!(server.closed_sessions(), 1);
    }
}
