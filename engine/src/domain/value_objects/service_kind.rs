use std::fmt;

/// The two services that make up a cluster, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    /// ZooKeeper, started first.
    Coordination,
    /// Kafka, registers itself with the coordination service.
    Broker,
}

impl ServiceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceKind::Coordination => "zookeeper",
            ServiceKind::Broker => "kafka",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
