//! Application-wide constants and default values
//!
//! Centralizes magic numbers and default configurations for better maintainability

use std::time::Duration;

/// Retry scheduler defaults
pub mod retry {
    use super::Duration;

    /// Total budget when no timeout is given
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(60_000);

    /// Fixed pause between two attempts
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(1_000);

    /// Budget used by the service supervisor for each supervised start
    pub const SUPERVISED_START_TIMEOUT: Duration = Duration::from_millis(30_000);
}

/// Readiness probe defaults
pub mod probe {
    use super::Duration;

    /// Connect + response budget of a single probe attempt
    pub const ATTEMPT_TIMEOUT: Duration = Duration::from_millis(1_000);

    /// Four-letter liveness command understood by ZooKeeper
    pub const RUOK: &[u8; 4] = b"ruok";

    /// Expected answer to [`RUOK`]
    pub const IMOK: &str = "imok";

    /// Path created by the first broker that registers
    pub const BROKERS_PATH: &str = "/brokers";

    /// Parent of the ephemeral broker registration nodes
    pub const BROKER_IDS_PATH: &str = "/brokers/ids";
}

/// Cluster orchestration defaults
pub mod cluster {
    use super::Duration;

    /// Unconditional wait between broker launch and the first broker probe
    pub const BROKER_GRACE_DELAY: Duration = Duration::from_millis(1_000);

    /// First port tried by the port finder
    pub const BASE_PORT: u16 = 18_000;

    /// How many times the orchestrator asks the allocator for a fresh port
    /// before giving up on a single slot
    pub const MAX_PORT_ATTEMPTS: u32 = 64;

    /// Prefix of the coordination service scratch directory
    pub const ZOOKEEPER_DIR_PREFIX: &str = "zookeeper-";

    /// Prefix of the broker scratch directory
    pub const KAFKA_DIR_PREFIX: &str = "kafka-";
}

/// Shutdown defaults
pub mod shutdown {
    use super::Duration;

    /// Upper bound for the coordination client close handshake
    pub const CLIENT_CLOSE_TIMEOUT: Duration = Duration::from_millis(500);
}
