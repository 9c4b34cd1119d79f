//! ClusterSettings value object
//! Timing knobs of one cluster creation

use crate::constants::{cluster, retry};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterSettings {
    /// Readiness budget for each supervised start.
    pub startup_timeout: Duration,
    /// Pause between two readiness attempts.
    pub retry_delay: Duration,
    /// Wait between broker launch and its first probe.
    pub broker_grace_delay: Duration,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            startup_timeout: retry::SUPERVISED_START_TIMEOUT,
            retry_delay: retry::DEFAULT_DELAY,
            broker_grace_delay: cluster::BROKER_GRACE_DELAY,
        }
    }
}
