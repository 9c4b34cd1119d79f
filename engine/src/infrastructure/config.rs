//! Cluster configuration
//!
//! Defaults, overlaid by an optional YAML file, overlaid by `KAFKA_PLEASE_*`
//! environment variables.

use crate::constants::{cluster, probe, retry};
use crate::domain::{ClusterSettings, DomainError};
use crate::infrastructure::{KafkaDistribution, Platform};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_HOME: &str = "KAFKA_PLEASE_HOME";
pub const ENV_BASE_PORT: &str = "KAFKA_PLEASE_BASE_PORT";
pub const ENV_STARTUP_TIMEOUT_MS: &str = "KAFKA_PLEASE_STARTUP_TIMEOUT_MS";
pub const ENV_RETRY_DELAY_MS: &str = "KAFKA_PLEASE_RETRY_DELAY_MS";
pub const ENV_GRACE_DELAY_MS: &str = "KAFKA_PLEASE_GRACE_DELAY_MS";
pub const ENV_PROBE_TIMEOUT_MS: &str = "KAFKA_PLEASE_PROBE_TIMEOUT_MS";
pub const ENV_LOG4J_CONFIG: &str = "KAFKA_PLEASE_LOG4J_CONFIG";

const DEFAULT_KAFKA_HOME: &str = "./kafka";

/// Everything needed to wire a real cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Root of an unpacked Kafka distribution (`bin/`, `config/`).
    pub kafka_home: PathBuf,

    /// First port the port finder tries
    pub base_port: u16,

    /// Readiness budget of each service
    pub startup_timeout: Duration,

    /// Pause between readiness attempts
    pub retry_delay: Duration,

    /// Wait between broker launch and its first probe
    pub broker_grace_delay: Duration,

    /// Budget of a single probe attempt
    pub probe_timeout: Duration,

    /// log4j file handed to both services through `KAFKA_LOG4J_OPTS`
    pub log4j_config: Option<PathBuf>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            kafka_home: PathBuf::from(DEFAULT_KAFKA_HOME),
            base_port: cluster::BASE_PORT,
            startup_timeout: retry::SUPERVISED_START_TIMEOUT,
            retry_delay: retry::DEFAULT_DELAY,
            broker_grace_delay: cluster::BROKER_GRACE_DELAY,
            probe_timeout: probe::ATTEMPT_TIMEOUT,
            log4j_config: None,
        }
    }
}

/// On-disk form; every field is optional
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub kafka_home: Option<PathBuf>,

    #[serde(default)]
    pub base_port: Option<u16>,

    #[serde(default)]
    pub startup_timeout_ms: Option<u64>,

    #[serde(default)]
    pub retry_delay_ms: Option<u64>,

    #[serde(default)]
    pub grace_delay_ms: Option<u64>,

    #[serde(default)]
    pub probe_timeout_ms: Option<u64>,

    #[serde(default)]
    pub log4j_config: Option<PathBuf>,
}

impl ClusterConfig {
    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self, DomainError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, then `path` if given, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, DomainError> {
        let mut config = Self::default();
        if let Some(path) = path {
            let text = std::fs::read_to_string(path)
                .map_err(|e| DomainError::io(format!("reading {}", path.display()), e))?;
            config.apply_file(parse_config_file(&text)?);
        }
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_file(&mut self, file: ConfigFile) {
        if let Some(home) = file.kafka_home {
            self.kafka_home = home;
        }
        if let Some(port) = file.base_port {
            self.base_port = port;
        }
        if let Some(ms) = file.startup_timeout_ms {
            self.startup_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = file.retry_delay_ms {
            self.retry_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = file.grace_delay_ms {
            self.broker_grace_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = file.probe_timeout_ms {
            self.probe_timeout = Duration::from_millis(ms);
        }
        if file.log4j_config.is_some() {
            self.log4j_config = file.log4j_config;
        }
    }

    pub fn apply_env(&mut self) -> Result<(), DomainError> {
        if let Ok(home) = env::var(ENV_HOME) {
            self.kafka_home = PathBuf::from(home);
        }
        if let Some(port) = parse_var::<u16>(ENV_BASE_PORT)? {
            self.base_port = port;
        }
        if let Some(ms) = parse_var::<u64>(ENV_STARTUP_TIMEOUT_MS)? {
            self.startup_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(ENV_RETRY_DELAY_MS)? {
            self.retry_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(ENV_GRACE_DELAY_MS)? {
            self.broker_grace_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(ENV_PROBE_TIMEOUT_MS)? {
            self.probe_timeout = Duration::from_millis(ms);
        }
        if let Ok(path) = env::var(ENV_LOG4J_CONFIG) {
            self.log4j_config = Some(PathBuf::from(path));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.retry_delay.is_zero() {
            return Err(DomainError::Config(
                "retry delay must be greater than zero".to_string(),
            ));
        }
        if self.base_port == 0 {
            return Err(DomainError::Config("base port must not be 0".to_string()));
        }
        if self.probe_timeout.is_zero() {
            return Err(DomainError::Config(
                "probe timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn settings(&self) -> ClusterSettings {
        ClusterSettings {
            startup_timeout: self.startup_timeout,
            retry_delay: self.retry_delay,
            broker_grace_delay: self.broker_grace_delay,
        }
    }

    /// Layout of the configured Kafka home for this platform.
    pub fn distribution(&self) -> KafkaDistribution {
        let distribution = KafkaDistribution::new(&self.kafka_home, Platform::current());
        match &self.log4j_config {
            Some(path) => distribution.with_log4j_config(path),
            None => distribution,
        }
    }
}

pub fn parse_config_file(text: &str) -> Result<ConfigFile, DomainError> {
    serde_yaml::from_str(text).map_err(|e| DomainError::Config(format!("invalid config file: {e}")))
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>, DomainError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| DomainError::Config(format!("{name}={raw:?} is not a valid number"))),
        Err(_) => Ok(None),
    }
}
