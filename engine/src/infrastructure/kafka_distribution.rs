//! Kafka distribution layout
//! Where the run/stop scripts and config templates live under a Kafka home

use crate::domain::ports::ServiceLayout;
use crate::domain::{ServiceKind, ServiceSpec};
use std::path::{Path, PathBuf};

const RUN_CLASS: &str = "kafka-run-class";
const ZOOKEEPER_MAIN: &str = "org.apache.zookeeper.server.quorum.QuorumPeerMain";
const KAFKA_MAIN: &str = "kafka.Kafka";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// `bin/*.sh`, run through `bash`.
    Unix,
    /// `bin/windows/*.bat`, run directly.
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }
}

#[derive(Debug, Clone)]
pub struct KafkaDistribution {
    home: PathBuf,
    platform: Platform,
    log4j_config: Option<PathBuf>,
}

impl KafkaDistribution {
    pub fn new(home: impl Into<PathBuf>, platform: Platform) -> Self {
        Self {
            home: home.into(),
            platform,
            log4j_config: None,
        }
    }

    /// Point `KAFKA_LOG4J_OPTS` of both services at this log4j file.
    pub fn with_log4j_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.log4j_config = Some(path.into());
        self
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Template shipped in `config/` for `kind`.
    pub fn template_path(&self, kind: ServiceKind) -> PathBuf {
        self.home.join("config").join(Self::config_file_name(kind))
    }

    pub fn config_file_name(kind: ServiceKind) -> &'static str {
        match kind {
            ServiceKind::Coordination => "zookeeper.properties",
            ServiceKind::Broker => "server.properties",
        }
    }

    fn script(&self, stem: &str) -> PathBuf {
        match self.platform {
            Platform::Unix => self.home.join("bin").join(format!("{stem}.sh")),
            Platform::Windows => self
                .home
                .join("bin")
                .join("windows")
                .join(format!("{stem}.bat")),
        }
    }

    fn main_class(kind: ServiceKind) -> &'static str {
        match kind {
            ServiceKind::Coordination => ZOOKEEPER_MAIN,
            ServiceKind::Broker => KAFKA_MAIN,
        }
    }

    fn stop_script_stem(kind: ServiceKind) -> &'static str {
        match kind {
            ServiceKind::Coordination => "zookeeper-server-stop",
            ServiceKind::Broker => "kafka-server-stop",
        }
    }
}

impl ServiceLayout for KafkaDistribution {
    fn launch_spec(&self, kind: ServiceKind, dir: &Path, port: u16) -> ServiceSpec {
        let run_class = self.script(RUN_CLASS).display().to_string();
        let config = dir.join(Self::config_file_name(kind)).display().to_string();
        let main = Self::main_class(kind);

        let spec = match self.platform {
            Platform::Unix => {
                ServiceSpec::new(kind.as_str(), "bash").with_args([run_class, main.to_string(), config])
            }
            Platform::Windows => {
                ServiceSpec::new(kind.as_str(), run_class).with_args([main.to_string(), config])
            }
        };

        let spec = spec
            .with_working_dir(dir)
            .with_env("LOG_DIR", dir.display().to_string())
            .with_port(port);

        match &self.log4j_config {
            Some(path) => spec.with_env(
                "KAFKA_LOG4J_OPTS",
                format!("-Dlog4j.configuration=file:{}", path.display()),
            ),
            None => spec,
        }
    }

    fn stop_spec(&self, kind: ServiceKind) -> ServiceSpec {
        ServiceSpec::new(
            format!("{}-stop", kind.as_str()),
            self.script(Self::stop_script_stem(kind)).display().to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_launch_spec_runs_through_bash() {
        let dist = KafkaDistribution::new("/opt/kafka", Platform::Unix);
        let spec = dist.launch_spec(ServiceKind::Coordination, Path::new("/tmp/zookeeper-x"), 18000);

        assert_eq!(spec.name(), "zookeeper");
        assert_eq!(spec.command(), "bash");
        assert_eq!(
            spec.args(),
            [
                "/opt/kafka/bin/kafka-run-class.sh",
                "org.apache.zookeeper.server.quorum.QuorumPeerMain",
                "/tmp/zookeeper-x/zookeeper.properties",
            ]
        );
        assert_eq!(spec.working_dir(), Some(Path::new("/tmp/zookeeper-x")));
        assert_eq!(spec.env()["LOG_DIR"], "/tmp/zookeeper-x");
        assert!(!spec.env().contains_key("KAFKA_LOG4J_OPTS"));
        assert_eq!(spec.port(), Some(18000));
    }

    #[test]
    fn test_windows_launch_spec_runs_bat_directly() {
        let dist = KafkaDistribution::new("/opt/kafka", Platform::Windows);
        let spec = dist.launch_spec(ServiceKind::Broker, Path::new("/tmp/kafka-x"), 18001);

        assert_eq!(spec.name(), "kafka");
        assert_eq!(
            Path::new(spec.command()),
            Path::new("/opt/kafka/bin/windows/kafka-run-class.bat")
        );
        assert_eq!(spec.args()[0], "kafka.Kafka");
    }

    #[test]
    fn test_log4j_override() {
        let dist = KafkaDistribution::new("/opt/kafka", Platform::Unix)
            .with_log4j_config("/etc/kafka-please/log4j.properties");
        let spec = dist.launch_spec(ServiceKind::Broker, Path::new("/tmp/kafka-x"), 18001);

        assert_eq!(
            spec.env()["KAFKA_LOG4J_OPTS"],
            "-Dlog4j.configuration=file:/etc/kafka-please/log4j.properties"
        );
    }

    #[test]
    fn test_stop_specs() {
        let dist = KafkaDistribution::new("/opt/kafka", Platform::Unix);

        let stop = dist.stop_spec(ServiceKind::Broker);
        assert_eq!(stop.name(), "kafka-stop");
        assert_eq!(stop.command(), "/opt/kafka/bin/kafka-server-stop.sh");
        assert!(stop.args().is_empty());
        assert!(stop.port().is_none());

        let stop = dist.stop_spec(ServiceKind::Coordination);
        assert_eq!(stop.command(), "/opt/kafka/bin/zookeeper-server-stop.sh");
    }

    #[test]
    fn test_template_paths() {
        let dist = KafkaDistribution::new("/opt/kafka", Platform::current());
        assert_eq!(
            dist.template_path(ServiceKind::Coordination),
            Path::new("/opt/kafka/config/zookeeper.properties")
        );
        assert_eq!(
            dist.template_path(ServiceKind::Broker),
            Path::new("/opt/kafka/config/server.properties")
        );
    }
}
