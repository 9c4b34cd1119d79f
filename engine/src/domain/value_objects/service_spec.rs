//! ServiceSpec value object
//! Immutable description of how to launch one external process

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// How to launch one service (or one of its helper scripts).
///
/// The environment is applied on top of the inherited process environment;
/// entries here win on key collision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    name: String,
    command: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    env: BTreeMap<String, String>,
    port: Option<u16>,
}

impl ServiceSpec {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            working_dir: None,
            env: BTreeMap::new(),
            port: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Port the service listens on; `None` for helper scripts.
    pub fn port(&self) -> Option<u16> {
        self.port
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_everything() {
        let spec = ServiceSpec::new("zookeeper", "bash")
            .with_args(["run.sh", "Main"])
            .with_args(vec!["config.properties".to_string()])
            .with_working_dir("/tmp/zk")
            .with_env("LOG_DIR", "/tmp/zk")
            .with_port(18000);

        assert_eq!(spec.name(), "zookeeper");
        assert_eq!(spec.command(), "bash");
        assert_eq!(spec.args(), ["run.sh", "Main", "config.properties"]);
        assert_eq!(spec.working_dir(), Some(Path::new("/tmp/zk")));
        assert_eq!(spec.env().get("LOG_DIR").map(String::as_str), Some("/tmp/zk"));
        assert_eq!(spec.port(), Some(18000));
    }

    #[test]
    fn test_later_env_override_wins() {
        let spec = ServiceSpec::new("x", "true")
            .with_env("KEY", "first")
            .with_env("KEY", "second");
        assert_eq!(spec.env().len(), 1);
        assert_eq!(spec.env()["KEY"], "second");
    }

    #[test]
    fn test_helper_script_has_no_port() {
        let spec = ServiceSpec::new("zookeeper-stop", "/opt/kafka/bin/zookeeper-server-stop.sh");
        assert!(spec.port().is_none());
        assert!(spec.args().is_empty());
        assert!(spec.working_dir().is_none());
    }
}
