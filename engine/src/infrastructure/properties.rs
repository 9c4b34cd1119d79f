//! Java properties templates
//!
//! Copies a Kafka/ZooKeeper `.properties` template into a service directory
//! with a few keys overridden. Comments, blank lines and key order of the
//! template are kept; keys the template lacks are appended.

use crate::domain::ports::ConfigMaterializer;
use crate::domain::{DomainError, ServiceKind};
use crate::infrastructure::KafkaDistribution;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    /// Comment, blank line, or anything else kept verbatim.
    Verbatim(String),
    Entry { key: String, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertiesFile {
    lines: Vec<Line>,
}

impl PropertiesFile {
    pub fn parse(text: &str) -> Self {
        let lines = text
            .lines()
            .map(|line| {
                let trimmed = line.trim_start();
                if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                    return Line::Verbatim(line.to_string());
                }
                match trimmed.find(['=', ':']) {
                    Some(at) => Line::Entry {
                        key: trimmed[..at].trim_end().to_string(),
                        value: trimmed[at + 1..].trim_start().to_string(),
                    },
                    None => Line::Verbatim(line.to_string()),
                }
            })
            .collect();
        Self { lines }
    }

    /// Raw (escaped) value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| match line {
            Line::Entry { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// Set `key`, escaping backslashes so Windows paths survive the Java loader.
    pub fn set(&mut self, key: &str, value: &str) {
        let escaped = value.replace('\\', "\\\\");
        let existing = self.lines.iter_mut().find_map(|line| match line {
            Line::Entry { key: k, value } if k == key => Some(value),
            _ => None,
        });
        match existing {
            Some(value) => *value = escaped,
            None => self.lines.push(Line::Entry {
                key: key.to_string(),
                value: escaped,
            }),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Verbatim(text) => out.push_str(text),
                Line::Entry { key, value } => {
                    out.push_str(key);
                    out.push('=');
                    out.push_str(value);
                }
            }
            out.push('\n');
        }
        out
    }
}

/// Writes per-run configs from the templates shipped with a Kafka distribution
#[derive(Debug, Clone)]
pub struct PropertiesMaterializer {
    distribution: KafkaDistribution,
}

impl PropertiesMaterializer {
    pub fn new(distribution: KafkaDistribution) -> Self {
        Self { distribution }
    }
}

#[async_trait]
impl ConfigMaterializer for PropertiesMaterializer {
    async fn materialize(
        &self,
        kind: ServiceKind,
        dir: &Path,
        overrides: &[(String, String)],
    ) -> Result<PathBuf, DomainError> {
        let template = self.distribution.template_path(kind);
        let text = tokio::fs::read_to_string(&template)
            .await
            .map_err(|e| DomainError::io(format!("reading {}", template.display()), e))?;

        let mut properties = PropertiesFile::parse(&text);
        for (key, value) in overrides {
            properties.set(key, value);
        }

        let target = dir.join(KafkaDistribution::config_file_name(kind));
        tokio::fs::write(&target, properties.render())
            .await
            .map_err(|e| DomainError::io(format!("writing {}", target.display()), e))?;

        debug!(service = %kind, config = %target.display(), "Wrote service config");
        Ok(dir.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::Platform;

    const TEMPLATE: &str = "\
# The directory where the snapshot is stored.
dataDir=/tmp/zookeeper
# the port at which the clients will connect
clientPort = 2181

maxClientCnxns: 0
";

    #[test]
    fn test_set_replaces_in_place_and_keeps_comments() {
        let mut props = PropertiesFile::parse(TEMPLATE);
        props.set("clientPort", "18000");
        props.set("dataDir", "/tmp/zookeeper-abc");

        assert_eq!(
            props.render(),
            "\
# The directory where the snapshot is stored.
dataDir=/tmp/zookeeper-abc
# the port at which the clients will connect
clientPort=18000

maxClientCnxns=0
"
        );
    }

    #[test]
    fn test_missing_key_is_appended() {
        let mut props = PropertiesFile::parse(TEMPLATE);
        props.set("zookeeper.log.dir", "/tmp/zookeeper-abc");

        assert!(props.render().ends_with("maxClientCnxns=0\nzookeeper.log.dir=/tmp/zookeeper-abc\n"));
        assert_eq!(props.get("maxClientCnxns"), Some("0"));
    }

    #[test]
    fn test_backslashes_are_escaped() {
        let mut props = PropertiesFile::default();
        props.set("log.dirs", r"C:\Temp\kafka-abc");
        assert_eq!(props.get("log.dirs"), Some(r"C:\\Temp\\kafka-abc"));
    }

    #[tokio::test]
    async fn test_materialize_writes_config_into_dir() {
        let home = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(home.path().join("config")).unwrap();
        std::fs::write(home.path().join("config/server.properties"), "broker.id=0\nport=9092\n").unwrap();
        let scratch = tempfile::tempdir().unwrap();

        let materializer =
            PropertiesMaterializer::new(KafkaDistribution::new(home.path(), Platform::Unix));
        let overrides = vec![
            ("port".to_string(), "18001".to_string()),
            ("zookeeper.connect".to_string(), "127.0.0.1:18000".to_string()),
        ];
        let dir = materializer
            .materialize(ServiceKind::Broker, scratch.path(), &overrides)
            .await
            .unwrap();

        assert_eq!(dir, scratch.path());
        let written = std::fs::read_to_string(scratch.path().join("server.properties")).unwrap();
        assert_eq!(written, "broker.id=0\nport=18001\nzookeeper.connect=127.0.0.1:18000\n");
    }

    #[tokio::test]
    async fn test_missing_template_is_io_error() {
        let scratch = tempfile::tempdir().unwrap();
        let materializer = PropertiesMaterializer::new(KafkaDistribution::new(
            scratch.path().join("no-kafka-here"),
            Platform::Unix,
        ));

        let err = materializer
            .materialize(ServiceKind::Coordination, scratch.path(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Io(ref msg) if msg.contains("zookeeper.properties")));
    }
}
