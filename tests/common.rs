//! Shared utilities for the end-to-end tests
//!
//! ## Fake Kafka distribution
//!
//! [`FakeKafkaHome`] lays out `bin/` and `config/` the way a real Kafka
//! download does, but its scripts are tiny shell stand-ins:
//!
//! - `bin/kafka-run-class.sh` appends `<main class> <config file>` to
//!   `launches.log` and then `exec`s a long `sleep`, so the launched
//!   process is the one that gets killed.
//! - `bin/{zookeeper,kafka}-server-stop.sh` append `zookeeper` / `kafka`
//!   to `stops.log`, which makes the shutdown order observable.
//!
//! Readiness is served by an in-process `FakeZooKeeper`, so no JVM is
//! needed.

#![cfg(unix)]

use kafka_please::domain::services::ClusterDependencies;
use kafka_please::infrastructure::{
    KafkaDistribution, Platform, PropertiesMaterializer, StandardProbeFactory, TempDirFactory,
    TokioProcessLauncher,
};
use kafka_please::test_support::QueuedPortAllocator;
use kafka_please::{ClusterOrchestrator, ClusterSettings, PortRegistry};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const ZOOKEEPER_TEMPLATE: &str = "\
# the directory where the snapshot is stored.
dataDir=/tmp/zookeeper
# the port at which the clients will connect
clientPort=2181
maxClientCnxns=0
";

pub const SERVER_TEMPLATE: &str = "\
broker.id=0
# A comma separated list of directories under which to store log files
log.dirs=/tmp/kafka-logs
zookeeper.connect=localhost:2181
";

pub struct FakeKafkaHome {
    dir: TempDir,
}

impl FakeKafkaHome {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create kafka home");
        let home = dir.path();
        fs::create_dir_all(home.join("bin")).unwrap();
        fs::create_dir_all(home.join("config")).unwrap();

        fs::write(home.join("config/zookeeper.properties"), ZOOKEEPER_TEMPLATE).unwrap();
        fs::write(home.join("config/server.properties"), SERVER_TEMPLATE).unwrap();

        let launches = home.join("launches.log");
        let stops = home.join("stops.log");
        write_script(
            &home.join("bin/kafka-run-class.sh"),
            &format!(
                "#!/usr/bin/env bash\necho \"$1 $2\" >> '{}'\nexec sleep 300\n",
                launches.display()
            ),
        );
        for (script, name) in [
            ("zookeeper-server-stop.sh", "zookeeper"),
            ("kafka-server-stop.sh", "kafka"),
        ] {
            write_script(
                &home.join("bin").join(script),
                &format!("#!/bin/sh\necho {name} >> '{}'\n", stops.display()),
            );
        }

        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn distribution(&self) -> KafkaDistribution {
        KafkaDistribution::new(self.path(), Platform::Unix)
    }

    /// `(main class, config file)` of every launch, in order.
    pub fn launches(&self) -> Vec<(String, PathBuf)> {
        read_lines(&self.path().join("launches.log"))
            .into_iter()
            .filter_map(|line| {
                let (main, config) = line.split_once(' ')?;
                Some((main.to_string(), PathBuf::from(config)))
            })
            .collect()
    }

    /// Names of the stop scripts that ran, in order.
    pub fn stops(&self) -> Vec<String> {
        read_lines(&self.path().join("stops.log"))
    }
}

impl Default for FakeKafkaHome {
    fn default() -> Self {
        Self::new()
    }
}

fn write_script(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .map(|text| text.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Fast timings so failure paths finish in well under a second.
pub fn fast_settings() -> ClusterSettings {
    ClusterSettings {
        startup_timeout: Duration::from_millis(600),
        retry_delay: Duration::from_millis(100),
        broker_grace_delay: Duration::from_millis(50),
    }
}

/// A port nothing is listening on right now.
pub fn unused_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Real launcher, probes and materializer; ports handed out in `ports` order.
pub fn orchestrator(home: &FakeKafkaHome, ports: Vec<u16>, settings: ClusterSettings) -> ClusterOrchestrator {
    let distribution = home.distribution();
    let deps = ClusterDependencies {
        launcher: Arc::new(TokioProcessLauncher::new()),
        layout: Arc::new(distribution.clone()),
        ports: Arc::new(QueuedPortAllocator::new(ports)),
        registry: Arc::new(PortRegistry::new()),
        materializer: Arc::new(PropertiesMaterializer::new(distribution)),
        temp_dirs: Arc::new(TempDirFactory::new()),
        probes: Arc::new(StandardProbeFactory::new(Duration::from_millis(200))),
    };
    ClusterOrchestrator::new(deps, settings)
}

/// True once `pid` no longer names a live process.
pub fn process_gone(pid: u32) -> bool {
    let pid = nix::unistd::Pid::from_raw(pid as i32);
    matches!(nix::sys::signal::kill(pid, None), Err(nix::errno::Errno::ESRCH))
}

/// Poll `launches.log` until `count` launches are recorded.
pub async fn wait_for_launches(home: &FakeKafkaHome, count: usize) -> Vec<(String, PathBuf)> {
    for _ in 0..100 {
        let launches = home.launches();
        if launches.len() >= count {
            return launches;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("expected {count} launches, saw {:?}", home.launches());
}
