//! Test doubles for the domain ports
//!
//! Compiled for unit tests and behind the `test-helpers` feature for the
//! end-to-end crate.

use crate::constants::probe::{IMOK, RUOK};
use crate::domain::ports::{
    ConfigMaterializer, PortAllocator, ProbeFactory, ProcessHandle, ProcessLauncher,
    ProcessStatus, ReadinessProbe, ScratchDir, TempDirProvider,
};
use crate::domain::{DomainError, ProbeError, ServiceKind, ServiceSpec};
use crate::infrastructure::zookeeper::codec::{
    self, code, op, ConnectRequest, ConnectResponse, ReplyHeader, Request, Stat,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Ordered record of what the fakes were asked to do
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        lock(&self.0).push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        lock(&self.0).clone()
    }

    pub fn clear(&self) {
        lock(&self.0).clear();
    }
}

// ============================================================================
// Process launcher
// ============================================================================

/// Launcher that spawns nothing and logs every call.
///
/// Events: `launch:<name>`, `launch-failed:<name>`, `kill:<name>`,
/// `kill-failed:<name>`, `wait:<name>`. Killed processes exit with `-1`,
/// waited-for processes with `0`.
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    log: EventLog,
    next_pid: AtomicU32,
    fail_launch: BTreeSet<String>,
    fail_kill: BTreeSet<String>,
    statuses: Arc<Mutex<BTreeMap<u32, ProcessStatus>>>,
    ports: Mutex<Vec<u16>>,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::with_log(EventLog::new())
    }

    pub fn with_log(log: EventLog) -> Self {
        Self {
            log,
            next_pid: AtomicU32::new(1000),
            ..Self::default()
        }
    }

    pub fn fail_launch_of(mut self, name: &str) -> Self {
        self.fail_launch.insert(name.to_string());
        self
    }

    pub fn fail_kill_of(mut self, name: &str) -> Self {
        self.fail_kill.insert(name.to_string());
        self
    }

    pub fn log(&self) -> EventLog {
        self.log.clone()
    }

    pub fn events(&self) -> Vec<String> {
        self.log.events()
    }

    pub fn status_of(&self, pid: u32) -> Option<ProcessStatus> {
        lock(&self.statuses).get(&pid).copied()
    }

    /// Ports of every launched spec that carried one, in launch order.
    pub fn launched_ports(&self) -> Vec<u16> {
        lock(&self.ports).clone()
    }
}

#[async_trait]
impl ProcessLauncher for RecordingLauncher {
    async fn launch(&self, spec: &ServiceSpec) -> Result<Box<dyn ProcessHandle>, DomainError> {
        let name = spec.name().to_string();
        if self.fail_launch.contains(&name) {
            self.log.push(format!("launch-failed:{name}"));
            return Err(DomainError::Spawn {
                command: spec.command().to_string(),
                reason: "No such file or directory".to_string(),
            });
        }

        self.log.push(format!("launch:{name}"));
        if let Some(port) = spec.port() {
            lock(&self.ports).push(port);
        }
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        lock(&self.statuses).insert(pid, ProcessStatus::Running);

        Ok(Box::new(RecordedProcess {
            fail_kill: self.fail_kill.contains(&name),
            name,
            pid,
            log: self.log.clone(),
            statuses: self.statuses.clone(),
        }))
    }
}

struct RecordedProcess {
    name: String,
    pid: u32,
    fail_kill: bool,
    log: EventLog,
    statuses: Arc<Mutex<BTreeMap<u32, ProcessStatus>>>,
}

impl RecordedProcess {
    fn exit(&self, code: i32) {
        lock(&self.statuses).insert(self.pid, ProcessStatus::Exited(code));
    }
}

#[async_trait]
impl ProcessHandle for RecordedProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> ProcessStatus {
        lock(&self.statuses)
            .get(&self.pid)
            .copied()
            .unwrap_or(ProcessStatus::Running)
    }

    async fn kill(&self) -> Result<i32, DomainError> {
        if self.fail_kill {
            self.log.push(format!("kill-failed:{}", self.name));
            return Err(DomainError::Io("Operation not permitted".to_string()));
        }
        self.log.push(format!("kill:{}", self.name));
        self.exit(-1);
        Ok(-1)
    }

    async fn wait(&self) -> Result<i32, DomainError> {
        self.log.push(format!("wait:{}", self.name));
        self.exit(0);
        Ok(0)
    }
}

// ============================================================================
// Cluster resources
// ============================================================================

/// Hands out a fixed sequence of ports, then fails.
#[derive(Debug, Default)]
pub struct QueuedPortAllocator {
    ports: Mutex<VecDeque<u16>>,
}

impl QueuedPortAllocator {
    pub fn new(ports: impl IntoIterator<Item = u16>) -> Self {
        Self {
            ports: Mutex::new(ports.into_iter().collect()),
        }
    }
}

#[async_trait]
impl PortAllocator for QueuedPortAllocator {
    async fn find_port(&self) -> Result<u16, DomainError> {
        lock(&self.ports)
            .pop_front()
            .ok_or_else(|| DomainError::PortAllocation("port queue is empty".to_string()))
    }
}

pub type MaterializeRequest = (ServiceKind, PathBuf, Vec<(String, String)>);

/// Records config requests without touching the filesystem.
#[derive(Debug, Default)]
pub struct RecordingMaterializer {
    requests: Mutex<Vec<MaterializeRequest>>,
}

impl RecordingMaterializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<MaterializeRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl ConfigMaterializer for RecordingMaterializer {
    async fn materialize(
        &self,
        kind: ServiceKind,
        dir: &Path,
        overrides: &[(String, String)],
    ) -> Result<PathBuf, DomainError> {
        lock(&self.requests).push((kind, dir.to_path_buf(), overrides.to_vec()));
        Ok(dir.to_path_buf())
    }
}

/// Names `<root>/<prefix><n>` without creating anything.
#[derive(Debug)]
pub struct FixedTempDirs {
    root: PathBuf,
    counter: AtomicUsize,
}

impl FixedTempDirs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            counter: AtomicUsize::new(0),
        }
    }
}

impl TempDirProvider for FixedTempDirs {
    fn create(&self, prefix: &str) -> Result<Box<dyn ScratchDir>, DomainError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FixedDir(self.root.join(format!("{prefix}{n}")))))
    }
}

/// Path-only scratch dir; nothing to remove.
#[derive(Debug)]
struct FixedDir(PathBuf);

impl ScratchDir for FixedDir {
    fn path(&self) -> &Path {
        &self.0
    }
}

// ============================================================================
// Probes
// ============================================================================

/// Fails a fixed number of times, then succeeds.
///
/// With a log attached, every attempt is recorded as
/// `probe:<service>:<port>:ok|fail`.
pub struct ScriptedProbe {
    kind: ServiceKind,
    port: u16,
    failures_left: AtomicU32,
    log: Option<EventLog>,
}

impl ScriptedProbe {
    /// `u32::MAX` failures means the probe never succeeds.
    pub fn new(kind: ServiceKind, port: u16, failures: u32) -> Self {
        Self {
            kind,
            port,
            failures_left: AtomicU32::new(failures),
            log: None,
        }
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    fn record(&self, outcome: &str) {
        if let Some(log) = &self.log {
            log.push(format!("probe:{}:{}:{outcome}", self.kind, self.port));
        }
    }
}

#[async_trait]
impl ReadinessProbe for ScriptedProbe {
    fn service(&self) -> ServiceKind {
        self.kind
    }

    async fn check(&self, _elapsed: Duration) -> Result<(), ProbeError> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                0 => None,
                u32::MAX => Some(u32::MAX),
                n => Some(n - 1),
            })
            .is_ok();

        if failing {
            self.record("fail");
            Err(ProbeError::Connection("connection refused".to_string()))
        } else {
            self.record("ok");
            Ok(())
        }
    }
}

/// Builds [`ScriptedProbe`]s with fixed failure counts per service.
#[derive(Debug, Default)]
pub struct ScriptedProbeFactory {
    coordination_failures: u32,
    broker_failures: u32,
    log: Option<EventLog>,
}

impl ScriptedProbeFactory {
    pub fn new(coordination_failures: u32, broker_failures: u32) -> Self {
        Self {
            coordination_failures,
            broker_failures,
            log: None,
        }
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    fn probe(&self, kind: ServiceKind, port: u16, failures: u32) -> Box<dyn ReadinessProbe> {
        let probe = ScriptedProbe::new(kind, port, failures);
        match &self.log {
            Some(log) => Box::new(probe.with_log(log.clone())),
            None => Box::new(probe),
        }
    }
}

impl ProbeFactory for ScriptedProbeFactory {
    fn coordination_probe(&self, port: u16) -> Box<dyn ReadinessProbe> {
        self.probe(ServiceKind::Coordination, port, self.coordination_failures)
    }

    fn broker_probe(&self, coordination_port: u16) -> Box<dyn ReadinessProbe> {
        self.probe(ServiceKind::Broker, coordination_port, self.broker_failures)
    }
}

// ============================================================================
// Fake ZooKeeper
// ============================================================================

#[derive(Debug)]
struct FakeState {
    nodes: BTreeSet<String>,
    ruok_reply: Option<Vec<u8>>,
    ruok_requests: usize,
    sessions: usize,
    closed_sessions: usize,
    zxid: i64,
}

impl FakeState {
    fn add(&mut self, path: &str) {
        let mut prefix = String::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            prefix.push('/');
            prefix.push_str(segment);
            self.nodes.insert(prefix.clone());
        }
    }

    fn exists(&self, path: &str) -> bool {
        path == "/" || self.nodes.contains(path)
    }

    fn children(&self, path: &str) -> Vec<String> {
        let parent = if path == "/" { String::from("/") } else { format!("{path}/") };
        self.nodes
            .iter()
            .filter_map(|node| node.strip_prefix(&parent))
            .filter(|rest| !rest.is_empty() && !rest.contains('/'))
            .map(str::to_string)
            .collect()
    }

    fn reply_to(&mut self, request: &Request) -> Vec<u8> {
        self.zxid += 1;
        let zxid = self.zxid;
        let header = |err| ReplyHeader {
            xid: request.xid,
            zxid,
            err,
        };
        let path = request.path.as_deref().unwrap_or("/");

        match request.op {
            op::EXISTS if self.exists(path) => {
                let stat = Stat {
                    num_children: self.children(path).len() as i32,
                    ..Stat::default()
                };
                stat.encode_into(header(code::OK).encoder()).into_frame()
            }
            op::GET_CHILDREN if self.exists(path) => header(code::OK)
                .encoder()
                .strings(&self.children(path))
                .into_frame(),
            op::EXISTS | op::GET_CHILDREN => header(code::NO_NODE).encoder().into_frame(),
            op::CLOSE => {
                self.closed_sessions += 1;
                header(code::OK).encoder().into_frame()
            }
            // ZUNIMPLEMENTED
            _ => header(-6).encoder().into_frame(),
        }
    }
}

/// In-process stand-in for a ZooKeeper server on `127.0.0.1`.
///
/// Answers the `ruok` four-letter word and the `exists`, `getChildren` and
/// `close` requests of the coordination client. Stops accepting when dropped.
pub struct FakeZooKeeper {
    port: u16,
    state: Arc<Mutex<FakeState>>,
    acceptor: JoinHandle<()>,
}

impl FakeZooKeeper {
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let state = Arc::new(Mutex::new(FakeState {
            nodes: BTreeSet::new(),
            ruok_reply: Some(IMOK.as_bytes().to_vec()),
            ruok_requests: 0,
            sessions: 0,
            closed_sessions: 0,
            zxid: 0,
        }));

        let shared = state.clone();
        let acceptor = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let state = shared.clone();
                tokio::spawn(async move {
                    if let Err(e) = serve(socket, state).await {
                        tracing::debug!(error = %e, "Fake zookeeper connection ended");
                    }
                });
            }
        });

        Ok(Self {
            port,
            state,
            acceptor,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Create `path` and all of its ancestors.
    pub fn with_node(self, path: &str) -> Self {
        self.add_node(path);
        self
    }

    pub fn add_node(&self, path: &str) {
        lock(&self.state).add(path);
    }

    /// Remove `path` and everything below it.
    pub fn remove_node(&self, path: &str) {
        let below = format!("{path}/");
        lock(&self.state)
            .nodes
            .retain(|node| node != path && !node.starts_with(&below));
    }

    /// Answer `ruok` with `reply`, or never answer when `None`.
    pub fn set_ruok_reply(&self, reply: Option<&[u8]>) {
        lock(&self.state).ruok_reply = reply.map(<[u8]>::to_vec);
    }

    pub fn ruok_requests(&self) -> usize {
        lock(&self.state).ruok_requests
    }

    pub fn sessions(&self) -> usize {
        lock(&self.state).sessions
    }

    pub fn closed_sessions(&self) -> usize {
        lock(&self.state).closed_sessions
    }
}

impl Drop for FakeZooKeeper {
    fn drop(&mut self) {
        self.acceptor.abort();
    }
}

fn disconnected(e: std::io::Error) -> ProbeError {
    ProbeError::Connection(e.to_string())
}

async fn serve(mut socket: TcpStream, state: Arc<Mutex<FakeState>>) -> Result<(), ProbeError> {
    let mut head = [0u8; 4];
    socket.read_exact(&mut head).await.map_err(disconnected)?;

    if &head == RUOK {
        let reply = {
            let mut state = lock(&state);
            state.ruok_requests += 1;
            state.ruok_reply.clone()
        };
        match reply {
            Some(reply) => {
                socket.write_all(&reply).await.map_err(disconnected)?;
                socket.shutdown().await.map_err(disconnected)?;
            }
            None => {
                // Hold the connection open until the client gives up.
                let mut sink = Vec::new();
                let _ = socket.read_to_end(&mut sink).await;
            }
        }
        return Ok(());
    }

    let len = usize::try_from(i32::from_be_bytes(head))
        .map_err(|_| ProbeError::Protocol("negative handshake length".to_string()))?;
    if len > codec::MAX_FRAME_LEN {
        return Err(ProbeError::Protocol("handshake too large".to_string()));
    }
    let mut record = vec![0u8; len];
    socket.read_exact(&mut record).await.map_err(disconnected)?;
    let handshake = ConnectRequest::decode(&record)?;

    let session_id = {
        let mut state = lock(&state);
        state.sessions += 1;
        0x1000 + state.sessions as i64
    };
    let response = ConnectResponse {
        protocol_version: 0,
        timeout_ms: handshake.timeout_ms.max(1),
        session_id,
    };
    codec::write_frame(&mut socket, &response.encode()).await?;

    loop {
        let record = match codec::read_frame(&mut socket).await {
            Ok(record) => record,
            // Client hung up without a close request.
            Err(_) => return Ok(()),
        };
        let request = Request::decode(&record)?;
        let reply = lock(&state).reply_to(&request);
        codec::write_frame(&mut socket, &reply).await?;

        if request.op == op::CLOSE {
            let _ = socket.shutdown().await;
            return Ok(());
        }
    }
}
