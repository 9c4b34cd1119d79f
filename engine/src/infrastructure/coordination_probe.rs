//! Coordination-service probe
//! ZooKeeper `ruok` four-letter-word check over a raw TCP socket

use crate::constants::probe::{ATTEMPT_TIMEOUT, IMOK, RUOK};
use crate::domain::ports::ReadinessProbe;
use crate::domain::{ProbeError, ServiceKind};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

/// Read buffer size; ZooKeeper answers with four bytes.
const MAX_REPLY: usize = 64;

pub struct CoordinationProbe {
    port: u16,
    timeout: Duration,
}

impl CoordinationProbe {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            timeout: ATTEMPT_TIMEOUT,
        }
    }

    /// Connect + reply budget of one attempt.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

#[async_trait]
impl ReadinessProbe for CoordinationProbe {
    fn service(&self) -> ServiceKind {
        ServiceKind::Coordination
    }

    async fn check(&self, elapsed: Duration) -> Result<(), ProbeError> {
        debug!(
            port = self.port,
            elapsed_ms = elapsed.as_millis() as u64,
            "Checking zookeeper"
        );
        // The stream is dropped on every path out of `ruok`, timeout included.
        match tokio::time::timeout(self.timeout, ruok(self.port)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout),
        }
    }
}

async fn ruok(port: u16) -> Result<(), ProbeError> {
    let mut stream = TcpStream::connect(("127.0.0.1", port))
        .await
        .map_err(|e| ProbeError::Connection(e.to_string()))?;

    stream
        .write_all(RUOK)
        .await
        .map_err(|e| ProbeError::Connection(e.to_string()))?;

    // Done at the first full answer; the server may keep the socket open.
    let mut reply = Vec::with_capacity(IMOK.len());
    let mut chunk = [0u8; MAX_REPLY];
    while reply.len() < IMOK.len() {
        let n = stream
            .read(&mut chunk)
            .await
            .map_err(|e| ProbeError::Connection(e.to_string()))?;
        if n == 0 {
            break;
        }
        reply.extend_from_slice(&chunk[..n]);
    }

    let reply = String::from_utf8_lossy(&reply);
    if reply == IMOK {
        Ok(())
    } else {
        Err(ProbeError::UnexpectedResponse(reply.into_owned()))
    }
}
