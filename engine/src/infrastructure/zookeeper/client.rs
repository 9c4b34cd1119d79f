//! Minimal ZooKeeper session over tokio TCP
//!
//! Handshake, `exists`, `getChildren` and `close`. No watches, no
//! reconnects, one request in flight at a time.

use super::codec::{
    self, code, op, xid, ConnectRequest, ConnectResponse, Decoder, ReplyHeader, Request, Stat,
};
use crate::constants::probe::ATTEMPT_TIMEOUT;
use crate::domain::ports::{CoordinationClient, CoordinationConnector};
use crate::domain::ProbeError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::debug;

/// Opens [`ZooKeeperClient`] sessions against `127.0.0.1`.
#[derive(Debug, Clone, Copy)]
pub struct ZooKeeperConnector {
    session_timeout: Duration,
}

impl ZooKeeperConnector {
    pub fn new(session_timeout: Duration) -> Self {
        Self { session_timeout }
    }
}

impl Default for ZooKeeperConnector {
    fn default() -> Self {
        Self::new(ATTEMPT_TIMEOUT)
    }
}

#[async_trait]
impl CoordinationConnector for ZooKeeperConnector {
    async fn connect(&self, port: u16) -> Result<Box<dyn CoordinationClient>, ProbeError> {
        let client = ZooKeeperClient::connect(port, self.session_timeout).await?;
        Ok(Box::new(client))
    }
}

pub struct ZooKeeperClient {
    stream: TcpStream,
    session_id: i64,
    next_xid: i32,
    closed: bool,
}

impl ZooKeeperClient {
    pub async fn connect(port: u16, session_timeout: Duration) -> Result<Self, ProbeError> {
        let mut stream = TcpStream::connect(("127.0.0.1", port))
            .await
            .map_err(|e| ProbeError::Connection(e.to_string()))?;

        codec::write_frame(&mut stream, &ConnectRequest::new(session_timeout).encode()).await?;
        let response = ConnectResponse::decode(&codec::read_frame(&mut stream).await?)?;
        if response.timeout_ms <= 0 {
            return Err(ProbeError::Connection(
                "zookeeper refused the session".to_string(),
            ));
        }

        debug!(
            port = port,
            session_id = format!("{:#x}", response.session_id),
            negotiated_timeout_ms = response.timeout_ms,
            "ZooKeeper session established"
        );
        Ok(Self {
            stream,
            session_id: response.session_id,
            next_xid: 1,
            closed: false,
        })
    }

    pub fn session_id(&self) -> i64 {
        self.session_id
    }

    /// Send one request and return its reply header and body.
    async fn call(&mut self, op: i32, path: Option<&str>) -> Result<(ReplyHeader, Vec<u8>), ProbeError> {
        let request = Request {
            xid: self.next_xid,
            op,
            path: path.map(str::to_string),
        };
        self.next_xid = self.next_xid.wrapping_add(1);
        codec::write_frame(&mut self.stream, &request.encode()).await?;

        loop {
            let frame = codec::read_frame(&mut self.stream).await?;
            let mut d = Decoder::new(&frame);
            let header = ReplyHeader::decode(&mut d)?;
            if header.xid == xid::PING || header.xid == xid::WATCH_EVENT {
                continue;
            }
            if header.xid != request.xid {
                return Err(ProbeError::Protocol(format!(
                    "reply for xid {} while waiting for {}",
                    header.xid, request.xid
                )));
            }
            let body = frame[frame.len() - d.remaining()..].to_vec();
            return Ok((header, body));
        }
    }
}

#[async_trait]
impl CoordinationClient for ZooKeeperClient {
    async fn exists(&mut self, path: &str) -> Result<bool, ProbeError> {
        let (header, body) = self.call(op::EXISTS, Some(path)).await?;
        match header.err {
            code::OK => {
                Stat::decode(&mut Decoder::new(&body))?;
                Ok(true)
            }
            code::NO_NODE => Ok(false),
            err => Err(ProbeError::Coordination {
                path: path.to_string(),
                code: err,
            }),
        }
    }

    async fn children(&mut self, path: &str) -> Result<Vec<String>, ProbeError> {
        let (header, body) = self.call(op::GET_CHILDREN, Some(path)).await?;
        match header.err {
            code::OK => Decoder::new(&body).strings(),
            code::NO_NODE => Err(ProbeError::MissingPath(path.to_string())),
            err => Err(ProbeError::Coordination {
                path: path.to_string(),
                code: err,
            }),
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.call(op::CLOSE, None).await {
            debug!(error = %e, "Close request failed");
        }
        let _ = self.stream.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeZooKeeper;

    #[tokio::test]
    async fn test_lookups_against_fake_server() {
        let server = FakeZooKeeper::start()
            .await
            .unwrap()
            .with_node("/brokers")
            .with_node("/brokers/ids/0");

        let mut client = ZooKeeperClient::connect(server.port(), Duration::from_secs(1))
            .await
            .unwrap();

        assert!(client.exists("/brokers").await.unwrap());
        assert!(client.exists("/brokers/ids").await.unwrap());
        assert!(!client.exists("/controller").await.unwrap());
        assert_eq!(client.children("/brokers/ids").await.unwrap(), vec!["0"]);
        assert_eq!(
            client.children("/missing").await.unwrap_err(),
            ProbeError::MissingPath("/missing".to_string())
        );

        client.close().await;
        client.close().await;
        assert_eq!(server.closed_sessions(), 1);
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let err = ZooKeeperConnector::default().connect(port).await.err().unwrap();
        assert!(matches!(err, ProbeError::Connection(_)));
    }
}
