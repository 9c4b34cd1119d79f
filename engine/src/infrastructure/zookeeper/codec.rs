//! Jute wire encoding for the handful of ZooKeeper records the probe uses
//!
//! Every message on the wire is a 4-byte big-endian length followed by the
//! record. Integers are big-endian, strings and buffers are length-prefixed
//! (`-1` encodes null), booleans are a single byte.

use crate::domain::ProbeError;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single frame; the probe never needs more.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Request type codes
pub mod op {
    pub const EXISTS: i32 = 3;
    pub const GET_CHILDREN: i32 = 8;
    pub const CLOSE: i32 = -11;
}

/// Reply error codes
pub mod code {
    pub const OK: i32 = 0;
    pub const NO_NODE: i32 = -101;
}

/// Reserved xids the server uses for unsolicited frames
pub mod xid {
    pub const WATCH_EVENT: i32 = -1;
    pub const PING: i32 = -2;
}

/// Length of the session password the handshake carries
pub const PASSWORD_LEN: usize = 16;

#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn i32(mut self, value: i32) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn i64(mut self, value: i64) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn bool(mut self, value: bool) -> Self {
        self.buf.push(u8::from(value));
        self
    }

    pub fn buffer(self, bytes: &[u8]) -> Self {
        let mut this = self.i32(bytes.len() as i32);
        this.buf.extend_from_slice(bytes);
        this
    }

    pub fn string(self, value: &str) -> Self {
        self.buffer(value.as_bytes())
    }

    pub fn strings(self, values: &[String]) -> Self {
        values
            .iter()
            .fold(self.i32(values.len() as i32), |enc, v| enc.string(v))
    }

    /// The record with its length prefix.
    pub fn into_frame(self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(4 + self.buf.len());
        frame.extend_from_slice(&(self.buf.len() as i32).to_be_bytes());
        frame.extend_from_slice(&self.buf);
        frame
    }
}

pub struct Decoder<'a> {
    buf: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ProbeError> {
        if self.buf.len() < len {
            return Err(ProbeError::Protocol(format!(
                "record truncated: wanted {len} bytes, {} left",
                self.buf.len()
            )));
        }
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    pub fn i32(&mut self) -> Result<i32, ProbeError> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(i32::from_be_bytes(raw))
    }

    pub fn i64(&mut self) -> Result<i64, ProbeError> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(i64::from_be_bytes(raw))
    }

    pub fn bool(&mut self) -> Result<bool, ProbeError> {
        Ok(self.take(1)?[0] != 0)
    }

    /// A length-prefixed buffer; null decodes as empty.
    pub fn buffer(&mut self) -> Result<&'a [u8], ProbeError> {
        let len = self.i32()?;
        if len < 0 {
            return Ok(&[]);
        }
        self.take(len as usize)
    }

    pub fn string(&mut self) -> Result<String, ProbeError> {
        let raw = self.buffer()?;
        String::from_utf8(raw.to_vec())
            .map_err(|_| ProbeError::Protocol("string is not valid UTF-8".to_string()))
    }

    /// A vector of strings; null decodes as empty.
    pub fn strings(&mut self) -> Result<Vec<String>, ProbeError> {
        let count = self.i32()?;
        if count < 0 {
            return Ok(Vec::new());
        }
        (0..count).map(|_| self.string()).collect()
    }
}

/// Session handshake sent by a fresh client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub protocol_version: i32,
    pub last_zxid_seen: i64,
    pub timeout_ms: i32,
    pub session_id: i64,
    pub read_only: bool,
}

impl ConnectRequest {
    pub fn new(session_timeout: Duration) -> Self {
        Self {
            protocol_version: 0,
            last_zxid_seen: 0,
            timeout_ms: i32::try_from(session_timeout.as_millis()).unwrap_or(i32::MAX),
            session_id: 0,
            read_only: false,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        Encoder::new()
            .i32(self.protocol_version)
            .i64(self.last_zxid_seen)
            .i32(self.timeout_ms)
            .i64(self.session_id)
            .buffer(&[0u8; PASSWORD_LEN])
            .bool(self.read_only)
            .into_frame()
    }

    pub fn decode(record: &[u8]) -> Result<Self, ProbeError> {
        let mut d = Decoder::new(record);
        let protocol_version = d.i32()?;
        let last_zxid_seen = d.i64()?;
        let timeout_ms = d.i32()?;
        let session_id = d.i64()?;
        d.buffer()?;
        // Pre-3.4 clients stop before the read-only flag.
        let read_only = if d.remaining() > 0 { d.bool()? } else { false };
        Ok(Self {
            protocol_version,
            last_zxid_seen,
            timeout_ms,
            session_id,
            read_only,
        })
    }
}

/// Server answer to [`ConnectRequest`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectResponse {
    pub protocol_version: i32,
    /// Negotiated session timeout; zero or less means the session was refused.
    pub timeout_ms: i32,
    pub session_id: i64,
}

impl ConnectResponse {
    pub fn encode(&self) -> Vec<u8> {
        Encoder::new()
            .i32(self.protocol_version)
            .i32(self.timeout_ms)
            .i64(self.session_id)
            .buffer(&[0u8; PASSWORD_LEN])
            .bool(false)
            .into_frame()
    }

    pub fn decode(record: &[u8]) -> Result<Self, ProbeError> {
        let mut d = Decoder::new(record);
        let protocol_version = d.i32()?;
        let timeout_ms = d.i32()?;
        let session_id = d.i64()?;
        d.buffer()?;
        Ok(Self {
            protocol_version,
            timeout_ms,
            session_id,
        })
    }
}

/// A request for one path: `exists`, `getChildren`, or a bodiless `close`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub xid: i32,
    pub op: i32,
    pub path: Option<String>,
}

impl Request {
    pub fn encode(&self) -> Vec<u8> {
        let enc = Encoder::new().i32(self.xid).i32(self.op);
        match &self.path {
            Some(path) => enc.string(path).bool(false).into_frame(),
            None => enc.into_frame(),
        }
    }

    pub fn decode(record: &[u8]) -> Result<Self, ProbeError> {
        let mut d = Decoder::new(record);
        let xid = d.i32()?;
        let op = d.i32()?;
        let path = if d.remaining() > 0 {
            Some(d.string()?)
        } else {
            None
        };
        Ok(Self { xid, op, path })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyHeader {
    pub xid: i32,
    pub zxid: i64,
    pub err: i32,
}

impl ReplyHeader {
    pub fn decode(d: &mut Decoder<'_>) -> Result<Self, ProbeError> {
        Ok(Self {
            xid: d.i32()?,
            zxid: d.i64()?,
            err: d.i32()?,
        })
    }

    pub fn encoder(&self) -> Encoder {
        Encoder::new().i32(self.xid).i64(self.zxid).i32(self.err)
    }
}

/// Node metadata returned by `exists`. The probe only needs to skip it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stat {
    pub czxid: i64,
    pub mzxid: i64,
    pub ctime: i64,
    pub mtime: i64,
    pub version: i32,
    pub cversion: i32,
    pub aversion: i32,
    pub ephemeral_owner: i64,
    pub data_length: i32,
    pub num_children: i32,
    pub pzxid: i64,
}

impl Stat {
    pub fn encode_into(&self, enc: Encoder) -> Encoder {
        enc.i64(self.czxid)
            .i64(self.mzxid)
            .i64(self.ctime)
            .i64(self.mtime)
            .i32(self.version)
            .i32(self.cversion)
            .i32(self.aversion)
            .i64(self.ephemeral_owner)
            .i32(self.data_length)
            .i32(self.num_children)
            .i64(self.pzxid)
    }

    pub fn decode(d: &mut Decoder<'_>) -> Result<Self, ProbeError> {
        Ok(Self {
            czxid: d.i64()?,
            mzxid: d.i64()?,
            ctime: d.i64()?,
            mtime: d.i64()?,
            version: d.i32()?,
            cversion: d.i32()?,
            aversion: d.i32()?,
            ephemeral_owner: d.i64()?,
            data_length: d.i32()?,
            num_children: d.i32()?,
            pzxid: d.i64()?,
        })
    }
}

/// Read one length-prefixed record.
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, ProbeError>
where
    R: AsyncRead + Unpin,
{
    let len = reader
        .read_i32()
        .await
        .map_err(|e| ProbeError::Connection(e.to_string()))?;
    let len = usize::try_from(len)
        .map_err(|_| ProbeError::Protocol(format!("negative frame length {len}")))?;
    if len > MAX_FRAME_LEN {
        return Err(ProbeError::Protocol(format!("frame of {len} bytes is too large")));
    }
    let mut record = vec![0u8; len];
    reader
        .read_exact(&mut record)
        .await
        .map_err(|e| ProbeError::Connection(e.to_string()))?;
    Ok(record)
}

pub async fn write_frame<W>(writer: &mut W, frame: &[u8]) -> Result<(), ProbeError>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(frame)
        .await
        .map_err(|e| ProbeError::Connection(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_request_layout() {
        let frame = ConnectRequest::new(Duration::from_millis(1_000)).encode();

        // 4 + 8 + 4 + 8 + (4 + 16) + 1 bytes of record
        assert_eq!(&frame[..4], &45i32.to_be_bytes());
        assert_eq!(frame.len(), 49);
        assert_eq!(&frame[16..20], &1_000i32.to_be_bytes());
        assert_eq!(*frame.last().unwrap(), 0);
    }

    #[test]
    fn test_exists_request_layout() {
        let frame = Request {
            xid: 1,
            op: op::EXISTS,
            path: Some("/brokers".to_string()),
        }
        .encode();

        let mut expected = Vec::new();
        expected.extend_from_slice(&21i32.to_be_bytes());
        expected.extend_from_slice(&1i32.to_be_bytes());
        expected.extend_from_slice(&3i32.to_be_bytes());
        expected.extend_from_slice(&8i32.to_be_bytes());
        expected.extend_from_slice(b"/brokers");
        expected.push(0);
        assert_eq!(frame, expected);
    }

    #[test]
    fn test_close_request_has_no_body() {
        let frame = Request {
            xid: 7,
            op: op::CLOSE,
            path: None,
        }
        .encode();
        assert_eq!(frame.len(), 12);
        assert_eq!(&frame[8..], &(-11i32).to_be_bytes());
    }

    #[test]
    fn test_stat_is_68_bytes() {
        let record = Stat::default().encode_into(Encoder::new()).into_frame();
        assert_eq!(record.len(), 4 + 68);
    }

    #[test]
    fn test_children_reply_decodes() {
        let header = ReplyHeader {
            xid: 3,
            zxid: 42,
            err: code::OK,
        };
        let frame = header
            .encoder()
            .strings(&["0".to_string(), "1".to_string()])
            .into_frame();

        let mut d = Decoder::new(&frame[4..]);
        assert_eq!(ReplyHeader::decode(&mut d).unwrap(), header);
        assert_eq!(d.strings().unwrap(), vec!["0", "1"]);
        assert_eq!(d.remaining(), 0);
    }

    #[test]
    fn test_null_vector_is_empty() {
        let record = Encoder::new().i32(-1).into_frame();
        assert!(Decoder::new(&record[4..]).strings().unwrap().is_empty());
    }

    #[test]
    fn test_truncated_record_is_protocol_error() {
        let err = Decoder::new(&[0, 0, 0]).i32().unwrap_err();
        assert!(matches!(err, ProbeError::Protocol(_)));
    }

    #[test]
    fn test_legacy_connect_request_without_read_only_flag() {
        let record = Encoder::new()
            .i32(0)
            .i64(0)
            .i32(30_000)
            .i64(0)
            .buffer(&[0u8; PASSWORD_LEN])
            .into_frame();
        let request = ConnectRequest::decode(&record[4..]).unwrap();
        assert_eq!(request.timeout_ms, 30_000);
        assert!(!request.read_only);
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let mut raw: &[u8] = &(MAX_FRAME_LEN as i32 + 1).to_be_bytes();
        let err = read_frame(&mut raw).await.unwrap_err();
        assert!(matches!(err, ProbeError::Protocol(_)));
    }
}
