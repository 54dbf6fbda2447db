//! Framed request/response exchange over TCP.
//!
//! Each [`Channel::send`] writes one length-prefixed ciphertext frame and
//! reads exactly one frame back:
//!
//! ```text
//! client -> device: [len:4][encrypt(json)]
//! device -> client: [len:4][encrypt(json)]
//! ```
//!
//! The response header is read first so the body can be read in full, however
//! many TCP segments it arrives in.  A declared length above
//! `max_response_bytes` is rejected before any body byte is read.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use smartlight_core::protocol::{
    decrypt_framed, encrypt_framed, frame_len, to_wire_json, unwrap, FRAME_HEADER_SIZE,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time,
};
use tracing::{debug, trace};

use super::{Channel, Endpoint, Transport, DEFAULT_DEVICE_PORT};
use crate::error::LinkError;

/// Bound on connect and on the whole write/read exchange.
pub const DEFAULT_TCP_TIMEOUT: Duration = Duration::from_millis(500);

/// Largest response body accepted from a device.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 64 * 1024;

/// A device reachable over TCP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTcp {
    addr: SocketAddr,
    timeout: Duration,
    max_response_bytes: usize,
}

impl LocalTcp {
    /// Targets `ip` on the default device port.
    pub fn new(ip: IpAddr) -> Self {
        Self {
            addr: SocketAddr::new(ip, DEFAULT_DEVICE_PORT),
            timeout: DEFAULT_TCP_TIMEOUT,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.addr.set_port(port);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_response_bytes(mut self, limit: usize) -> Self {
        self.max_response_bytes = limit;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

#[async_trait]
impl Transport for LocalTcp {
    async fn open(&self) -> Result<Box<dyn Channel>, LinkError> {
        let stream = time::timeout(self.timeout, TcpStream::connect(self.addr))
            .await
            .map_err(|_| LinkError::Timeout(self.timeout))?
            .map_err(|e| LinkError::transport(self.addr, e))?;
        debug!("opened TCP channel to {}", self.addr);

        Ok(Box::new(TcpChannel {
            stream,
            addr: self.addr,
            timeout: self.timeout,
            max_response_bytes: self.max_response_bytes,
        }))
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::Tcp(self.addr)
    }
}

/// A connected stream; closed when dropped.
struct TcpChannel {
    stream: TcpStream,
    addr: SocketAddr,
    timeout: Duration,
    max_response_bytes: usize,
}

impl TcpChannel {
    /// Writes one frame and reads one frame back, header included.
    async fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>, LinkError> {
        let addr = self.addr;
        self.stream
            .write_all(request)
            .await
            .map_err(|e| LinkError::transport(addr, e))?;

        let mut header = [0u8; FRAME_HEADER_SIZE];
        self.stream
            .read_exact(&mut header)
            .await
            .map_err(|e| LinkError::transport(addr, e))?;

        let declared = frame_len(header);
        if declared > self.max_response_bytes {
            return Err(LinkError::ResponseTooLarge {
                declared,
                limit: self.max_response_bytes,
            });
        }

        let mut frame = vec![0u8; FRAME_HEADER_SIZE + declared];
        frame[..FRAME_HEADER_SIZE].copy_from_slice(&header);
        self.stream
            .read_exact(&mut frame[FRAME_HEADER_SIZE..])
            .await
            .map_err(|e| LinkError::transport(addr, e))?;
        Ok(frame)
    }
}

#[async_trait]
impl Channel for TcpChannel {
    async fn send(&mut self, request: &Value) -> Result<Option<Value>, LinkError> {
        let text = to_wire_json(request);
        trace!("-> {}: {text}", self.addr);

        let limit = self.timeout;
        let frame = time::timeout(limit, self.exchange(&encrypt_framed(&text)))
            .await
            .map_err(|_| LinkError::Timeout(limit))??;

        let reply = decrypt_framed(&frame)?;
        trace!("<- {}: {reply}", self.addr);
        let envelope: Value = serde_json::from_str(&reply)?;
        Ok(Some(unwrap(envelope)?))
    }
}

impl Drop for TcpChannel {
    fn drop(&mut self) {
        debug!("closing TCP channel to {}", self.addr);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
