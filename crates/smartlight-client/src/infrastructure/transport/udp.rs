//! Datagram transports: unicast [`LocalUdp`] and subnet-wide [`BroadcastUdp`].
//!
//! Datagrams carry the ciphertext without a length prefix.  Sending never
//! waits for an answer; callers that expect one call [`UdpChannel::recv`] with
//! the timeout they are willing to spend.
//!
//! # How broadcast discovery works (for beginners)
//!
//! A datagram sent to `255.255.255.255` is delivered to every host on the
//! local subnet.  The operating system refuses to send such a datagram unless
//! the socket has the `SO_BROADCAST` option set, which is why
//! [`BroadcastUdp`] builds its socket with `socket2` before handing it to
//! Tokio.  Every device that understands the query answers with a unicast
//! datagram to the sender's ephemeral port, so one socket collects all
//! replies.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use smartlight_core::protocol::{decrypt, encrypt, to_wire_json, unwrap};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::{net::UdpSocket, time};
use tracing::{debug, trace};

use super::{Channel, Endpoint, Transport, DEFAULT_DEVICE_PORT};
use crate::error::LinkError;

/// Receive buffer size; one device reply always fits in a single datagram.
pub const DATAGRAM_BUFFER_SIZE: usize = 2048;

/// A device reachable over unicast UDP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalUdp {
    target: SocketAddr,
}

impl LocalUdp {
    pub fn new(ip: IpAddr) -> Self {
        Self {
            target: SocketAddr::new(ip, DEFAULT_DEVICE_PORT),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.target.set_port(port);
        self
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Binds an ephemeral socket aimed at the device.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Transport`] if the socket cannot be bound.
    pub async fn bind(&self) -> Result<UdpChannel, LinkError> {
        let local = SocketAddr::new(unspecified_for(&self.target), 0);
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|e| LinkError::transport(local, e))?;
        debug!("opened UDP channel to {}", self.target);
        Ok(UdpChannel::new(socket, self.target))
    }
}

#[async_trait]
impl Transport for LocalUdp {
    async fn open(&self) -> Result<Box<dyn Channel>, LinkError> {
        Ok(Box::new(self.bind().await?))
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::Udp(self.target)
    }
}

/// Datagrams to every device on the subnet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastUdp {
    target: SocketAddr,
}

impl Default for BroadcastUdp {
    fn default() -> Self {
        Self {
            target: SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), DEFAULT_DEVICE_PORT),
        }
    }
}

impl BroadcastUdp {
    /// Targets `255.255.255.255:9999`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Targets a specific broadcast (or, in tests, unicast) address.
    pub fn with_target(target: SocketAddr) -> Self {
        Self { target }
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Binds an ephemeral socket with `SO_REUSEADDR` and `SO_BROADCAST`.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Transport`] if the socket cannot be created,
    /// configured, or bound.
    pub async fn bind(&self) -> Result<UdpChannel, LinkError> {
        let local = SocketAddr::new(unspecified_for(&self.target), 0);
        let io = |e: std::io::Error| LinkError::transport(local, e);

        let socket = Socket::new(
            Domain::for_address(self.target),
            Type::DGRAM,
            Some(Protocol::UDP),
        )
        .map_err(io)?;
        socket.set_reuse_address(true).map_err(io)?;
        socket.set_broadcast(true).map_err(io)?;
        socket.set_nonblocking(true).map_err(io)?;
        socket.bind(&local.into()).map_err(io)?;

        let socket = UdpSocket::from_std(socket.into()).map_err(io)?;
        debug!("opened broadcast channel to {}", self.target);
        Ok(UdpChannel::new(socket, self.target))
    }
}

#[async_trait]
impl Transport for BroadcastUdp {
    async fn open(&self) -> Result<Box<dyn Channel>, LinkError> {
        Ok(Box::new(self.bind().await?))
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::Broadcast(self.target)
    }
}

/// A bound datagram socket; closed when dropped.
pub struct UdpChannel {
    socket: UdpSocket,
    target: SocketAddr,
    buf: Vec<u8>,
}

impl UdpChannel {
    fn new(socket: UdpSocket, target: SocketAddr) -> Self {
        Self {
            socket,
            target,
            buf: vec![0u8; DATAGRAM_BUFFER_SIZE],
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Enciphers `request` and sends it as one datagram.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Transport`] if the datagram cannot be sent.
    pub async fn send_datagram(&self, request: &Value) -> Result<(), LinkError> {
        let text = to_wire_json(request);
        trace!("-> {}: {text}", self.target);
        self.socket
            .send_to(&encrypt(&text), self.target)
            .await
            .map_err(|e| LinkError::transport(self.target, e))?;
        Ok(())
    }

    /// Waits up to `timeout` for one datagram and returns its unwrapped
    /// result together with the sender's address.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Timeout`] if nothing arrives in time, or
    /// [`LinkError::Protocol`] if the datagram does not decode.
    pub async fn recv(&mut self, timeout: Duration) -> Result<(Value, SocketAddr), LinkError> {
        let (len, from) = time::timeout(timeout, self.socket.recv_from(&mut self.buf))
            .await
            .map_err(|_| LinkError::Timeout(timeout))?
            .map_err(|e| LinkError::transport(self.target, e))?;

        let text = decrypt(&self.buf[..len])?;
        trace!("<- {from}: {text}");
        let envelope: Value = serde_json::from_str(&text)?;
        Ok((unwrap(envelope)?, from))
    }
}

#[async_trait]
impl Channel for UdpChannel {
    async fn send(&mut self, request: &Value) -> Result<Option<Value>, LinkError> {
        self.send_datagram(request).await?;
        Ok(None)
    }
}

impl Drop for UdpChannel {
    fn drop(&mut self) {
        debug!("closing UDP channel to {}", self.target);
    }
}

fn unspecified_for(target: &SocketAddr) -> IpAddr {
    match target {
        SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        SocketAddr::V6(_) => IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
