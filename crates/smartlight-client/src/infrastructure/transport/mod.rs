//! Transport abstraction and its variants.
//!
//! # Sub-modules
//!
//! - **`tcp`** – [`LocalTcp`]: one framed request/response exchange over a
//!   fresh TCP connection to the device on port 9999.
//!
//! - **`udp`** – [`LocalUdp`] and [`BroadcastUdp`]: unframed datagrams.  Sends
//!   are fire-and-forget; replies are read explicitly with
//!   [`UdpChannel::recv`].
//!
//! - **`cloud`** – [`CloudRelay`]: commands forwarded through the vendor's
//!   HTTPS `passthrough` API, plus the [`CloudClient`] used for login and the
//!   device list.
//!
//! # Scoped channels
//!
//! A [`Transport`] is only an address.  [`Transport::open`] acquires the
//! socket or session and returns a [`Channel`]; dropping the channel releases
//! it.  Every path out of a caller's scope, including `?` on an error, drops
//! the channel, so no socket outlives the exchange that needed it.  Channels
//! are never pooled or reused.

use std::net::SocketAddr;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::LinkError;

pub mod cloud;
pub mod tcp;
pub mod udp;

pub use cloud::{CloudClient, CloudRelay};
pub use tcp::LocalTcp;
pub use udp::{BroadcastUdp, LocalUdp, UdpChannel};

/// Default device control port for both TCP and UDP.
pub const DEFAULT_DEVICE_PORT: u16 = 9999;

/// Identifies where a transport delivers its messages.
///
/// Two transports are interchangeable exactly when their endpoints are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Tcp(SocketAddr),
    Udp(SocketAddr),
    Broadcast(SocketAddr),
    Cloud {
        device_id: Option<String>,
        token: Option<String>,
    },
}

/// A way of reaching a device.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Acquires the underlying socket or session.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError`] if the socket cannot be created or connected.
    async fn open(&self) -> Result<Box<dyn Channel>, LinkError>;

    /// The address this transport talks to.
    fn endpoint(&self) -> Endpoint;
}

/// An open socket or session; dropping it closes the connection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Channel: Send {
    /// Sends one request envelope.
    ///
    /// Returns the unwrapped result object, or `None` for transports that do
    /// not wait for a reply.
    async fn send(&mut self, request: &Value) -> Result<Option<Value>, LinkError>;
}

// ── Test doubles ──────────────────────────────────────────────────────────────
