//! Error taxonomy shared by every transport and use case in this crate.

use std::net::SocketAddr;
use std::time::Duration;

use smartlight_core::ProtocolError;
use thiserror::Error;

/// Errors surfaced by [`crate::DeviceLink::send`] and the transports behind it.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Ciphertext did not decode, or the envelope had the wrong shape.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The device does not implement the requested namespace.
    #[error("device does not support module `{0}`")]
    UnsupportedModule(String),

    /// The device answered with a non-zero `err_code`.
    #[error("device error {code}: {message}")]
    Device { code: i64, message: String },

    /// The cloud API answered with a non-zero `error_code`.
    #[error("cloud API error {code}: {message}")]
    CloudApi { code: i64, message: String },

    /// A transport was used without the settings it requires.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A connect, read or write did not complete in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// A socket-level failure (refused, unreachable, reset).
    #[error("transport error talking to {addr}: {source}")]
    Transport {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// A framed response declared more bytes than the configured limit.
    #[error("response of {declared} bytes exceeds the {limit} byte limit")]
    ResponseTooLarge { declared: usize, limit: usize },

    /// The HTTPS request to the cloud relay failed.
    #[error("cloud request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl LinkError {
    pub(crate) fn transport(addr: SocketAddr, source: std::io::Error) -> Self {
        Self::Transport { addr, source }
    }

    /// Returns `true` for [`LinkError::Timeout`] and OS-level timeout errors.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Transport { source, .. } => is_timeout_error(source),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for LinkError {
    fn from(e: serde_json::Error) -> Self {
        Self::Protocol(ProtocolError::Json(e))
    }
}

/// Returns `true` for OS timeout / would-block errors.
pub(crate) fn is_timeout_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
