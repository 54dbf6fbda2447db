//! # smartlight-core
//!
//! Shared library for the smart-lighting client containing the wire cipher,
//! the JSON envelope format, and the device identity types.
//!
//! It has zero dependencies on network sockets or HTTP clients; everything
//! here is pure data transformation and can be tested without a device on
//! the network.
//!
//! # Architecture overview (for beginners)
//!
//! Smart bulbs and plugs of this family speak a very small protocol:
//!
//! - Every command is a JSON document shaped like
//!   `{"<namespace>": {"<command>": <params or null>}}`.
//! - Before hitting the wire the JSON text is scrambled with a one-byte
//!   rolling XOR cipher ("autokey"), optionally prefixed with a 4-byte length
//!   when sent over TCP.
//! - The device answers with the same two-level shape, and the innermost
//!   object carries an `err_code` telling whether the command succeeded.
//!
//! This crate defines:
//!
//! - **`protocol`** – the cipher ([`protocol::cipher`]) and the envelope
//!   wrap/unwrap rules ([`protocol::envelope`]).
//!
//! - **`domain`** – the identity of a device as learned from a discovery
//!   reply or the cloud device list, plus typed parameter objects for the
//!   commands that take optional arguments.

pub mod domain;
pub mod protocol;

// Re-export the most-used items at the crate root so callers can write
// `smartlight_core::encrypt` instead of `smartlight_core::protocol::cipher::encrypt`.
pub use domain::device::{CloudDeviceEntry, DeviceIdentity};
pub use domain::params::{
    AliasParams, CloudBindParams, FirmwareDownloadParams, LightStateParams, RebootParams,
};
pub use protocol::cipher::{decrypt, decrypt_framed, encrypt, encrypt_framed, SEED_KEY};
pub use protocol::envelope::{to_wire_json, unwrap, wrap, Request};
pub use protocol::error::ProtocolError;
