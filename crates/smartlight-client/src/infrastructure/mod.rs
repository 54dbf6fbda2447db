//! Infrastructure layer for the smart-lighting client.
//!
//! Contains the OS-facing adapters: TCP and UDP sockets, the HTTPS cloud
//! relay, and file-system storage for the client configuration.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `smartlight_core`, but MUST NOT be imported by the domain types in
//! `smartlight_core`.

pub mod storage;
pub mod transport;
