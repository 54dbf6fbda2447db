//! Domain types for the smart-lighting client.
//!
//! Nothing here touches a socket.  These types describe *who* a device is
//! ([`device`]) and *what* optional arguments a command carries ([`params`]).

/// Device identities learned from discovery replies and the cloud device list.
pub mod device;

/// Parameter objects for commands with optional arguments.
pub mod params;
