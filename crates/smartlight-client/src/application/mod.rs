//! Application layer use cases for the smart-lighting client.
//!
//! # What is the "application" layer? (for beginners)
//!
//! The use cases here decide *what* to send and how to interpret the answer,
//! while the transports in `infrastructure` decide *how* bytes reach a
//! device.  Every use case talks to devices through [`DeviceLink`], which
//! depends only on the `Transport` trait, so tests can swap in a scripted
//! transport and never touch the network.
//!
//! # Sub-modules
//!
//! - **`device_link`** – sends one request over a fresh channel and applies
//!   the `err_code` rules to the reply.
//!
//! - **`discover_local`** – repeated UDP broadcast scan of the local subnet
//!   with a time budget, deduplication, and early exit.
//!
//! - **`discover_cloud`** – enumerates the devices of a cloud account and
//!   runs a handler for each one concurrently.
//!
//! - **`capabilities`** – commands common to every device: sysinfo, reboot,
//!   alias, cloud binding, and firmware updates.
//!
//! - **`bulb`** – light-state commands of colour bulbs.

pub mod bulb;
pub mod capabilities;
pub mod device_link;
pub mod discover_cloud;
pub mod discover_local;

pub use device_link::{DeviceLink, DiscoveredDevice};
