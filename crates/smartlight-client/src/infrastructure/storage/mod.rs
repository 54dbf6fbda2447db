//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads and writes the TOML file that holds the
//! device port, timeouts, discovery budget, and cloud account settings, and
//! falls back to defaults when the file does not exist yet.

pub mod config;
