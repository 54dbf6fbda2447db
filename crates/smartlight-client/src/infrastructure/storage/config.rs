//! TOML-based configuration for the smart-lighting client.
//!
//! All settings are optional; a missing file or a missing field falls back to
//! the values devices of this family expect out of the box.
//!
//! # Example file (for beginners)
//!
//! ```toml
//! [network]
//! port = 9999
//! tcp_timeout_ms = 500
//! broadcast_address = "192.168.1.255"
//!
//! [discovery]
//! repeat = 10
//! response_timeout_ms = 100
//! max_devices = 4
//! model_filter = "LB130"
//!
//! [cloud]
//! endpoint = "https://wap.tplinkcloud.com"
//! token = "..."
//! ```
//!
//! Fields annotated with `#[serde(default = "some_fn")]` take the value of
//! `some_fn()` when absent, so an older file keeps working after new settings
//! are added.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::application::discover_local::ScanOptions;
use crate::error::LinkError;
use crate::infrastructure::transport::{
    cloud::{DEFAULT_APP_TYPE, DEFAULT_CLOUD_ENDPOINT},
    CloudClient, LocalTcp, DEFAULT_DEVICE_PORT,
};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// `broadcast_address` is not an IP address.
    #[error("invalid broadcast address `{0}`")]
    InvalidAddress(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level client configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub cloud: CloudConfig,
}

/// Device port and socket limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// Device control port, shared by TCP and UDP.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bound on TCP connect and on each request/response exchange.
    #[serde(default = "default_tcp_timeout_ms")]
    pub tcp_timeout_ms: u64,
    /// Largest framed TCP response accepted.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// Destination of discovery datagrams.
    #[serde(default = "default_broadcast_address")]
    pub broadcast_address: String,
}

/// Budget of a local discovery scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoveryConfig {
    /// Broadcast rounds; `0` scans until `max_devices` is reached.
    #[serde(default = "default_repeat")]
    pub repeat: u32,
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
    /// Stop after this many distinct devices.  `0` means no limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_devices: Option<usize>,
    /// Only report devices whose model contains this string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_filter: Option<String>,
}

/// Cloud account settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CloudConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_app_type")]
    pub app_type: String,
    /// Identifies this installation to the cloud; generated on first run.
    #[serde(default = "Uuid::new_v4")]
    pub terminal_uuid: Uuid,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Session token from a previous login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_port() -> u16 {
    DEFAULT_DEVICE_PORT
}
fn default_tcp_timeout_ms() -> u64 {
    500
}
fn default_max_response_bytes() -> usize {
    64 * 1024
}
fn default_broadcast_address() -> String {
    "255.255.255.255".to_string()
}
fn default_repeat() -> u32 {
    10
}
fn default_response_timeout_ms() -> u64 {
    100
}
fn default_endpoint() -> String {
    DEFAULT_CLOUD_ENDPOINT.to_string()
}
fn default_app_type() -> String {
    DEFAULT_APP_TYPE.to_string()
}
fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            tcp_timeout_ms: default_tcp_timeout_ms(),
            max_response_bytes: default_max_response_bytes(),
            broadcast_address: default_broadcast_address(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            repeat: default_repeat(),
            response_timeout_ms: default_response_timeout_ms(),
            max_devices: None,
            model_filter: None,
        }
    }
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            app_type: default_app_type(),
            terminal_uuid: Uuid::new_v4(),
            request_timeout_secs: default_request_timeout_secs(),
            token: None,
        }
    }
}

// ── Conversions ───────────────────────────────────────────────────────────────

impl ClientConfig {
    /// Builds the discovery options described by `[network]` and `[discovery]`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAddress`] if `broadcast_address` does not
    /// parse.
    pub fn scan_options(&self) -> Result<ScanOptions, ConfigError> {
        let ip: IpAddr = self
            .network
            .broadcast_address
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(self.network.broadcast_address.clone()))?;

        Ok(ScanOptions {
            repeat: self.discovery.repeat,
            response_timeout: Duration::from_millis(self.discovery.response_timeout_ms),
            max_devices: self.discovery.max_devices,
            model_filter: self.discovery.model_filter.clone(),
            target: SocketAddr::new(ip, self.network.port),
            device_port: self.network.port,
            tcp_timeout: Duration::from_millis(self.network.tcp_timeout_ms),
            max_response_bytes: self.network.max_response_bytes,
        })
    }

    /// A TCP transport to `ip` with the configured port and limits.
    pub fn tcp_transport(&self, ip: IpAddr) -> LocalTcp {
        LocalTcp::new(ip)
            .with_port(self.network.port)
            .with_timeout(Duration::from_millis(self.network.tcp_timeout_ms))
            .with_max_response_bytes(self.network.max_response_bytes)
    }

    /// A cloud client for the configured endpoint, carrying the saved token.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Http`] if the HTTP client cannot be built.
    pub fn cloud_client(&self) -> Result<CloudClient, LinkError> {
        let client = CloudClient::with_timeout(
            self.cloud.endpoint.clone(),
            Duration::from_secs(self.cloud.request_timeout_secs),
        )?
        .with_app_type(self.cloud.app_type.clone())
        .with_terminal_uuid(self.cloud.terminal_uuid);

        Ok(match &self.cloud.token {
            Some(token) => client.with_token(token.clone()),
            None => client,
        })
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Loads the config at `path`, returning [`ClientConfig::default`] if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ClientConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(path: &Path, config: &ClientConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("smartlight_test_{}", Uuid::new_v4()))
            .join("config.toml")
    }

    #[test]
    fn test_default_config_matches_device_defaults() {
        // Arrange / Act
        let cfg = ClientConfig::default();

        // Assert
        assert_eq!(cfg.network.port, 9999);
        assert_eq!(cfg.network.tcp_timeout_ms, 500);
        assert_eq!(cfg.network.max_response_bytes, 65536);
        assert_eq!(cfg.network.broadcast_address, "255.255.255.255");
        assert_eq!(cfg.discovery.repeat, 10);
        assert_eq!(cfg.discovery.response_timeout_ms, 100);
        assert_eq!(cfg.cloud.endpoint, "https://wap.tplinkcloud.com");
        assert_eq!(cfg.cloud.app_type, "Kasa_Android");
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg: ClientConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg.network, NetworkConfig::default());
        assert_eq!(cfg.discovery, DiscoveryConfig::default());
        assert!(cfg.cloud.token.is_none());
    }

    #[test]
    fn test_partial_section_overrides_only_given_fields() {
        // Arrange
        let toml_str = r#"
[discovery]
repeat = 3
model_filter = "LB130"
"#;

        // Act
        let cfg: ClientConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.discovery.repeat, 3);
        assert_eq!(cfg.discovery.model_filter.as_deref(), Some("LB130"));
        assert_eq!(cfg.discovery.response_timeout_ms, 100);
    }

    #[test]
    fn test_unset_optionals_are_omitted_from_toml() {
        let toml_str = toml::to_string_pretty(&ClientConfig::default()).unwrap();
        assert!(!toml_str.contains("max_devices"));
        assert!(!toml_str.contains("token"));
    }

    #[test]
    fn test_scan_options_reflect_config() {
        // Arrange
        let mut cfg = ClientConfig::default();
        cfg.network.broadcast_address = "192.168.1.255".to_string();
        cfg.discovery.max_devices = Some(2);

        // Act
        let opts = cfg.scan_options().unwrap();

        // Assert
        assert_eq!(opts.target, "192.168.1.255:9999".parse().unwrap());
        assert_eq!(opts.response_timeout, Duration::from_millis(100));
        assert_eq!(opts.max_devices, Some(2));
        assert_eq!(opts.tcp_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_scan_options_reject_bad_broadcast_address() {
        let mut cfg = ClientConfig::default();
        cfg.network.broadcast_address = "not-an-ip".to_string();
        assert!(matches!(cfg.scan_options(), Err(ConfigError::InvalidAddress(_))));
    }

    #[test]
    fn test_cloud_client_carries_saved_token() {
        let mut cfg = ClientConfig::default();
        cfg.cloud.token = Some("abc".to_string());
        let client = cfg.cloud_client().unwrap();
        assert_eq!(client.token(), Some("abc"));
    }

    #[test]
    fn test_load_config_returns_default_when_file_absent() {
        // Arrange
        let path = temp_path();

        // Act
        let cfg = load_config(&path).unwrap();

        // Assert
        assert_eq!(cfg.network, NetworkConfig::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        // Arrange
        let path = temp_path();
        let mut cfg = ClientConfig::default();
        cfg.network.tcp_timeout_ms = 1500;
        cfg.discovery.max_devices = Some(3);
        cfg.cloud.token = Some("t0k3n".to_string());

        // Act
        save_config(&path, &cfg).unwrap();
        let loaded = load_config(&path).unwrap();

        // Assert
        assert_eq!(loaded, cfg);

        // Cleanup
        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    #[test]
    fn test_load_invalid_toml_returns_parse_error() {
        let path = temp_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[[[ not valid toml").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::Parse(_))));

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }
}
