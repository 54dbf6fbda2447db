//! smartlight-client library entry point.
//!
//! Transports, discovery, and device capabilities for smart bulbs and plugs
//! that speak the autokey-XOR JSON protocol on port 9999.
//!
//! ```text
//! application     DeviceLink · DiscoveryScanner · CloudDirectory · SmartDevice · Bulb
//!      │
//! infrastructure  LocalTcp · LocalUdp · BroadcastUdp · CloudRelay · config
//!      │
//! smartlight-core cipher · envelope · DeviceIdentity · parameter types
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use smartlight_client::{Bulb, DiscoveryScanner, ScanOptions};
//!
//! # async fn run() -> Result<(), smartlight_client::LinkError> {
//! let scanner = DiscoveryScanner::new(ScanOptions::default().with_model_filter("LB130"));
//! let found = scanner
//!     .scan(|device| async move {
//!         let bulb = Bulb::from(device);
//!         let _ = bulb.on().await;
//!     })
//!     .await?;
//! println!("switched on {found} bulbs");
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod error;
pub mod infrastructure;

pub use application::bulb::Bulb;
pub use application::capabilities::SmartDevice;
pub use application::discover_cloud::CloudDirectory;
pub use application::discover_local::{DiscoveryScanner, ScanOptions};
pub use application::{DeviceLink, DiscoveredDevice};
pub use error::LinkError;
pub use infrastructure::storage::config::{load_config, save_config, ClientConfig, ConfigError};
pub use infrastructure::transport::{
    BroadcastUdp, Channel, CloudClient, CloudRelay, Endpoint, LocalTcp, LocalUdp, Transport,
};
