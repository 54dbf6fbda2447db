//! DiscoveryScanner: find devices on the local subnet.
//!
//! # How a scan works (for beginners)
//!
//! The scanner broadcasts `{"system": {"get_sysinfo": {}}}` and listens for
//! answers.  Broadcasts are lossy, so the query is repeated `repeat` times,
//! each round listening for up to `response_timeout`:
//!
//! ```text
//! budget = repeat × response_timeout
//!
//! round 1: send ──► recv, recv, recv … (until the slice or budget runs out)
//! round 2: send ──► recv …
//! …
//! ```
//!
//! Time spent in each receive is measured and subtracted from both the round
//! slice and the overall budget, so the scan ends close to the budget no
//! matter how many replies arrive.  With `repeat = 0` there is no budget and
//! the scan runs until `max_devices` devices have been found.
//!
//! Every device reply is checked against the model filter and deduplicated
//! by `deviceId`.  A new device gets the next ordinal and a TCP-backed
//! [`DeviceLink`] to the address it answered from, and the handler future is
//! spawned on its own Tokio task.  The scanner never waits for handlers, so a
//! slow handler cannot eat into the discovery budget.

use std::collections::HashSet;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use smartlight_core::protocol::envelope::ERR_CODE;
use smartlight_core::{DeviceIdentity, Request};
use tracing::{debug, info, warn};

use super::device_link::{DeviceLink, DiscoveredDevice};
use crate::error::LinkError;
use crate::infrastructure::transport::{
    tcp::{DEFAULT_MAX_RESPONSE_BYTES, DEFAULT_TCP_TIMEOUT},
    BroadcastUdp, LocalTcp, DEFAULT_DEVICE_PORT,
};

/// Parameters of one scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOptions {
    /// Broadcast rounds; `0` means unbounded.
    pub repeat: u32,
    /// Listening time per round.
    pub response_timeout: Duration,
    /// Stop after this many distinct devices.  `None` or `Some(0)` means no
    /// limit.
    pub max_devices: Option<usize>,
    /// Only report devices whose model contains this string.
    pub model_filter: Option<String>,
    /// Where the query is sent.
    pub target: SocketAddr,
    /// TCP port of the links handed to the handler.
    pub device_port: u16,
    pub tcp_timeout: Duration,
    pub max_response_bytes: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            repeat: 10,
            response_timeout: Duration::from_millis(100),
            max_devices: None,
            model_filter: None,
            target: SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), DEFAULT_DEVICE_PORT),
            device_port: DEFAULT_DEVICE_PORT,
            tcp_timeout: DEFAULT_TCP_TIMEOUT,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }
}

impl ScanOptions {
    pub fn with_repeat(mut self, repeat: u32) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_max_devices(mut self, max: usize) -> Self {
        self.max_devices = Some(max);
        self
    }

    pub fn with_model_filter(mut self, tag: impl Into<String>) -> Self {
        self.model_filter = Some(tag.into());
        self
    }

    pub fn with_target(mut self, target: SocketAddr) -> Self {
        self.target = target;
        self
    }

    pub fn with_device_port(mut self, port: u16) -> Self {
        self.device_port = port;
        self
    }

    fn device_limit(&self) -> Option<usize> {
        self.max_devices.filter(|&n| n > 0)
    }

    /// Total listening time, `repeat × response_timeout`, capped at
    /// [`Duration::MAX`].
    fn scan_budget(&self) -> Duration {
        self.response_timeout
            .checked_mul(self.repeat)
            .unwrap_or(Duration::MAX)
    }
}

/// Broadcast discovery of devices on the LAN.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryScanner {
    options: ScanOptions,
}

impl DiscoveryScanner {
    pub fn new(options: ScanOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Runs one scan and returns the number of distinct devices found.
    ///
    /// `handler` is called once per new device; the future it returns is
    /// spawned and not awaited.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Transport`] if the broadcast socket cannot be
    /// opened or the query cannot be sent.  Receive timeouts and undecodable
    /// replies are not errors.
    pub async fn scan<F, Fut>(&self, mut handler: F) -> Result<usize, LinkError>
    where
        F: FnMut(DiscoveredDevice) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let opts = &self.options;
        let bounded = opts.repeat != 0;
        let limit = opts.device_limit();
        let mut budget = opts.scan_budget();
        let mut seen: HashSet<String> = HashSet::new();

        let mut channel = BroadcastUdp::with_target(opts.target).bind().await?;
        let probe = Request::new("system", "get_sysinfo")
            .with_value(json!({}))
            .to_value();

        info!(
            "scanning {} ({} rounds of {:?})",
            opts.target, opts.repeat, opts.response_timeout
        );

        while !bounded || !budget.is_zero() {
            channel.send_datagram(&probe).await?;

            let mut slice = if bounded {
                budget.min(opts.response_timeout)
            } else {
                opts.response_timeout
            };

            while !slice.is_zero() {
                let before = Instant::now();
                let received = channel.recv(slice).await;
                let elapsed = before.elapsed();
                slice = slice.saturating_sub(elapsed);
                if bounded {
                    budget = budget.saturating_sub(elapsed);
                }

                let (sysinfo, from) = match received {
                    Ok(reply) => reply,
                    Err(e) if e.is_timeout() => break,
                    Err(LinkError::Protocol(e)) => {
                        warn!("ignoring undecodable discovery reply: {e}");
                        continue;
                    }
                    Err(e) => {
                        warn!("discovery receive failed: {e}");
                        break;
                    }
                };

                let Some(device) = self.admit(sysinfo, from.ip(), &mut seen) else {
                    continue;
                };
                debug!(
                    "found {} ({}) at {} as #{}",
                    device.identity.device_id, device.identity.model, from, device.ordinal
                );
                tokio::spawn(handler(device));

                if limit.is_some_and(|max| seen.len() >= max) {
                    info!("scan reached {} devices", seen.len());
                    return Ok(seen.len());
                }
            }
        }

        info!("scan finished with {} devices", seen.len());
        Ok(seen.len())
    }

    /// Returns a new [`DiscoveredDevice`] for an unseen, matching reply.
    fn admit(
        &self,
        mut sysinfo: Value,
        ip: IpAddr,
        seen: &mut HashSet<String>,
    ) -> Option<DiscoveredDevice> {
        let identity = match DeviceIdentity::from_sysinfo(&sysinfo, ip) {
            Ok(identity) => identity,
            Err(e) => {
                warn!("ignoring discovery reply from {ip}: {e}");
                return None;
            }
        };

        if !identity.matches_model(self.options.model_filter.as_deref()) {
            return None;
        }
        if !seen.insert(identity.device_id.clone()) {
            return None;
        }

        if let Some(map) = sysinfo.as_object_mut() {
            map.remove(ERR_CODE);
        }

        let transport = LocalTcp::new(ip)
            .with_port(self.options.device_port)
            .with_timeout(self.options.tcp_timeout)
            .with_max_response_bytes(self.options.max_response_bytes);

        Some(DiscoveredDevice {
            identity,
            link: DeviceLink::new(transport),
            ordinal: seen.len(),
            sysinfo,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::transport::Endpoint;

    fn scanner_with_filter(filter: Option<&str>) -> DiscoveryScanner {
        let mut options = ScanOptions::default().with_device_port(10_000);
        options.model_filter = filter.map(str::to_string);
        DiscoveryScanner::new(options)
    }

    fn sysinfo(id: &str, model: &str) -> Value {
        json!({"deviceId": id, "model": model, "alias": "lamp"})
    }

    #[test]
    fn test_default_options() {
        // Arrange / Act
        let opts = ScanOptions::default();

        // Assert
        assert_eq!(opts.repeat, 10);
        assert_eq!(opts.response_timeout, Duration::from_millis(100));
        assert_eq!(opts.target, "255.255.255.255:9999".parse().unwrap());
        assert_eq!(opts.device_limit(), None);
    }

    #[test]
    fn test_zero_max_devices_means_no_limit() {
        assert_eq!(ScanOptions::default().with_max_devices(0).device_limit(), None);
        assert_eq!(ScanOptions::default().with_max_devices(2).device_limit(), Some(2));
    }

    #[test]
    fn test_scan_budget_saturates_instead_of_overflowing() {
        // Arrange
        let normal = ScanOptions::default()
            .with_repeat(3)
            .with_response_timeout(Duration::from_millis(60));
        let huge = ScanOptions::default()
            .with_repeat(u32::MAX)
            .with_response_timeout(Duration::from_secs(u64::MAX / 2));

        // Act / Assert
        assert_eq!(normal.scan_budget(), Duration::from_millis(180));
        assert_eq!(huge.scan_budget(), Duration::MAX);
    }

    #[test]
    fn test_admit_assigns_ordinals_and_tcp_link() {
        // Arrange
        let scanner = scanner_with_filter(None);
        let mut seen = HashSet::new();
        let ip: IpAddr = "10.0.0.5".parse().unwrap();

        // Act
        let first = scanner.admit(sysinfo("A", "LB130(US)"), ip, &mut seen).unwrap();
        let second = scanner.admit(sysinfo("B", "HS100(US)"), ip, &mut seen).unwrap();

        // Assert
        assert_eq!(first.ordinal, 1);
        assert_eq!(second.ordinal, 2);
        assert_eq!(first.link.endpoint(), Endpoint::Tcp("10.0.0.5:10000".parse().unwrap()));
        assert_eq!(first.identity.ip, Some(ip));
    }

    #[test]
    fn test_admit_drops_duplicates() {
        let scanner = scanner_with_filter(None);
        let mut seen = HashSet::new();
        let ip: IpAddr = "10.0.0.5".parse().unwrap();

        assert!(scanner.admit(sysinfo("A", "LB130"), ip, &mut seen).is_some());
        assert!(scanner.admit(sysinfo("A", "LB130"), ip, &mut seen).is_none());
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_admit_applies_model_filter_before_dedup() {
        // Arrange
        let scanner = scanner_with_filter(Some("LB130"));
        let mut seen = HashSet::new();
        let ip: IpAddr = "10.0.0.5".parse().unwrap();

        // Act
        let plug = scanner.admit(sysinfo("P", "HS100(US)"), ip, &mut seen);
        let bulb = scanner.admit(sysinfo("B", "LB130(EU)"), ip, &mut seen);

        // Assert
        assert!(plug.is_none());
        assert_eq!(bulb.unwrap().ordinal, 1);
        assert!(!seen.contains("P"));
    }

    #[test]
    fn test_admit_skips_reply_without_identity() {
        let scanner = scanner_with_filter(None);
        let mut seen = HashSet::new();
        let reply = json!({"model": "LB130"});
        assert!(scanner
            .admit(reply, "10.0.0.5".parse().unwrap(), &mut seen)
            .is_none());
    }
}
