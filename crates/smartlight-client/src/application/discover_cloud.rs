//! CloudDirectory: devices bound to a cloud account.
//!
//! One `getDeviceList` call returns every device on the account.  Each entry
//! that matches the model filter becomes a [`DiscoveredDevice`] whose link
//! relays commands through the cloud with the account's token.  Handlers run
//! concurrently on a [`JoinSet`], and unlike the LAN scanner the directory
//! waits for all of them before returning.

use std::future::Future;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::device_link::{DeviceLink, DiscoveredDevice};
use crate::error::LinkError;
use crate::infrastructure::transport::{CloudClient, CloudRelay};

/// Enumerates the devices of one cloud account.
#[derive(Debug, Clone)]
pub struct CloudDirectory {
    client: CloudClient,
    model_filter: Option<String>,
}

impl CloudDirectory {
    /// `client` must carry a token; see [`CloudClient::login`].
    pub fn new(client: CloudClient) -> Self {
        Self {
            client,
            model_filter: None,
        }
    }

    pub fn with_model_filter(mut self, tag: impl Into<String>) -> Self {
        self.model_filter = Some(tag.into());
        self
    }

    pub fn client(&self) -> &CloudClient {
        &self.client
    }

    /// Runs `handler` for every matching device and waits for all of them.
    ///
    /// Returns the length of the account's device list, filtered or not.
    /// Ordinals are 1-based positions in that list.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Configuration`] without a token, or the error of
    /// the `getDeviceList` call.  Handler panics are logged, not returned.
    pub async fn discover<F, Fut>(&self, mut handler: F) -> Result<usize, LinkError>
    where
        F: FnMut(DiscoveredDevice) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let entries = self.client.device_list().await?;
        let total = entries.len();
        info!("cloud account lists {total} devices");

        let mut handlers = JoinSet::new();
        for (index, entry) in entries.into_iter().enumerate() {
            let identity = entry.identity();
            if !identity.matches_model(self.model_filter.as_deref()) {
                debug!("skipping {} ({})", identity.device_id, identity.model);
                continue;
            }

            let relay = CloudRelay::new(self.client.clone()).with_device_id(&entry.device_id);
            let device = DiscoveredDevice {
                identity,
                link: DeviceLink::new(relay),
                ordinal: index + 1,
                sysinfo: serde_json::to_value(&entry)?,
            };
            handlers.spawn(handler(device));
        }

        while let Some(joined) = handlers.join_next().await {
            if let Err(e) = joined {
                warn!("cloud discovery handler failed: {e}");
            }
        }
        Ok(total)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
