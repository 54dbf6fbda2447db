//! Commands every device of the family understands.
//!
//! [`SmartDevice`] is a [`DeviceLink`] plus the last `get_sysinfo` result.
//! Each method builds one [`Request`] and routes it through the link, so the
//! `err_code` rules apply uniformly.

use serde_json::{Map, Value};
use smartlight_core::{
    AliasParams, CloudBindParams, FirmwareDownloadParams, ProtocolError, RebootParams, Request,
};
use tracing::info;

use super::device_link::{DeviceLink, DiscoveredDevice};
use crate::error::LinkError;

const SYSTEM: &str = "system";
const COMMON_SYSTEM: &str = "smartlife.iot.common.system";
const COMMON_CLOUD: &str = "smartlife.iot.common.cloud";

/// A device reachable through a [`DeviceLink`].
#[derive(Debug, Clone, PartialEq)]
pub struct SmartDevice {
    link: DeviceLink,
    sysinfo: Option<Value>,
}

impl SmartDevice {
    pub fn new(link: DeviceLink) -> Self {
        Self {
            link,
            sysinfo: None,
        }
    }

    pub fn with_sysinfo(link: DeviceLink, sysinfo: Value) -> Self {
        Self {
            link,
            sysinfo: Some(sysinfo),
        }
    }

    pub fn link(&self) -> &DeviceLink {
        &self.link
    }

    /// The cached sysinfo from discovery or the last [`SmartDevice::get_sysinfo`].
    pub fn sysinfo(&self) -> Option<&Value> {
        self.sysinfo.as_ref()
    }

    /// Fetches and caches `system.get_sysinfo`.
    pub async fn get_sysinfo(&mut self) -> Result<Value, LinkError> {
        let sysinfo = Value::Object(self.query(Request::new(SYSTEM, "get_sysinfo")).await?);
        self.sysinfo = Some(sysinfo.clone());
        Ok(sysinfo)
    }

    /// Reboots after `delay` seconds (device default when `None`).
    pub async fn reboot(&self, delay: Option<u32>) -> Result<(), LinkError> {
        let request = Request::new(COMMON_SYSTEM, "reboot").with_params(&RebootParams { delay })?;
        self.link.send(&request).await?;
        Ok(())
    }

    pub async fn set_alias(&self, alias: &str) -> Result<(), LinkError> {
        let request = Request::new(SYSTEM, "set_dev_alias").with_params(&AliasParams {
            alias: alias.to_string(),
        })?;
        self.link.send(&request).await?;
        Ok(())
    }

    // ── Cloud binding ─────────────────────────────────────────────────────────

    /// Returns the device's cloud binding status (`binded`, `username`, ...).
    pub async fn get_cloud_info(&self) -> Result<Map<String, Value>, LinkError> {
        self.query(Request::new(COMMON_CLOUD, "get_info")).await
    }

    /// Binds the device to a cloud account.
    pub async fn bind_cloud(&self, username: &str, password: &str) -> Result<(), LinkError> {
        let request = Request::new(COMMON_CLOUD, "bind").with_params(&CloudBindParams {
            username: username.to_string(),
            password: password.to_string(),
        })?;
        self.link.send(&request).await?;
        info!("bound {:?} to cloud account {username}", self.link.endpoint());
        Ok(())
    }

    pub async fn unbind_cloud(&self) -> Result<(), LinkError> {
        self.link.send(&Request::new(COMMON_CLOUD, "unbind")).await?;
        Ok(())
    }

    // ── Firmware ──────────────────────────────────────────────────────────────

    /// Lists firmware newer than the installed one.
    pub async fn get_firmware_list(&self) -> Result<Vec<Value>, LinkError> {
        let mut result = self.query(Request::new(COMMON_CLOUD, "get_intl_fw_list")).await?;
        match result.remove("fw_list") {
            Some(Value::Array(list)) => Ok(list),
            _ => Err(ProtocolError::MissingField("fw_list").into()),
        }
    }

    /// `true` when the cloud offers no newer firmware.
    pub async fn has_latest_firmware(&self) -> Result<bool, LinkError> {
        Ok(self.get_firmware_list().await?.is_empty())
    }

    /// Asks the device to download the first listed firmware.
    ///
    /// Returns `false` when the firmware is already current.
    pub async fn update_firmware(&self) -> Result<bool, LinkError> {
        let list = self.get_firmware_list().await?;
        let Some(first) = list.first() else {
            return Ok(false);
        };
        let url = first
            .get("fwUrl")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingField("fwUrl"))?;

        let request = Request::new(SYSTEM, "download_firmware").with_params(&FirmwareDownloadParams {
            url: url.to_string(),
        })?;
        self.link.send(&request).await?;
        info!("firmware download requested from {url}");
        Ok(true)
    }

    /// Sends `request` and requires a result.
    pub(crate) async fn query(&self, request: Request) -> Result<Map<String, Value>, LinkError> {
        let namespace = request.namespace().to_string();
        self.link.send(&request).await?.ok_or_else(|| {
            LinkError::Configuration(format!(
                "`{namespace}.{}` needs a transport that returns replies",
                request.command()
            ))
        })
    }
}

impl From<DiscoveredDevice> for SmartDevice {
    fn from(device: DiscoveredDevice) -> Self {
        Self::with_sysinfo(device.link, device.sysinfo)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
