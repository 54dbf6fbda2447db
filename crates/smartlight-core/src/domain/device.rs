//! Device identity as reported by the device itself or by the cloud.
//!
//! Two sources describe the same device with differently-named fields:
//!
//! | Source              | id field   | model field   | address            |
//! |---------------------|------------|---------------|--------------------|
//! | UDP sysinfo reply   | `deviceId` | `model`       | datagram source IP |
//! | cloud `deviceList`  | `deviceId` | `deviceModel` | not known          |
//!
//! Both are normalised into a [`DeviceIdentity`].

use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::error::ProtocolError;

/// The fields every discovery path agrees on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Globally unique device identifier (hex string).
    pub device_id: String,
    /// Hardware model, e.g. `"LB130(US)"`.
    pub model: String,
    /// Local address, if the device was found on the LAN.
    pub ip: Option<IpAddr>,
}

impl DeviceIdentity {
    /// Extracts the identity from a `system.get_sysinfo` result object.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MissingField`] if `deviceId` or `model` is
    /// absent or not a string.
    pub fn from_sysinfo(sysinfo: &Value, ip: IpAddr) -> Result<Self, ProtocolError> {
        let device_id = string_field(sysinfo, "deviceId")?;
        let model = string_field(sysinfo, "model")?;
        Ok(Self {
            device_id,
            model,
            ip: Some(ip),
        })
    }

    /// Returns `true` if `filter` is unset or is a substring of the model.
    pub fn matches_model(&self, filter: Option<&str>) -> bool {
        filter.map_or(true, |tag| self.model.contains(tag))
    }
}

/// One entry of the cloud `getDeviceList` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudDeviceEntry {
    pub device_id: String,
    pub device_model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    /// 1 when the device is connected to the cloud.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fw_ver: Option<String>,
    /// Regional relay URL assigned to the device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_server_url: Option<String>,
}

impl CloudDeviceEntry {
    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity {
            device_id: self.device_id.clone(),
            model: self.device_model.clone(),
            ip: None,
        }
    }
}

fn string_field(obj: &Value, name: &'static str) -> Result<String, ProtocolError> {
    obj.get(name)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or(ProtocolError::MissingField(name))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
