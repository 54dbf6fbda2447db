//! Colour bulbs of the LB130 family.
//!
//! A bulb that is switched off reports most of its state inside a nested
//! `dft_on_state` object instead of at the top level.  Every light-state
//! result returned from here has that object merged into the top level, so
//! callers read `hue` or `brightness` in the same place whatever the power
//! state.

use std::ops::Deref;

use serde_json::{Map, Value};
use smartlight_core::{LightStateParams, Request};

use super::capabilities::SmartDevice;
use super::device_link::{DeviceLink, DiscoveredDevice};
use crate::error::LinkError;

/// Model substring identifying these bulbs in sysinfo and device lists.
pub const MODEL_TAG: &str = "LB130";

const LIGHTING_SERVICE: &str = "smartlife.iot.smartbulb.lightingservice";

/// Nested state reported while the bulb is off.
const DEFAULT_ON_STATE: &str = "dft_on_state";

/// A colour bulb; derefs to [`SmartDevice`] for the common commands.
#[derive(Debug, Clone, PartialEq)]
pub struct Bulb {
    device: SmartDevice,
}

impl Bulb {
    pub fn new(link: DeviceLink) -> Self {
        Self {
            device: SmartDevice::new(link),
        }
    }

    pub fn device_mut(&mut self) -> &mut SmartDevice {
        &mut self.device
    }

    pub async fn get_light_state(&self) -> Result<Map<String, Value>, LinkError> {
        let state = self
            .device
            .query(Request::new(LIGHTING_SERVICE, "get_light_state"))
            .await?;
        Ok(flatten_default_on_state(state))
    }

    /// Applies the fields set in `params`.
    ///
    /// Returns the resulting light state, or `None` over a transport that
    /// does not wait for replies.
    pub async fn transition_light_state(
        &self,
        params: &LightStateParams,
    ) -> Result<Option<Map<String, Value>>, LinkError> {
        let request = Request::new(LIGHTING_SERVICE, "transition_light_state").with_params(params)?;
        let state = self.device.link().send(&request).await?;
        Ok(state.map(flatten_default_on_state))
    }

    /// Returns static lamp data such as wattage and colour rendering index.
    pub async fn get_light_details(&self) -> Result<Map<String, Value>, LinkError> {
        self.device
            .query(Request::new(LIGHTING_SERVICE, "get_light_details"))
            .await
    }

    pub async fn on(&self) -> Result<Option<Map<String, Value>>, LinkError> {
        self.transition_light_state(&LightStateParams::new().on_off(true))
            .await
    }

    pub async fn off(&self) -> Result<Option<Map<String, Value>>, LinkError> {
        self.transition_light_state(&LightStateParams::new().on_off(false))
            .await
    }
}

impl Deref for Bulb {
    type Target = SmartDevice;

    fn deref(&self) -> &SmartDevice {
        &self.device
    }
}

impl From<DiscoveredDevice> for Bulb {
    fn from(device: DiscoveredDevice) -> Self {
        Self {
            device: SmartDevice::from(device),
        }
    }
}

fn flatten_default_on_state(mut state: Map<String, Value>) -> Map<String, Value> {
    if let Some(Value::Object(nested)) = state.remove(DEFAULT_ON_STATE) {
        state.extend(nested);
    }
    state
}

// ── Tests ─────────────────────────────────────────────────────────────────────
