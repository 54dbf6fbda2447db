//! Parameter objects for commands that take optional arguments.
//!
//! Only the fields a caller actually sets are put on the wire: every optional
//! field is skipped during serialization when it is `None`.  This keeps
//! commands such as `transition_light_state` from resetting values the caller
//! never meant to touch.

use serde::Serialize;

/// Arguments of `smartlife.iot.smartbulb.lightingservice.transition_light_state`.
///
/// # Examples
///
/// ```rust
/// use smartlight_core::LightStateParams;
///
/// let params = LightStateParams::new().hue(120).brightness(60);
/// let json = serde_json::to_string(&params).unwrap();
/// assert_eq!(json, r#"{"hue":120,"brightness":60}"#);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LightStateParams {
    /// Hue in degrees, 0–360.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hue: Option<u16>,
    /// Saturation in percent, 0–100.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saturation: Option<u8>,
    /// Brightness in percent, 0–100.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
    /// White colour temperature in kelvin; 0 selects colour mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_temp: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_off: Option<bool>,
    /// Fade duration in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition_period: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_default: Option<bool>,
}

impl LightStateParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hue(mut self, hue: u16) -> Self {
        self.hue = Some(hue);
        self
    }

    pub fn saturation(mut self, saturation: u8) -> Self {
        self.saturation = Some(saturation);
        self
    }

    pub fn brightness(mut self, brightness: u8) -> Self {
        self.brightness = Some(brightness);
        self
    }

    pub fn color_temp(mut self, kelvin: u16) -> Self {
        self.color_temp = Some(kelvin);
        self
    }

    pub fn on_off(mut self, on: bool) -> Self {
        self.on_off = Some(on);
        self
    }

    pub fn transition_period(mut self, millis: u32) -> Self {
        self.transition_period = Some(millis);
        self
    }

    pub fn mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    pub fn ignore_default(mut self, ignore: bool) -> Self {
        self.ignore_default = Some(ignore);
        self
    }

    /// Sets hue, saturation and brightness in one call.
    pub fn hsb(self, hue: u16, saturation: u8, brightness: u8) -> Self {
        self.hue(hue).saturation(saturation).brightness(brightness)
    }
}

/// Arguments of `smartlife.iot.common.system.reboot`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RebootParams {
    /// Seconds to wait before rebooting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<u32>,
}

/// Arguments of `system.set_dev_alias`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasParams {
    pub alias: String,
}

/// Arguments of `smartlife.iot.common.cloud.bind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloudBindParams {
    pub username: String,
    pub password: String,
}

/// Arguments of `system.download_firmware`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FirmwareDownloadParams {
    /// Must point at a vendor firmware server; devices reject other hosts.
    pub url: String,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
