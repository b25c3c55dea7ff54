//! Wire format of the Home Assistant MQTT JSON light schema
//!
//! Inbound commands are decoded into [`CommandPayload`]; outbound state and
//! discovery messages are serialized from [`StatePayload`] and
//! [`DiscoveryPayload`].

use serde::{Deserialize, Serialize};

/// Brightness scale advertised in discovery
pub const BRIGHTNESS_SCALE: u32 = 254;

/// Color mode reported by the RGB composite
pub const COLOR_MODE_RGB: &str = "rgb";

/// RGB triplet, each component 0-255
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    pub fn from_array([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

/// Command body received on `{ns}{id}/set`
///
/// Unknown keys (e.g. `transition`, `color.h`) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandPayload {
    /// "ON" or "OFF"; absence makes the message an unknown command
    #[serde(default)]
    pub state: Option<String>,
    /// Trigger name
    #[serde(default)]
    pub effect: Option<String>,
    #[serde(default)]
    pub brightness: Option<u8>,
    #[serde(default)]
    pub color: Option<Rgb>,
}

/// Retained state published on `{ns}{id}/state`
#[derive(Debug, Clone, Serialize)]
pub struct StatePayload<'a> {
    pub state: &'a str,
    pub brightness: u32,
    pub trigger: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_mode: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgb>,
}

/// Device block shared by every entity of one host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub identifiers: Vec<String>,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
}

/// Discovery descriptor published on `{discovery}/light/{device}/{id}/config`
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryPayload<'a> {
    pub availability_topic: &'a str,
    pub state_topic: &'a str,
    pub command_topic: &'a str,
    pub unique_id: String,
    pub brightness: bool,
    pub brightness_scale: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_mode: Option<bool>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub supported_color_modes: &'a [&'a str],
    pub effect: bool,
    pub effect_list: &'a [String],
    pub name: &'a str,
    pub schema: &'a str,
    pub device: &'a DeviceInfo,
    pub json_attributes_topic: &'a str,
}
