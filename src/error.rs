//! Error types for the MQTT side of the bridge

use mqttled_sysfs::HardwareError;
use thiserror::Error;

/// Errors from decoding an inbound command
#[derive(Error, Debug)]
pub enum CommandError {
    /// Payload is not JSON of the expected shape
    #[error("Malformed command payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Payload has no `state` key
    #[error("Unknown command message (no state)")]
    UnknownCommand,

    /// `state` is neither ON nor OFF
    #[error("Unknown state: {0}")]
    UnknownState(String),
}

/// Errors from the message bus handle
#[derive(Error, Debug)]
pub enum BusError {
    #[error("Failed to publish to {topic}: {reason}")]
    Publish { topic: String, reason: String },

    #[error("Failed to subscribe to {filter}: {reason}")]
    Subscribe { filter: String, reason: String },
}

/// Errors from handling a message for one light
#[derive(Error, Debug)]
pub enum LightError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Hardware(#[from] HardwareError),

    #[error(transparent)]
    Bus(#[from] BusError),

    /// Outbound payload could not be serialized
    #[error("Failed to encode payload: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Errors from building the light registry
#[derive(Error, Debug)]
pub enum ControllerError {
    /// The LED class directory could not be listed
    #[error("Cannot list LEDs: {0}")]
    ListLeds(#[source] HardwareError),

    /// An RGB channel LED could not be opened
    #[error("RGB light {name}: channel {channel}: {source}")]
    RgbChannel {
        name: String,
        channel: String,
        #[source]
        source: HardwareError,
    },

    #[error("Failed to build light {id}: {source}")]
    Light {
        id: String,
        #[source]
        source: LightError,
    },

    /// Nothing left to control
    #[error("No usable LEDs found")]
    NoLights,
}
