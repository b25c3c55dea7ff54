//! Bridge between Linux LED class devices and MQTT
//!
//! Every LED under `/sys/class/leds` (and optionally an RGB composite made of
//! three of them) is exposed as a Home Assistant JSON-schema light:
//! commands arrive on `{ns}{id}/set`, state is published retained on
//! `{ns}{id}/state`, and discovery descriptors are announced on connect.

pub mod bus;
pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod light;
pub mod mqtt;
pub mod payload;

pub use bus::{MemoryBus, MessageBus, MessageRouter, Published};
pub use command::{CommandDefaults, LightCommand};
pub use config::{Config, ConfigError};
pub use controller::{ConnectionOutcome, Controller, ControllerContext, RefusalReason};
pub use error::{BusError, CommandError, ControllerError, LightError};
pub use light::{sanitize_id, LedAdapter, LightEntity, RgbComposite, SharedLight};
pub use mqtt::MqttBus;
pub use payload::{CommandPayload, DeviceInfo, Rgb, StatePayload};
