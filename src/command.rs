//! Typed light commands
//!
//! An inbound JSON body is decoded once into a [`CommandPayload`] and then
//! turned into an ordered list of [`LightCommand`]s using the light's
//! current values as defaults. The decision order is:
//!
//! 1. `state == "OFF"` or `effect == "none"` turns the light off
//! 2. `state == "ON"` selects the effect, then brightness, then color (RGB only)
//! 3. anything else is an unknown state

use mqttled_sysfs::{TRIGGER_DEFAULT_ON, TRIGGER_NONE};

use crate::error::CommandError;
use crate::payload::{CommandPayload, Rgb};

const STATE_ON: &str = "ON";
const STATE_OFF: &str = "OFF";

/// One step applied to a light
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LightCommand {
    /// Activate a trigger
    TurnOn { effect: String },
    /// Select `none` and darken
    TurnOff,
    /// Stored brightness (single LED) or overall intensity (RGB)
    SetBrightness(u32),
    SetColor(Rgb),
}

/// Values a command falls back to when a key is absent
#[derive(Debug, Clone, Copy)]
pub struct CommandDefaults {
    pub brightness: u32,
    /// Current color; `None` for lights without color support
    pub color: Option<Rgb>,
}

impl CommandPayload {
    /// Decode a raw message body
    pub fn decode(body: &[u8]) -> Result<Self, CommandError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Resolve into the commands to apply, in order
    pub fn into_commands(self, defaults: &CommandDefaults) -> Result<Vec<LightCommand>, CommandError> {
        let state = self.state.ok_or(CommandError::UnknownCommand)?;
        let effect = self
            .effect
            .unwrap_or_else(|| TRIGGER_DEFAULT_ON.to_string());

        if state == STATE_OFF || effect == TRIGGER_NONE {
            return Ok(vec![LightCommand::TurnOff]);
        }
        if state != STATE_ON {
            return Err(CommandError::UnknownState(state));
        }

        let brightness = self.brightness.map_or(defaults.brightness, u32::from);
        let mut commands = vec![
            LightCommand::TurnOn { effect },
            LightCommand::SetBrightness(brightness),
        ];
        if let Some(current) = defaults.color {
            commands.push(LightCommand::SetColor(self.color.unwrap_or(current)));
        }
        Ok(commands)
    }
}
