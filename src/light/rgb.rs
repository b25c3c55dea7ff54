//! RGB composite light built from three single-color LEDs
//!
//! The composite keeps a virtual overall brightness `B` (0-255). A color
//! component `c` is written to its channel as `round(c * B / 255)`, and read
//! back as `round(raw * 255 / B)`.

use mqttled_sysfs::{HardwareError, LedDriver, TRIGGER_NONE};
use tracing::info;

use super::LightInfo;
use crate::command::{CommandDefaults, LightCommand};
use crate::controller::ControllerContext;
use crate::error::LightError;
use crate::payload::{Rgb, StatePayload, COLOR_MODE_RGB};

const MAX_LEVEL: u32 = 255;
const COLOR_MODES: &[&str] = &[COLOR_MODE_RGB];

/// Raw channel brightness for a color component
fn scale(value: u8, scale_factor: f64) -> u32 {
    (f64::from(value) * scale_factor).round() as u32
}

/// Color component for a raw channel brightness
fn unscale(raw: u32, scale_factor: f64) -> u8 {
    if scale_factor <= 0.0 {
        return 0;
    }
    (f64::from(raw) / scale_factor).round().min(f64::from(u8::MAX)) as u8
}

/// Three LEDs (red, green, blue) exposed as one RGB light
#[derive(Debug)]
pub struct RgbComposite {
    info: LightInfo,
    /// Red, green, blue
    channels: [LedDriver; 3],
    /// Overall intensity, the scale factor numerator
    brightness: u32,
    current_trigger: String,
    /// Last color fully written to the channels
    color: Rgb,
}

impl RgbComposite {
    pub fn new(
        name: &str,
        channels: [LedDriver; 3],
        ctx: &ControllerContext,
    ) -> Result<Self, LightError> {
        // Effects every channel supports, in red's order
        let effects: Vec<String> = channels[0]
            .triggers()
            .iter()
            .filter(|t| channels[1..].iter().all(|ch| ch.triggers().contains(*t)))
            .cloned()
            .collect();
        let info = LightInfo::new(ctx, name, &effects, COLOR_MODES)?;

        let current_trigger = channels[0].current_trigger().to_string();
        let color = Rgb::from_array([0, 1, 2].map(|i| unscale(channels[i].brightness(), 1.0)));

        info!(
            light = %info.id,
            red = channels[0].name(),
            green = channels[1].name(),
            blue = channels[2].name(),
            "Initializing RGB light"
        );

        Ok(Self {
            info,
            channels,
            brightness: MAX_LEVEL,
            current_trigger,
            color,
        })
    }

    pub fn info(&self) -> &LightInfo {
        &self.info
    }

    /// Overall intensity (0-255)
    pub fn brightness(&self) -> u32 {
        self.brightness
    }

    /// `brightness / 255`
    pub fn scale_factor(&self) -> f64 {
        f64::from(self.brightness) / f64::from(MAX_LEVEL)
    }

    /// On when at least one channel is on
    pub fn is_on(&self) -> bool {
        self.channels.iter().any(LedDriver::is_on)
    }

    pub fn current_trigger(&self) -> &str {
        &self.current_trigger
    }

    /// Set the overall intensity. Takes effect on the next `set_color`.
    pub fn set_brightness(&mut self, value: u32) {
        self.brightness = value.min(MAX_LEVEL);
    }

    /// Write each component, scaled by the overall brightness, to its channel
    pub fn set_color(&mut self, color: Rgb) -> Result<(), HardwareError> {
        let factor = self.scale_factor();
        for (channel, value) in self.channels.iter_mut().zip(color.to_array()) {
            channel.set_brightness(scale(value, factor), true)?;
        }
        self.color = color;
        Ok(())
    }

    /// Color derived from the channels' stored brightness.
    ///
    /// A channel still holding what the last `set_color` wrote reports the
    /// requested component exactly; otherwise the raw value is unscaled.
    pub fn colors(&self) -> Rgb {
        let factor = self.scale_factor();
        let requested = self.color.to_array();
        Rgb::from_array([0, 1, 2].map(|i| {
            let raw = self.channels[i].brightness();
            if scale(requested[i], factor) == raw {
                requested[i]
            } else {
                unscale(raw, factor)
            }
        }))
    }

    pub fn turn_on(&mut self, effect: &str) -> Result<(), HardwareError> {
        for channel in &mut self.channels {
            channel.turn_on(effect)?;
        }
        self.current_trigger = effect.to_string();
        Ok(())
    }

    pub fn turn_off(&mut self) -> Result<(), HardwareError> {
        for channel in &mut self.channels {
            channel.turn_off()?;
        }
        self.current_trigger = TRIGGER_NONE.to_string();
        Ok(())
    }

    pub(super) fn defaults(&self) -> CommandDefaults {
        CommandDefaults {
            brightness: self.brightness,
            color: Some(self.colors()),
        }
    }

    pub(super) fn state(&self) -> StatePayload<'_> {
        StatePayload {
            state: if self.is_on() { "ON" } else { "OFF" },
            brightness: self.brightness,
            trigger: &self.current_trigger,
            color_mode: Some(COLOR_MODE_RGB),
            color: Some(self.colors()),
        }
    }

    pub(super) fn apply(&mut self, command: &LightCommand) -> Result<(), HardwareError> {
        match command {
            LightCommand::TurnOn { effect } => self.turn_on(effect),
            LightCommand::TurnOff => self.turn_off(),
            LightCommand::SetBrightness(value) => {
                self.set_brightness(*value);
                Ok(())
            }
            LightCommand::SetColor(color) => self.set_color(*color),
        }
    }
}
