//! Single LED light

use mqttled_sysfs::{HardwareError, LedDriver};
use tracing::debug;

use super::LightInfo;
use crate::command::{CommandDefaults, LightCommand};
use crate::controller::ControllerContext;
use crate::error::LightError;
use crate::payload::StatePayload;

/// One LED exposed as a brightness + effect light
#[derive(Debug)]
pub struct LedAdapter {
    info: LightInfo,
    driver: LedDriver,
}

impl LedAdapter {
    pub fn new(driver: LedDriver, ctx: &ControllerContext) -> Result<Self, LightError> {
        let info = LightInfo::new(ctx, driver.name(), driver.triggers(), &[])?;
        Ok(Self { info, driver })
    }

    pub fn info(&self) -> &LightInfo {
        &self.info
    }

    pub fn driver(&self) -> &LedDriver {
        &self.driver
    }

    pub(super) fn defaults(&self) -> CommandDefaults {
        CommandDefaults {
            brightness: self.driver.brightness(),
            color: None,
        }
    }

    pub(super) fn state(&self) -> StatePayload<'_> {
        StatePayload {
            state: self.driver.state().as_str(),
            brightness: self.driver.effective_brightness(),
            trigger: self.driver.current_trigger(),
            color_mode: None,
            color: None,
        }
    }

    pub(super) fn apply(&mut self, command: &LightCommand) -> Result<(), HardwareError> {
        match command {
            LightCommand::TurnOn { effect } => self.driver.turn_on(effect),
            LightCommand::TurnOff => self.driver.turn_off(),
            LightCommand::SetBrightness(value) => self.driver.set_brightness(*value, true),
            LightCommand::SetColor(_) => {
                debug!(light = %self.info.id, "Ignoring color for single LED");
                Ok(())
            }
        }
    }
}
