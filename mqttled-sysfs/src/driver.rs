//! LED class device driver
//!
//! Owns one `/sys/class/leds/<name>` directory. Hardware is read once at
//! construction; afterwards the in-memory mirror is kept in sync purely by
//! this driver's own writes.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::HardwareError;
use crate::trigger::{TriggerCatalog, TRIGGER_NONE};

/// Device attribute files
const BRIGHTNESS_FILE: &str = "brightness";
const TRIGGER_FILE: &str = "trigger";

/// On/off state derived from the active trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedState {
    On,
    Off,
}

impl LedState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }

    fn from_trigger(trigger: &str) -> Self {
        if trigger == TRIGGER_NONE {
            Self::Off
        } else {
            Self::On
        }
    }
}

/// One physical LED
#[derive(Debug)]
pub struct LedDriver {
    /// Kernel name (e.g., "tp-link:green:wlan")
    name: String,
    /// Device directory
    path: PathBuf,
    /// Last brightness read at init or written with `persist`
    brightness: u32,
    current_trigger: String,
    triggers: Vec<String>,
}

impl LedDriver {
    /// Open an LED device directory and read its current state.
    ///
    /// Fails when either attribute file is unreadable or unparsable.
    pub fn open<S: AsRef<str>>(
        name: &str,
        path: impl Into<PathBuf>,
        allow_list: &[S],
    ) -> Result<Self, HardwareError> {
        let path = path.into();

        let brightness_path = path.join(BRIGHTNESS_FILE);
        let raw = read_attr(&brightness_path)?;
        let brightness = raw.parse::<u32>().map_err(|_| HardwareError::Parse {
            path: brightness_path,
            value: raw,
        })?;

        let catalog = TriggerCatalog::parse(&read_attr(&path.join(TRIGGER_FILE))?, allow_list)?;

        debug!(
            led = name,
            brightness,
            trigger = %catalog.current,
            triggers = ?catalog.allowed,
            "Opened LED"
        );

        Ok(Self {
            name: name.to_string(),
            path,
            brightness,
            current_trigger: catalog.current,
            triggers: catalog.allowed,
        })
    }

    /// Get the kernel LED name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the device directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored brightness (survives `turn_off`)
    pub fn brightness(&self) -> u32 {
        self.brightness
    }

    /// Brightness the hardware is showing: 0 while off, stored value otherwise
    pub fn effective_brightness(&self) -> u32 {
        match self.state() {
            LedState::On => self.brightness,
            LedState::Off => 0,
        }
    }

    pub fn current_trigger(&self) -> &str {
        &self.current_trigger
    }

    /// Allowed triggers offered by this LED
    pub fn triggers(&self) -> &[String] {
        &self.triggers
    }

    pub fn state(&self) -> LedState {
        LedState::from_trigger(&self.current_trigger)
    }

    pub fn is_on(&self) -> bool {
        self.state() == LedState::On
    }

    /// Activate a trigger. Brightness is left alone.
    pub fn turn_on(&mut self, trigger: &str) -> Result<(), HardwareError> {
        self.write_attr(TRIGGER_FILE, trigger)?;
        self.current_trigger = trigger.to_string();
        Ok(())
    }

    /// Select the `none` trigger and darken the LED.
    ///
    /// The stored brightness is kept for the next `turn_on`.
    pub fn turn_off(&mut self) -> Result<(), HardwareError> {
        self.write_attr(TRIGGER_FILE, TRIGGER_NONE)?;
        self.current_trigger = TRIGGER_NONE.to_string();
        self.set_brightness(0, false)
    }

    /// Write a raw brightness value; `persist` also updates the stored value.
    pub fn set_brightness(&mut self, value: u32, persist: bool) -> Result<(), HardwareError> {
        self.write_attr(BRIGHTNESS_FILE, &value.to_string())?;
        if persist {
            self.brightness = value;
        }
        Ok(())
    }

    /// Write a value to a device attribute. The file must already exist.
    fn write_attr(&self, attr: &str, value: &str) -> Result<(), HardwareError> {
        let path = self.path.join(attr);
        trace!(led = %self.name, attr, value, "sysfs write");
        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| HardwareError::write(&path, e))?;
        file.write_all(value.as_bytes())
            .map_err(|e| HardwareError::write(&path, e))
    }
}

fn read_attr(path: &Path) -> Result<String, HardwareError> {
    fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|e| HardwareError::read(path, e))
}
