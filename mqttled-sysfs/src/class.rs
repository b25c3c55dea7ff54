//! LED class directory (`/sys/class/leds`)

use std::fs;
use std::path::{Path, PathBuf};

use crate::driver::LedDriver;
use crate::error::HardwareError;

/// Default location of the LED class directory
pub const DEFAULT_LED_CLASS_DIR: &str = "/sys/class/leds";

/// Handle on an LED class directory
#[derive(Debug, Clone)]
pub struct LedClass {
    root: PathBuf,
}

impl LedClass {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names of all LEDs in the class directory, sorted
    pub fn list(&self) -> Result<Vec<String>, HardwareError> {
        let entries = fs::read_dir(&self.root).map_err(|e| HardwareError::read(&self.root, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| HardwareError::read(&self.root, e))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    /// Device directory of the named LED
    pub fn device(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Open the named LED
    pub fn open<S: AsRef<str>>(
        &self,
        name: &str,
        allow_list: &[S],
    ) -> Result<LedDriver, HardwareError> {
        LedDriver::open(name, self.device(name), allow_list)
    }
}

impl Default for LedClass {
    fn default() -> Self {
        Self::new(DEFAULT_LED_CLASS_DIR)
    }
}
