//! Linux LED class access
//!
//! Reads and writes the `brightness` and `trigger` attributes of devices
//! under `/sys/class/leds`, keeping an in-memory mirror of each LED.

pub mod class;
pub mod driver;
pub mod error;
pub mod trigger;

pub use class::{LedClass, DEFAULT_LED_CLASS_DIR};
pub use driver::{LedDriver, LedState};
pub use error::HardwareError;
pub use trigger::{TriggerCatalog, TRIGGER_DEFAULT_ON, TRIGGER_NONE};
