//! Trigger catalog parsing
//!
//! The kernel exposes `/sys/class/leds/<name>/trigger` as a space separated
//! list of trigger names with the active one in brackets:
//!
//! ```text
//! none rc-feedback kbd-scrolllock [heartbeat] timer default-on
//! ```

use crate::error::HardwareError;

/// Trigger that leaves the LED under manual control (the "off" trigger)
pub const TRIGGER_NONE: &str = "none";

/// Trigger used when a command does not name one
pub const TRIGGER_DEFAULT_ON: &str = "default-on";

/// Parsed content of a trigger file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerCatalog {
    /// Active trigger (brackets stripped)
    pub current: String,
    /// Triggers offered by the hardware that are also in the allow-list, in file order
    pub allowed: Vec<String>,
}

impl TriggerCatalog {
    /// Parse a trigger descriptor against an allow-list.
    ///
    /// Every token whose bracket-stripped form is in `allow_list` is kept, in
    /// file order and without deduplication. When no token is bracketed the
    /// current trigger defaults to [`TRIGGER_NONE`]. An empty descriptor is
    /// rejected as [`HardwareError::InvalidState`].
    pub fn parse<S: AsRef<str>>(descriptor: &str, allow_list: &[S]) -> Result<Self, HardwareError> {
        if descriptor.trim().is_empty() {
            return Err(HardwareError::InvalidState(
                "empty trigger descriptor".to_string(),
            ));
        }

        let mut current = None;
        let mut allowed = Vec::new();

        for token in descriptor.split_whitespace() {
            let name = match token.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
                Some(active) => {
                    current = Some(active);
                    active
                }
                None => token,
            };
            if allow_list.iter().any(|a| a.as_ref() == name) {
                allowed.push(name.to_string());
            }
        }

        Ok(Self {
            current: current.unwrap_or(TRIGGER_NONE).to_string(),
            allowed,
        })
    }

    /// True when the active trigger is [`TRIGGER_NONE`]
    pub fn is_off(&self) -> bool {
        self.current == TRIGGER_NONE
    }
}
