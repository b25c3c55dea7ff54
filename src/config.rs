//! Configuration file
//!
//! TOML with the sections `[mqtt]`, `[leds]`, `[triggers]` and `[rgb]`:
//!
//! ```toml
//! [mqtt]
//! host = "192.168.1.5"
//! basetopic = "mqttled"
//!
//! [leds]
//! all = true
//! exclude = ["mmc0::"]
//!
//! [triggers]
//! triggers = ["default-on", "heartbeat", "timer", "netdev"]
//!
//! [rgb]
//! enablergb = true
//! name = "status"
//! red = "rgb:red"
//! green = "rgb:green"
//! blue = "rgb:blue"
//! ```

use std::io;
use std::path::{Path, PathBuf};

use mqttled_sysfs::DEFAULT_LED_CLASS_DIR;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default config file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/mqttled/mqttled.toml";

/// Errors from loading or validating the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Broker connection and topic layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Network device to bind the connection to
    #[serde(default)]
    pub interface: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// CA certificate; enables TLS
    #[serde(default)]
    pub cafile: Option<PathBuf>,
    #[serde(default)]
    pub certfile: Option<PathBuf>,
    #[serde(default)]
    pub keyfile: Option<PathBuf>,
    /// Discovery prefix
    #[serde(default = "default_discovery")]
    pub discovery: String,
    #[serde(default = "default_basetopic")]
    pub basetopic: String,
    /// Defaults to the host name
    #[serde(default)]
    pub subtopic: Option<String>,
    /// Defaults to the host name
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_manufacturer")]
    pub manufacturer: String,
    /// Defaults to `mqttled-{hostname}`
    #[serde(default)]
    pub client_id: Option<String>,
    /// Keep-alive interval in seconds
    #[serde(default = "default_keep_alive")]
    pub keep_alive: u64,
}

fn default_port() -> u16 {
    1883
}
fn default_discovery() -> String {
    "homeassistant".to_string()
}
fn default_basetopic() -> String {
    "mqttled".to_string()
}
fn default_manufacturer() -> String {
    "OpenWrt".to_string()
}
fn default_keep_alive() -> u64 {
    30
}

/// Which LEDs to expose
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedsConfig {
    /// Expose every LED in the class directory (minus `exclude`)
    #[serde(default = "default_true", alias = "includeall")]
    pub all: bool,
    /// LEDs to expose when `all` is false
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    /// LED class directory
    #[serde(default = "default_led_path")]
    pub path: PathBuf,
}

fn default_true() -> bool {
    true
}
fn default_led_path() -> PathBuf {
    PathBuf::from(DEFAULT_LED_CLASS_DIR)
}

impl Default for LedsConfig {
    fn default() -> Self {
        Self {
            all: true,
            include: Vec::new(),
            exclude: Vec::new(),
            path: default_led_path(),
        }
    }
}

/// Trigger allow-list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggersConfig {
    #[serde(default)]
    pub triggers: Vec<String>,
}

/// Optional RGB composite
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RgbConfig {
    #[serde(default)]
    pub enablergb: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub red: Option<String>,
    #[serde(default)]
    pub green: Option<String>,
    #[serde(default)]
    pub blue: Option<String>,
}

impl RgbConfig {
    /// Name and red/green/blue LED names, when enabled and complete
    pub fn channels(&self) -> Option<(&str, [&str; 3])> {
        if !self.enablergb {
            return None;
        }
        Some((
            self.name.as_deref()?,
            [
                self.red.as_deref()?,
                self.green.as_deref()?,
                self.blue.as_deref()?,
            ],
        ))
    }
}

/// Complete bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub leds: LedsConfig,
    #[serde(default)]
    pub triggers: TriggersConfig,
    #[serde(default)]
    pub rgb: RgbConfig,
}

impl Config {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the constraints serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mqtt = &self.mqtt;
        if mqtt.host.trim().is_empty() {
            return Err(invalid("mqtt.host is empty"));
        }
        if mqtt.port == 0 {
            return Err(invalid("mqtt.port must be 1-65535"));
        }

        for (key, file) in [
            ("cafile", &mqtt.cafile),
            ("certfile", &mqtt.certfile),
            ("keyfile", &mqtt.keyfile),
        ] {
            if let Some(path) = file {
                if !path.exists() {
                    return Err(invalid(format!("mqtt.{key} {} does not exist", path.display())));
                }
            }
        }
        if mqtt.certfile.is_some() != mqtt.keyfile.is_some() {
            return Err(invalid("mqtt.certfile and mqtt.keyfile must be set together"));
        }

        check_topic_segment("mqtt.discovery", &mqtt.discovery)?;
        check_topic_segment("mqtt.basetopic", &mqtt.basetopic)?;
        if let Some(sub) = &mqtt.subtopic {
            check_topic_segment("mqtt.subtopic", sub)?;
        }

        if !self.leds.all && self.leds.include.is_empty() {
            return Err(invalid("leds.include is empty and leds.all is false"));
        }

        if self.rgb.enablergb {
            let Some((name, channels)) = self.rgb.channels() else {
                return Err(invalid("rgb.enablergb requires name, red, green and blue"));
            };
            if name.trim().is_empty() {
                return Err(invalid("rgb.name is empty"));
            }
            if channels[0] == channels[1] || channels[1] == channels[2] || channels[0] == channels[2]
            {
                return Err(invalid("rgb channels must be three different LEDs"));
            }
        }

        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

/// Topic segments may contain `/` but no wildcards and must not be empty
fn check_topic_segment(key: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim_matches('/');
    if trimmed.is_empty() {
        return Err(invalid(format!("{key} is empty")));
    }
    if trimmed.contains(['+', '#']) {
        return Err(invalid(format!("{key} contains an MQTT wildcard: {value:?}")));
    }
    Ok(())
}

/// Host name of this machine
pub fn host_name() -> io::Result<String> {
    let name = nix::unistd::gethostname()?;
    Ok(name.to_string_lossy().into_owned())
}
