//! Light registry and connection lifecycle
//!
//! The controller builds one light per selected LED (plus the optional RGB
//! composite), registers each light's command callback on the router, and
//! announces everything whenever the broker accepts a connection.

use std::collections::BTreeMap;
use std::sync::Arc;

use mqttled_sysfs::{HardwareError, LedClass, LedDriver};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::bus::{MessageBus, MessageRouter};
use crate::config::{Config, LedsConfig};
use crate::error::ControllerError;
use crate::light::{sanitize_id, LedAdapter, LightEntity, RgbComposite, SharedLight};
use crate::payload::DeviceInfo;

const CONNECTION_TOPIC: &str = "connection";
const ONLINE: &str = "online";
pub const OFFLINE: &str = "offline";

/// Topic namespace and device metadata, fixed at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerContext {
    /// `{basetopic}/{subtopic}/`
    namespace: String,
    /// Discovery prefix
    discovery: String,
    device: DeviceInfo,
}

impl ControllerContext {
    pub fn new(base_topic: &str, sub_topic: &str, discovery: &str, device: DeviceInfo) -> Self {
        Self {
            namespace: format!(
                "{}/{}/",
                base_topic.trim_end_matches('/'),
                sub_topic.trim_matches('/')
            ),
            discovery: discovery.trim_end_matches('/').to_string(),
            device,
        }
    }

    /// Build from configuration; `hostname` fills the unset optional fields
    pub fn from_config(config: &Config, hostname: &str) -> Self {
        let mqtt = &config.mqtt;
        let model = mqtt.model.clone().unwrap_or_else(|| hostname.to_string());
        let device = DeviceInfo {
            identifiers: vec![format!("mqttled-{model}")],
            name: hostname.to_string(),
            manufacturer: mqtt.manufacturer.clone(),
            model,
        };
        Self::new(
            &mqtt.basetopic,
            mqtt.subtopic.as_deref().unwrap_or(hostname),
            &mqtt.discovery,
            device,
        )
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    pub fn model(&self) -> &str {
        &self.device.model
    }

    /// Retained `online`/`offline` topic
    pub fn connection_topic(&self) -> String {
        format!("{}{}", self.namespace, CONNECTION_TOPIC)
    }

    /// Wildcard covering the whole namespace
    pub fn subscription_filter(&self) -> String {
        format!("{}#", self.namespace)
    }

    /// Discovery config topic of a light
    pub fn discovery_topic(&self, light_id: &str) -> String {
        format!(
            "{}/light/{}/{}/config",
            self.discovery, self.device.name, light_id
        )
    }
}

/// Why the broker refused a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefusalReason {
    ProtocolVersion,
    ClientIdentifier,
    ServerUnavailable,
    BadCredentials,
    NotAuthorized,
}

impl RefusalReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProtocolVersion => "incorrect protocol version",
            Self::ClientIdentifier => "invalid client identifier",
            Self::ServerUnavailable => "server unavailable",
            Self::BadCredentials => "bad username or password",
            Self::NotAuthorized => "not authorized",
        }
    }
}

/// Result of a connection attempt as reported by the bus layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionOutcome {
    Accepted,
    Refused(RefusalReason),
}

/// Resolve the LED names to expose: everything or the include list, minus excludes
pub fn select_leds(leds: &LedsConfig, class: &LedClass) -> Result<Vec<String>, HardwareError> {
    let mut names = if leds.all {
        debug!(path = %class.root().display(), "Including all LEDs");
        class.list()?
    } else {
        leds.include.clone()
    };

    for excluded in &leds.exclude {
        let before = names.len();
        names.retain(|n| n != excluded);
        if names.len() == before {
            warn!(led = %excluded, "Excluded LED not found");
        }
    }
    Ok(names)
}

/// Owner of every light of this host
pub struct Controller {
    ctx: ControllerContext,
    bus: Arc<dyn MessageBus>,
    /// Light id -> light
    lights: BTreeMap<String, SharedLight>,
}

impl Controller {
    /// Build every configured light and register its callback on `router`.
    ///
    /// An LED that cannot be read is logged and skipped. Construction fails
    /// only when the RGB composite cannot be built or no light remains.
    pub fn new(
        ctx: ControllerContext,
        config: &Config,
        bus: Arc<dyn MessageBus>,
        router: &mut MessageRouter,
    ) -> Result<Self, ControllerError> {
        let class = LedClass::new(&config.leds.path);
        let allow_list: &[String] = &config.triggers.triggers;
        if allow_list.is_empty() {
            warn!("Trigger allow-list is empty, no effects will be offered");
        }

        let mut names = select_leds(&config.leds, &class).map_err(ControllerError::ListLeds)?;
        let rgb = config.rgb.channels();
        if let Some((_, channels)) = rgb {
            // Channel LEDs belong to the composite only
            names.retain(|n| !channels.contains(&n.as_str()));
        }

        let mut controller = Self {
            ctx,
            bus,
            lights: BTreeMap::new(),
        };

        for name in &names {
            let driver = match class.open(name, allow_list) {
                Ok(driver) => driver,
                Err(e) => {
                    error!(led = %name, error = %e, "Skipping unreadable LED");
                    continue;
                }
            };
            let adapter = LedAdapter::new(driver, &controller.ctx).map_err(|source| {
                ControllerError::Light {
                    id: sanitize_id(name),
                    source,
                }
            })?;
            controller.insert(adapter.into());
        }

        if let Some((name, channels)) = rgb {
            let open = |channel: &str| -> Result<LedDriver, ControllerError> {
                class
                    .open(channel, allow_list)
                    .map_err(|source| ControllerError::RgbChannel {
                        name: name.to_string(),
                        channel: channel.to_string(),
                        source,
                    })
            };
            let drivers = [open(channels[0])?, open(channels[1])?, open(channels[2])?];
            let rgb = RgbComposite::new(name, drivers, &controller.ctx).map_err(|source| {
                ControllerError::Light {
                    id: sanitize_id(name),
                    source,
                }
            })?;
            controller.insert(rgb.into());
        }

        if controller.lights.is_empty() {
            return Err(ControllerError::NoLights);
        }

        for light in controller.lights.values() {
            LightEntity::register(light, &controller.bus, router);
            let light = light.lock();
            info!(light = %light.id(), topic = %light.topics().command, "Subscribed");
        }
        router.set_fallback(|topic, body| {
            debug!(topic, payload = %String::from_utf8_lossy(body), "Unhandled message");
        });
        debug!(routes = router.route_count(), "Command topics registered");

        Ok(controller)
    }

    fn insert(&mut self, light: LightEntity) {
        let id = light.id().to_string();
        if self.lights.contains_key(&id) {
            warn!(light = %id, "Duplicate light id, ignoring");
            return;
        }
        self.lights.insert(id, Arc::new(Mutex::new(light)));
    }

    pub fn context(&self) -> &ControllerContext {
        &self.ctx
    }

    pub fn light(&self, id: &str) -> Option<&SharedLight> {
        self.lights.get(id)
    }

    /// Light ids in registry order
    pub fn light_ids(&self) -> impl Iterator<Item = &str> {
        self.lights.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    /// Connection hook: on acceptance subscribe, go online and announce
    pub fn on_connect(&self, outcome: ConnectionOutcome) {
        match outcome {
            ConnectionOutcome::Accepted => {
                info!(namespace = %self.ctx.namespace(), "Connected to MQTT broker");
                self.announce();
            }
            ConnectionOutcome::Refused(reason) => {
                error!(reason = reason.as_str(), "Connection refused");
            }
        }
    }

    pub fn on_disconnect(&self) {
        info!("Disconnected from MQTT broker");
    }

    /// Subscribe to the namespace, publish `online`, every discovery
    /// descriptor and then every state
    pub fn announce(&self) {
        let bus = self.bus.as_ref();

        let filter = self.ctx.subscription_filter();
        if let Err(e) = bus.subscribe(&filter) {
            warn!(error = %e, "Subscribe failed");
        }
        if let Err(e) = bus.publish(&self.ctx.connection_topic(), ONLINE.as_bytes(), true) {
            warn!(error = %e, "Failed to publish online status");
        }

        for light in self.lights.values() {
            let light = light.lock();
            let topic = self.ctx.discovery_topic(light.id());
            if let Err(e) = light.publish_discovery(bus, &topic) {
                warn!(light = %light.id(), error = %e, "Failed to publish discovery");
            }
        }
        for light in self.lights.values() {
            let light = light.lock();
            if let Err(e) = light.publish_update(bus) {
                warn!(light = %light.id(), error = %e, "Failed to publish state");
            }
        }
    }

    /// Publish `offline` before a graceful disconnect
    pub fn announce_offline(&self) {
        if let Err(e) = self
            .bus
            .publish(&self.ctx.connection_topic(), OFFLINE.as_bytes(), true)
        {
            warn!(error = %e, "Failed to publish offline status");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn device() -> DeviceInfo {
        DeviceInfo {
            identifiers: vec!["mqttled-ap".to_string()],
            name: "ap".to_string(),
            manufacturer: "OpenWrt".to_string(),
            model: "ap".to_string(),
        }
    }

    #[test]
    fn test_context_topics() {
        let ctx = ControllerContext::new("mqttled/", "ap", "homeassistant", device());
        assert_eq!(ctx.namespace(), "mqttled/ap/");
        assert_eq!(ctx.connection_topic(), "mqttled/ap/connection");
        assert_eq!(ctx.subscription_filter(), "mqttled/ap/#");
        assert_eq!(
            ctx.discovery_topic("green-wlan"),
            "homeassistant/light/ap/green-wlan/config"
        );
    }

    #[test]
    fn test_context_from_config_defaults_to_hostname() {
        let config = Config::from_toml("[mqtt]\nhost = \"b\"\n").unwrap();
        let ctx = ControllerContext::from_config(&config, "router1");
        assert_eq!(ctx.namespace(), "mqttled/router1/");
        assert_eq!(ctx.model(), "router1");
        assert_eq!(ctx.device().identifiers, vec!["mqttled-router1"]);
        assert_eq!(ctx.device().name, "router1");

        let config =
            Config::from_toml("[mqtt]\nhost = \"b\"\nsubtopic = \"leds\"\nmodel = \"C7\"\n").unwrap();
        let ctx = ControllerContext::from_config(&config, "router1");
        assert_eq!(ctx.namespace(), "mqttled/leds/");
        assert_eq!(ctx.model(), "C7");
        assert_eq!(ctx.device().name, "router1");
    }

    #[test]
    fn test_select_all_minus_exclude() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a", "b", "c"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        let leds = LedsConfig {
            all: true,
            include: vec!["ignored".to_string()],
            exclude: vec!["b".to_string(), "missing".to_string()],
            path: dir.path().to_path_buf(),
        };
        let class = LedClass::new(dir.path());
        assert_eq!(select_leds(&leds, &class).unwrap(), vec!["a", "c"]);
    }

    #[test]
    fn test_select_include_list() {
        let leds = LedsConfig {
            all: false,
            include: vec!["x".to_string(), "y".to_string()],
            exclude: vec!["y".to_string()],
            path: "/nonexistent".into(),
        };
        let class = LedClass::new("/nonexistent");
        assert_eq!(select_leds(&leds, &class).unwrap(), vec!["x"]);
    }

    #[test]
    fn test_refusal_reasons() {
        assert_eq!(RefusalReason::BadCredentials.as_str(), "bad username or password");
        assert_eq!(RefusalReason::NotAuthorized.as_str(), "not authorized");
    }
}
