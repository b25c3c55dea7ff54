//! Light entities: one protocol-facing light per single LED or RGB composite

mod rgb;
mod single;

pub use rgb::RgbComposite;
pub use single::LedAdapter;

use std::sync::Arc;

use mqttled_sysfs::HardwareError;
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::bus::{MessageBus, MessageRouter};
use crate::command::{CommandDefaults, LightCommand};
use crate::controller::ControllerContext;
use crate::error::{BusError, CommandError, LightError};
use crate::payload::{CommandPayload, DiscoveryPayload, StatePayload, BRIGHTNESS_SCALE};

/// A light shared between its topic callback and the controller
pub type SharedLight = Arc<Mutex<LightEntity>>;

/// Replace every run of non-alphanumeric characters with `-`
pub fn sanitize_id(name: &str) -> String {
    let mut id = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            id.push(c);
            in_run = false;
        } else if !in_run {
            id.push('-');
            in_run = true;
        }
    }
    id
}

/// Topics of one light
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightTopics {
    /// Inbound commands (`{ns}{id}/set`)
    pub command: String,
    /// Outbound retained state (`{ns}{id}/state`)
    pub state: String,
    /// Bridge availability (`{ns}connection`)
    pub availability: String,
}

impl LightTopics {
    pub fn new(ctx: &ControllerContext, id: &str) -> Self {
        Self {
            command: format!("{}{}/set", ctx.namespace(), id),
            state: format!("{}{}/state", ctx.namespace(), id),
            availability: ctx.connection_topic(),
        }
    }
}

/// Identity shared by both light variants; immutable after construction
#[derive(Debug, Clone)]
pub struct LightInfo {
    pub id: String,
    pub topics: LightTopics,
    /// Serialized discovery descriptor
    pub discovery: String,
}

impl LightInfo {
    fn new(
        ctx: &ControllerContext,
        name: &str,
        effects: &[String],
        color_modes: &[&str],
    ) -> Result<Self, LightError> {
        let id = sanitize_id(name);
        let topics = LightTopics::new(ctx, &id);
        let payload = DiscoveryPayload {
            availability_topic: &topics.availability,
            state_topic: &topics.state,
            command_topic: &topics.command,
            unique_id: format!("{}_{}", ctx.model(), id),
            brightness: true,
            brightness_scale: BRIGHTNESS_SCALE,
            color_mode: (!color_modes.is_empty()).then_some(true),
            supported_color_modes: color_modes,
            effect: true,
            effect_list: effects,
            name: &id,
            schema: "json",
            device: ctx.device(),
            json_attributes_topic: &topics.state,
        };
        let discovery = serde_json::to_string(&payload).map_err(LightError::Encode)?;

        Ok(Self {
            id,
            topics,
            discovery,
        })
    }
}

/// A controllable light, either a single LED or an RGB composite
#[derive(Debug)]
pub enum LightEntity {
    Single(LedAdapter),
    Rgb(RgbComposite),
}

impl From<LedAdapter> for LightEntity {
    fn from(adapter: LedAdapter) -> Self {
        LightEntity::Single(adapter)
    }
}

impl From<RgbComposite> for LightEntity {
    fn from(rgb: RgbComposite) -> Self {
        LightEntity::Rgb(rgb)
    }
}

impl LightEntity {
    fn info(&self) -> &LightInfo {
        match self {
            LightEntity::Single(l) => l.info(),
            LightEntity::Rgb(l) => l.info(),
        }
    }

    pub fn id(&self) -> &str {
        &self.info().id
    }

    pub fn topics(&self) -> &LightTopics {
        &self.info().topics
    }

    pub fn discovery_payload(&self) -> &str {
        &self.info().discovery
    }

    pub fn is_on(&self) -> bool {
        match self {
            LightEntity::Single(l) => l.driver().is_on(),
            LightEntity::Rgb(l) => l.is_on(),
        }
    }

    fn state(&self) -> StatePayload<'_> {
        match self {
            LightEntity::Single(l) => l.state(),
            LightEntity::Rgb(l) => l.state(),
        }
    }

    fn defaults(&self) -> CommandDefaults {
        match self {
            LightEntity::Single(l) => l.defaults(),
            LightEntity::Rgb(l) => l.defaults(),
        }
    }

    fn apply(&mut self, command: &LightCommand) -> Result<(), HardwareError> {
        match self {
            LightEntity::Single(l) => l.apply(command),
            LightEntity::Rgb(l) => l.apply(command),
        }
    }

    /// Current state as JSON
    pub fn state_json(&self) -> Result<String, LightError> {
        serde_json::to_string(&self.state()).map_err(LightError::Encode)
    }

    /// Publish the current state (retained)
    pub fn publish_update(&self, bus: &dyn MessageBus) -> Result<(), LightError> {
        let state = self.state_json()?;
        bus.publish(&self.topics().state, state.as_bytes(), true)?;
        Ok(())
    }

    /// Publish the discovery descriptor (retained) to `topic`
    pub fn publish_discovery(&self, bus: &dyn MessageBus, topic: &str) -> Result<(), BusError> {
        bus.publish(topic, self.discovery_payload().as_bytes(), true)
    }

    /// Apply one command message and publish the resulting state.
    ///
    /// Undecodable messages, messages without `state` and unknown states are
    /// rejected before any hardware access and nothing is published. A
    /// hardware fault stops the remaining steps; the last known state is
    /// still published before the fault is returned.
    pub fn handle_message(&mut self, bus: &dyn MessageBus, body: &[u8]) -> Result<(), LightError> {
        let commands = CommandPayload::decode(body)?.into_commands(&self.defaults())?;

        let applied = commands.iter().try_for_each(|cmd| self.apply(cmd));
        self.publish_update(bus)?;
        applied.map_err(LightError::from)
    }

    /// Topic callback body: handle a message and log the outcome
    pub fn on_message(&mut self, bus: &dyn MessageBus, topic: &str, body: &[u8]) {
        debug!(topic, payload = %String::from_utf8_lossy(body), "Command received");

        match self.handle_message(bus, body) {
            Ok(()) => {}
            Err(LightError::Command(CommandError::UnknownCommand)) => {
                error!(light = %self.id(), "Unknown command message");
            }
            Err(LightError::Command(CommandError::UnknownState(state))) => {
                warn!(light = %self.id(), state = %state, "Unknown state");
            }
            Err(LightError::Command(e)) => {
                warn!(light = %self.id(), error = %e, "Dropping command");
            }
            Err(e) => {
                error!(light = %self.id(), error = %e, "Command failed");
            }
        }
    }

    /// Register this light's command-topic callback
    pub fn register(light: &SharedLight, bus: &Arc<dyn MessageBus>, router: &mut MessageRouter) {
        let topic = light.lock().topics().command.clone();
        let light = Arc::clone(light);
        let bus = Arc::clone(bus);
        router.add_route(topic, move |topic, body| {
            light.lock().on_message(bus.as_ref(), topic, body);
        });
    }
}
