//! Message bus handle and topic-keyed dispatch
//!
//! The core never talks to an MQTT client directly. It publishes through
//! [`MessageBus`] and receives messages through callbacks registered on a
//! [`MessageRouter`], one per command topic.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::warn;

use crate::error::BusError;

/// Publish/subscribe handle of an already-connected bus
pub trait MessageBus: Send + Sync {
    /// Queue a message for delivery
    fn publish(&self, topic: &str, payload: &[u8], retain: bool) -> Result<(), BusError>;

    /// Subscribe to a topic filter
    fn subscribe(&self, filter: &str) -> Result<(), BusError>;
}

/// Callback invoked with `(topic, payload)`
pub type MessageHandler = Box<dyn FnMut(&str, &[u8]) + Send>;

/// Topic-keyed callback table
///
/// Exactly one callback runs per dispatched message: the one registered for
/// the exact topic, otherwise the fallback.
#[derive(Default)]
pub struct MessageRouter {
    routes: HashMap<String, MessageHandler>,
    fallback: Option<MessageHandler>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the callback for an exact topic, replacing any previous one
    pub fn add_route<F>(&mut self, topic: impl Into<String>, handler: F)
    where
        F: FnMut(&str, &[u8]) + Send + 'static,
    {
        let topic = topic.into();
        if self.routes.contains_key(&topic) {
            warn!(topic = %topic, "Replacing existing message callback");
        }
        self.routes.insert(topic, Box::new(handler));
    }

    /// Register the callback for topics without a route
    pub fn set_fallback<F>(&mut self, handler: F)
    where
        F: FnMut(&str, &[u8]) + Send + 'static,
    {
        self.fallback = Some(Box::new(handler));
    }

    /// Deliver one message. Returns true if a topic route handled it.
    pub fn dispatch(&mut self, topic: &str, payload: &[u8]) -> bool {
        if let Some(handler) = self.routes.get_mut(topic) {
            handler(topic, payload);
            return true;
        }
        if let Some(fallback) = self.fallback.as_mut() {
            fallback(topic, payload);
        }
        false
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}

/// A message captured by [`MemoryBus`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: Vec<u8>,
    pub retain: bool,
}

impl Published {
    pub fn payload_str(&self) -> &str {
        std::str::from_utf8(&self.payload).unwrap_or("<binary>")
    }

    /// Payload parsed as JSON
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

/// In-memory bus that records everything instead of sending it
///
/// Used by `--check` to show what would be announced, and by tests.
#[derive(Debug, Default)]
pub struct MemoryBus {
    published: Mutex<Vec<Published>>,
    subscriptions: Mutex<Vec<String>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything published so far
    pub fn take(&self) -> Vec<Published> {
        std::mem::take(&mut *self.published.lock())
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().clone()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().clone()
    }
}

impl MessageBus for MemoryBus {
    fn publish(&self, topic: &str, payload: &[u8], retain: bool) -> Result<(), BusError> {
        self.published.lock().push(Published {
            topic: topic.to_string(),
            payload: payload.to_vec(),
            retain,
        });
        Ok(())
    }

    fn subscribe(&self, filter: &str) -> Result<(), BusError> {
        self.subscriptions.lock().push(filter.to_string());
        Ok(())
    }
}
