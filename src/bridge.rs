//! MQTT event loop driving the controller
//!
//! One task polls the rumqttc event loop and hands every incoming message to
//! the router, so light callbacks never run concurrently.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rumqttc::{AsyncClient, ConnectionError, Event, EventLoop, Outgoing, Packet};
use tracing::{debug, error, info, warn};

use mqttled::mqtt::{connection_outcome, mqtt_options};
use mqttled::{Config, Controller, ControllerContext, MessageBus, MessageRouter, MqttBus};

/// Request queue size; connect-time announcements are queued before the
/// event loop gets to send any of them
const REQUEST_CAPACITY: usize = 512;

const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

pub struct Bridge {
    client: AsyncClient,
    eventloop: EventLoop,
    controller: Controller,
    router: MessageRouter,
}

impl Bridge {
    pub fn new(config: &Config, hostname: &str) -> Result<Self> {
        let ctx = ControllerContext::from_config(config, hostname);
        let client_id = config
            .mqtt
            .client_id
            .clone()
            .unwrap_or_else(|| format!("mqttled-{hostname}"));
        let options = mqtt_options(&config.mqtt, &client_id, &ctx.connection_topic())?;

        info!(
            host = %config.mqtt.host,
            port = config.mqtt.port,
            tls = config.mqtt.cafile.is_some(),
            client_id = %client_id,
            "MQTT broker"
        );

        let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        if let Some(interface) = &config.mqtt.interface {
            bind_interface(&mut eventloop, interface);
        }

        let bus: Arc<dyn MessageBus> = Arc::new(MqttBus::new(client.clone()));
        let mut router = MessageRouter::new();
        let controller =
            Controller::new(ctx, config, bus, &mut router).context("Failed to set up LEDs")?;

        Ok(Self {
            client,
            eventloop,
            controller,
            router,
        })
    }

    /// Run until `shutdown` resolves, then go offline and disconnect
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> Result<()> {
        tokio::pin!(shutdown);
        info!(lights = self.controller.len(), "MQTT LED control started");

        loop {
            let event = tokio::select! {
                _ = &mut shutdown => break,
                event = self.eventloop.poll() => event,
            };

            match event {
                Ok(event) => self.handle_event(event),
                Err(ConnectionError::ConnectionRefused(code)) => {
                    self.controller.on_connect(connection_outcome(code));
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
                Err(e) => {
                    warn!(error = %e, "MQTT connection error");
                    self.controller.on_disconnect();
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }

        self.shutdown().await
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Incoming(Packet::ConnAck(ack)) => {
                self.controller.on_connect(connection_outcome(ack.code));
            }
            Event::Incoming(Packet::Publish(publish)) => {
                self.router.dispatch(&publish.topic, &publish.payload);
            }
            Event::Incoming(Packet::Disconnect) => self.controller.on_disconnect(),
            Event::Incoming(packet) => debug!(?packet, "MQTT incoming"),
            Event::Outgoing(_) => {}
        }
    }

    async fn shutdown(mut self) -> Result<()> {
        info!("Shutting down");
        self.controller.announce_offline();
        self.client
            .disconnect()
            .await
            .context("Failed to queue MQTT disconnect")?;

        let drain = async {
            loop {
                match self.eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        };
        if tokio::time::timeout(DRAIN_TIMEOUT, drain).await.is_err() {
            warn!("Timed out flushing MQTT queue");
        }

        info!("MQTT LED control stopped");
        Ok(())
    }
}

#[cfg(target_os = "linux")]
fn bind_interface(eventloop: &mut EventLoop, interface: &str) {
    let mut network = rumqttc::NetworkOptions::new();
    network.set_bind_device(interface);
    eventloop.set_network_options(network);
    info!(interface, "Binding MQTT connection to interface");
}

#[cfg(not(target_os = "linux"))]
fn bind_interface(_eventloop: &mut EventLoop, interface: &str) {
    warn!(interface, "Interface binding is only supported on Linux, ignoring");
}

/// Resolve on SIGINT or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Stopped by SIGINT"),
        _ = terminate => info!("Stopped by SIGTERM"),
    }
}
