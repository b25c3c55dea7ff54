//! rumqttc-backed message bus

use std::path::Path;
use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectReturnCode, LastWill, MqttOptions, QoS, TlsConfiguration, Transport,
};

use crate::bus::MessageBus;
use crate::config::{ConfigError, MqttConfig};
use crate::controller::{ConnectionOutcome, RefusalReason, OFFLINE};
use crate::error::BusError;

/// QoS for every publish and subscription
pub const QOS: QoS = QoS::AtLeastOnce;

/// [`MessageBus`] over an rumqttc client.
///
/// Publishes are queued without blocking; the event loop task sends them.
#[derive(Clone)]
pub struct MqttBus {
    client: AsyncClient,
}

impl MqttBus {
    pub fn new(client: AsyncClient) -> Self {
        Self { client }
    }
}

impl MessageBus for MqttBus {
    fn publish(&self, topic: &str, payload: &[u8], retain: bool) -> Result<(), BusError> {
        self.client
            .try_publish(topic, QOS, retain, payload.to_vec())
            .map_err(|e| BusError::Publish {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }

    fn subscribe(&self, filter: &str) -> Result<(), BusError> {
        self.client
            .try_subscribe(filter, QOS)
            .map_err(|e| BusError::Subscribe {
                filter: filter.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Map a CONNACK code to the controller's view of it
pub fn connection_outcome(code: ConnectReturnCode) -> ConnectionOutcome {
    let reason = match code {
        ConnectReturnCode::Success => return ConnectionOutcome::Accepted,
        ConnectReturnCode::RefusedProtocolVersion => RefusalReason::ProtocolVersion,
        ConnectReturnCode::BadClientId => RefusalReason::ClientIdentifier,
        ConnectReturnCode::ServiceUnavailable => RefusalReason::ServerUnavailable,
        ConnectReturnCode::BadUserNamePassword => RefusalReason::BadCredentials,
        ConnectReturnCode::NotAuthorized => RefusalReason::NotAuthorized,
    };
    ConnectionOutcome::Refused(reason)
}

/// Broker options: credentials, TLS and a retained `offline` last will
pub fn mqtt_options(
    config: &MqttConfig,
    client_id: &str,
    will_topic: &str,
) -> Result<MqttOptions, ConfigError> {
    let mut options = MqttOptions::new(client_id, config.host.as_str(), config.port);
    options.set_keep_alive(Duration::from_secs(config.keep_alive.max(5)));
    options.set_last_will(LastWill::new(will_topic, OFFLINE, QOS, true));

    if let Some(username) = &config.username {
        options.set_credentials(username.as_str(), config.password.as_deref().unwrap_or(""));
    }

    if let Some(cafile) = &config.cafile {
        let ca = read_pem(cafile)?;
        let client_auth = match (&config.certfile, &config.keyfile) {
            (Some(cert), Some(key)) => Some((read_pem(cert)?, read_pem(key)?)),
            _ => None,
        };
        options.set_transport(Transport::tls_with_config(TlsConfiguration::Simple {
            ca,
            alpn: None,
            client_auth,
        }));
    }

    Ok(options)
}

fn read_pem(path: &Path) -> Result<Vec<u8>, ConfigError> {
    std::fs::read(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}
