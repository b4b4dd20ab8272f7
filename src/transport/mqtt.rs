//! MQTT transport adapter built on rumqttc.
//!
//! Owns the broker connection: TLS options, the config/actuators
//! subscriptions, and the background event loop that forwards ConnAck and
//! inbound publishes into the hub's event channel. Reconnection policy is
//! whatever rumqttc's event loop provides; the hub adds none of its own.

use crate::config::HubConfig;
use crate::protocol::TopicBuilder;
use crate::transport::{Transport, TransportEvent};
use async_trait::async_trait;
use rumqttc::{
    AsyncClient, Event, MqttOptions, Packet, QoS, TlsConfiguration,
    Transport as RumqttcTransport,
};
use std::sync::Mutex as StdMutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// MQTT transport errors
#[derive(Debug, Error)]
pub enum MqttError {
    #[error("Failed to read TLS material: {0}")]
    TlsMaterial(#[from] std::io::Error),
    #[error("MQTT request failed: {0}")]
    Client(#[from] rumqttc::ClientError),
}

/// Build rumqttc options from the hub configuration: TLS with mandatory peer
/// verification against the configured CA, client-certificate auth, and the
/// configured keep-alive.
pub fn configure_mqtt_options(config: &HubConfig) -> Result<MqttOptions, MqttError> {
    // Unique client id per connection attempt to avoid broker session clashes.
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let client_id = format!("hub-{}-{timestamp}", config.hub_id);

    let mut options = MqttOptions::new(client_id, &config.host, config.port);
    options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));

    let ca = std::fs::read(&config.tls.ca_path)?;
    let cert = std::fs::read(&config.tls.cert_path)?;
    let key = std::fs::read(&config.tls.key_path)?;
    options.set_transport(RumqttcTransport::Tls(TlsConfiguration::Simple {
        ca,
        alpn: None,
        client_auth: Some((cert, key)),
    }));

    Ok(options)
}

/// Broker connection plus the background task forwarding inbound events.
pub struct MqttTransport {
    client: AsyncClient,
    shutdown_tx: watch::Sender<bool>,
    event_loop_handle: StdMutex<Option<JoinHandle<()>>>,
}

impl MqttTransport {
    /// Connect to the broker, subscribe to the hub's `config` and `actuators`
    /// topics, and start forwarding inbound events to `events`.
    pub async fn connect(
        config: &HubConfig,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Self, MqttError> {
        let options = configure_mqtt_options(config)?;
        let (client, mut event_loop) = AsyncClient::new(options, 10);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let hub_id = config.hub_id.clone();
        let handle = tokio::spawn(async move {
            info!(%hub_id, "starting MQTT event loop");
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            info!("shutdown signal received, stopping MQTT event loop");
                            break;
                        }
                    }
                    event = event_loop.poll() => match event {
                        Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                            info!(code = ?ack.code, "connected");
                            if events.send(TransportEvent::Connected).await.is_err() {
                                break;
                            }
                        }
                        Ok(Event::Incoming(Packet::Publish(publish))) => {
                            debug!(topic = %publish.topic, "received MQTT message");
                            let message = TransportEvent::Message {
                                topic: publish.topic.clone(),
                                payload: publish.payload.to_vec(),
                            };
                            if events.send(message).await.is_err() {
                                break;
                            }
                        }
                        Ok(event) => {
                            debug!(?event, "mqtt event");
                        }
                        Err(e) => {
                            // rumqttc retries the connection on the next poll;
                            // pace the loop so errors don't spin.
                            error!(error = %e, "MQTT event loop error");
                            tokio::time::sleep(Duration::from_millis(250)).await;
                        }
                    }
                }
            }
            info!("MQTT event loop stopped");
        });

        client
            .subscribe(
                TopicBuilder::config(&config.owner_id, &config.hub_id),
                QoS::AtMostOnce,
            )
            .await?;
        client
            .subscribe(
                TopicBuilder::actuators(&config.owner_id, &config.hub_id),
                QoS::AtMostOnce,
            )
            .await?;

        Ok(Self {
            client,
            shutdown_tx,
            event_loop_handle: StdMutex::new(Some(handle)),
        })
    }

    /// Disconnect from the broker and stop the event loop task.
    pub async fn disconnect(&self) -> Result<(), MqttError> {
        self.client.disconnect().await?;
        let _ = self.shutdown_tx.send(true);

        let handle = self
            .event_loop_handle
            .lock()
            .ok()
            .and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            match tokio::time::timeout(Duration::from_secs(2), handle).await {
                Ok(Ok(())) => debug!("event loop task shut down gracefully"),
                Ok(Err(e)) if !e.is_cancelled() => {
                    warn!(error = %e, "event loop task ended with error");
                }
                Err(_) => warn!("event loop task did not stop in time, aborting"),
                _ => {}
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for MqttTransport {
    type Error = MqttError;

    async fn publish(&self, topic: &str, payload: Vec<u8>, qos: QoS) -> Result<(), MqttError> {
        self.client
            .publish(topic, qos, false, payload)
            .await
            .map_err(MqttError::from)
    }
}

impl Drop for MqttTransport {
    fn drop(&mut self) {
        // Users call disconnect() for a graceful stop; this only makes sure
        // the background task does not outlive the transport.
        let _ = self.shutdown_tx.send(true);
        if let Ok(mut guard) = self.event_loop_handle.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }
}
