//! Central protocol state and dispatch logic for the hub.
//!
//! The controller owns the session state and device registry behind one
//! mutex: the transport's event path, the registration path, and the polling
//! loop all call in from different contexts.

use crate::device::Device;
use crate::error::{HubError, HubResult};
use crate::protocol::{
    classify_topic, ActuatorTargets, ConfigMessage, DeviceInfo, InboundTopic, StatusMessage,
    TopicBuilder,
};
use crate::sensors::synthesize_reading;
use crate::transport::{QoS, Transport};
use crate::HubConfig;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Session state shared between the event path and the polling loop.
#[derive(Debug, Default)]
struct HubState {
    connected: bool,
    polling_interval: Option<f64>,
    status_sent: bool,
    devices: Vec<Device>,
}

/// The hub's protocol state machine.
///
/// Generic over the transport so tests run against a recording mock instead
/// of a live broker.
pub struct HubController<T: Transport> {
    owner_id: String,
    hub_id: String,
    status: StatusMessage,
    transport: Arc<T>,
    state: Mutex<HubState>,
}

impl<T: Transport> HubController<T> {
    pub fn new(config: &HubConfig, transport: Arc<T>) -> Self {
        Self {
            owner_id: config.owner_id.clone(),
            hub_id: config.hub_id.clone(),
            status: StatusMessage {
                wifi_network: config.wifi_network.clone(),
                wifi_password: config.wifi_password.clone(),
                host: config.host.clone(),
            },
            transport,
            state: Mutex::new(HubState::default()),
        }
    }

    /// Handle the broker's connection acknowledgement.
    ///
    /// Devices registered before the connection are announced now; devices
    /// registered later are announced by [`HubController::add_device`], so the
    /// cloud side learns the full device set either way.
    pub async fn on_connect(&self) -> HubResult<()> {
        let announce = {
            let mut state = self.state.lock().await;
            state.connected = true;
            !state.devices.is_empty()
        };
        info!("hub connected");
        if announce {
            self.send_device_info().await?;
        }
        Ok(())
    }

    /// Dispatch an inbound message by the final segment of its topic.
    ///
    /// Unknown suffixes are dropped silently. A malformed payload fails only
    /// this call; the caller decides whether that is fatal.
    pub async fn on_message(&self, topic: &str, payload: &[u8]) -> HubResult<()> {
        match classify_topic(topic) {
            InboundTopic::Config => self.handle_config(topic, payload).await,
            InboundTopic::Actuators => self.handle_actuators(topic, payload),
            InboundTopic::Unknown => Ok(()),
        }
    }

    async fn handle_config(&self, topic: &str, payload: &[u8]) -> HubResult<()> {
        let message: ConfigMessage =
            serde_json::from_slice(payload).map_err(|source| HubError::MalformedPayload {
                topic: topic.to_string(),
                source,
            })?;

        if let Some(interval) = message.polling_interval {
            // Stored as-is, no bounds validation: a zero or negative interval
            // degenerates into a busy loop.
            self.state.lock().await.polling_interval = Some(interval);
            info!(interval_secs = interval, "polling interval updated");
        }
        if let Some(url) = &message.firmware_url {
            // Firmware application is simulated; the URL is only reported.
            info!(%url, "firmware update requested");
        }
        Ok(())
    }

    fn handle_actuators(&self, topic: &str, payload: &[u8]) -> HubResult<()> {
        let targets: ActuatorTargets =
            serde_json::from_slice(payload).map_err(|source| HubError::MalformedPayload {
                topic: topic.to_string(),
                source,
            })?;

        for (component_id, value) in &targets {
            // Simulated actuation: no physical effect, no feedback publish.
            info!(%component_id, %value, "setting actuator");
        }
        Ok(())
    }

    /// Register a device. If the hub is already connected, the full device
    /// set is re-announced immediately so the cloud side stays current.
    pub async fn add_device(&self, device: Device) -> HubResult<()> {
        let announce = {
            let mut state = self.state.lock().await;
            state.devices.push(device);
            state.connected
        };
        if announce {
            self.send_device_info().await?;
        }
        Ok(())
    }

    /// Publish the hub's network identity to the status topic and latch
    /// `status_sent` for the rest of the session.
    pub async fn send_status(&self) -> HubResult<()> {
        let payload = serde_json::to_vec(&self.status)?;
        self.publish(
            TopicBuilder::status(&self.owner_id, &self.hub_id),
            payload,
            QoS::AtMostOnce,
        )
        .await?;
        self.state.lock().await.status_sent = true;
        Ok(())
    }

    /// Announce the device set: one hub-assignment message per device, then
    /// the aggregate device map.
    pub async fn send_device_info(&self) -> HubResult<()> {
        let devices = self.state.lock().await.devices.clone();

        let mut device_infos = BTreeMap::new();
        for device in &devices {
            let assignment = serde_json::to_vec(&self.hub_id)?;
            self.publish(
                TopicBuilder::device_assignment(&self.owner_id, &device.hex_id()),
                assignment,
                QoS::AtLeastOnce,
            )
            .await?;
            device_infos.insert(
                device.hex_id(),
                DeviceInfo {
                    version: DeviceInfo::VERSION,
                    components: device.components().to_vec(),
                },
            );
        }

        let payload = serde_json::to_vec(&device_infos)?;
        self.publish(
            TopicBuilder::devices(&self.owner_id, &self.hub_id),
            payload,
            QoS::AtLeastOnce,
        )
        .await?;
        info!(devices = devices.len(), "sent device info");
        Ok(())
    }

    /// Publish one synthesized reading per input-direction component.
    pub async fn send_sensor_values(&self) -> HubResult<()> {
        let values: BTreeMap<String, String> = {
            let state = self.state.lock().await;
            state
                .devices
                .iter()
                .flat_map(|device| device.components())
                .filter(|component| component.spec.is_input())
                .map(|component| (component.id.clone(), synthesize_reading()))
                .collect()
        };

        let payload = serde_json::to_vec(&values)?;
        self.publish(
            TopicBuilder::sensors(&self.owner_id, &self.hub_id),
            payload,
            QoS::AtLeastOnce,
        )
        .await?;
        info!(count = values.len(), "sending sensor values");
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.connected
    }

    pub async fn polling_interval(&self) -> Option<f64> {
        self.state.lock().await.polling_interval
    }

    pub async fn status_sent(&self) -> bool {
        self.state.lock().await.status_sent
    }

    async fn publish(&self, topic: String, payload: Vec<u8>, qos: QoS) -> HubResult<()> {
        debug!(%topic, "publishing");
        self.transport
            .publish(&topic, payload, qos)
            .await
            .map_err(HubError::transport)
    }
}
