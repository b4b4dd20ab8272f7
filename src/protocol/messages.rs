//! Payload types exchanged with the cloud service.

use crate::device::Component;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Inbound payload on the `config` topic.
///
/// Unknown fields are ignored so the cloud side can extend the message. The
/// polling interval is taken as-is, with no bounds validation.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ConfigMessage {
    pub polling_interval: Option<f64>,
    pub firmware_url: Option<String>,
}

/// Inbound payload on the `actuators` topic: component id -> target value.
pub type ActuatorTargets = BTreeMap<String, Value>;

/// Outbound hub status: the network identity fields the cloud side records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusMessage {
    pub wifi_network: String,
    pub wifi_password: String,
    pub host: String,
}

/// Per-device entry in the aggregate `devices` payload.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DeviceInfo {
    pub version: u32,
    pub components: Vec<Component>,
}

impl DeviceInfo {
    /// Current device info schema version.
    pub const VERSION: u32 = 1;
}
