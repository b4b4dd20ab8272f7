//! Topic construction and inbound-topic classification.
//!
//! The cloud service addresses hubs as `{owner}/hub/{hub_id}/...` and devices
//! as `{owner}/device/{device_id}`. Inbound messages are dispatched by the
//! final path segment of their topic.

/// Topic construction for the cloud service's hub/device layout
pub struct TopicBuilder;

impl TopicBuilder {
    /// Hub status topic: `{owner}/hub/{hub_id}/status`
    pub fn status(owner_id: &str, hub_id: &str) -> String {
        format!("{owner_id}/hub/{hub_id}/status")
    }

    /// Aggregate device map topic: `{owner}/hub/{hub_id}/devices`
    pub fn devices(owner_id: &str, hub_id: &str) -> String {
        format!("{owner_id}/hub/{hub_id}/devices")
    }

    /// Sensor snapshot topic: `{owner}/hub/{hub_id}/sensors`
    pub fn sensors(owner_id: &str, hub_id: &str) -> String {
        format!("{owner_id}/hub/{hub_id}/sensors")
    }

    /// Inbound configuration topic: `{owner}/hub/{hub_id}/config`
    pub fn config(owner_id: &str, hub_id: &str) -> String {
        format!("{owner_id}/hub/{hub_id}/config")
    }

    /// Inbound actuation topic: `{owner}/hub/{hub_id}/actuators`
    pub fn actuators(owner_id: &str, hub_id: &str) -> String {
        format!("{owner_id}/hub/{hub_id}/actuators")
    }

    /// Device-to-hub assignment topic: `{owner}/device/{device_id}`
    pub fn device_assignment(owner_id: &str, device_id: &str) -> String {
        format!("{owner_id}/device/{device_id}")
    }
}

/// Classification of an inbound topic by its final path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundTopic {
    Config,
    Actuators,
    /// Anything else; dropped silently.
    Unknown,
}

pub fn classify_topic(topic: &str) -> InboundTopic {
    match topic.rsplit('/').next() {
        Some("config") => InboundTopic::Config,
        Some("actuators") => InboundTopic::Actuators,
        _ => InboundTopic::Unknown,
    }
}
