//! Wire protocol for the Sensaur cloud service.
//!
//! Topic layout and the JSON payload types exchanged over MQTT. All payloads
//! are UTF-8 JSON objects.

pub mod messages;
pub mod topics;

pub use messages::{ActuatorTargets, ConfigMessage, DeviceInfo, StatusMessage};
pub use topics::{classify_topic, InboundTopic, TopicBuilder};
