//! Transport layer between the hub controller and the MQTT broker.
//!
//! The controller only needs to publish; connecting, subscribing, and the
//! delivery of inbound events are owned by the concrete adapter. The trait
//! exists so tests can substitute a recording mock for the broker.

use async_trait::async_trait;

pub mod mqtt;

pub use rumqttc::QoS;

/// Publish seam the hub controller writes through.
#[async_trait]
pub trait Transport: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Publish a payload to the given topic.
    async fn publish(&self, topic: &str, payload: Vec<u8>, qos: QoS) -> Result<(), Self::Error>;
}

/// Events a transport delivers from its background execution context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The broker acknowledged the connection.
    Connected,
    /// An inbound publish arrived on a subscribed topic.
    Message { topic: String, payload: Vec<u8> },
}
