//! Mock transport for exercising the hub without a broker.

use crate::transport::{QoS, Transport};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// One recorded publish: topic, payload bytes, QoS.
pub type PublishedMessage = (String, Vec<u8>, QoS);

/// Records every publish for later inspection.
#[derive(Debug, Default)]
pub struct MockTransport {
    published: Arc<Mutex<Vec<PublishedMessage>>>,
    should_fail: bool,
}

#[derive(Debug, Error)]
#[error("Mock publish failure")]
pub struct MockTransportError;

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose every publish fails.
    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    pub async fn get_published(&self) -> Vec<PublishedMessage> {
        self.published.lock().await.clone()
    }

    pub async fn clear_history(&self) {
        self.published.lock().await.clear();
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Error = MockTransportError;

    async fn publish(&self, topic: &str, payload: Vec<u8>, qos: QoS) -> Result<(), Self::Error> {
        if self.should_fail {
            return Err(MockTransportError);
        }
        self.published
            .lock()
            .await
            .push((topic.to_string(), payload, qos));
        Ok(())
    }
}
