//! The hub's polling loop.
//!
//! A single cooperative loop that sleeps for the configured polling interval
//! (or a short idle default), drains inbound transport events between wakes,
//! and on each wake performs the one-time status/device announcement and the
//! per-wake sensor snapshot. Cancellation comes from a watch channel observed
//! by the same select as the timer.

use crate::error::HubResult;
use crate::hub::HubController;
use crate::transport::{Transport, TransportEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

/// Wake cadence while no polling interval has been configured. Idle wakes
/// never publish sensor data.
const IDLE_POLL: Duration = Duration::from_millis(500);

/// Drives a [`HubController`] until shut down.
pub struct HubRunner<T: Transport> {
    controller: Arc<HubController<T>>,
    events: mpsc::Receiver<TransportEvent>,
    shutdown: watch::Receiver<bool>,
}

impl<T: Transport> HubRunner<T> {
    pub fn new(
        controller: Arc<HubController<T>>,
        events: mpsc::Receiver<TransportEvent>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            controller,
            events,
            shutdown,
        }
    }

    /// Run until the shutdown signal fires or the event channel closes.
    ///
    /// Publish failures on a wake are fatal; malformed inbound messages are
    /// logged and dropped without stopping the loop.
    pub async fn run(mut self) -> HubResult<()> {
        loop {
            let wake_after = self
                .controller
                .polling_interval()
                .await
                // A non-positive interval clamps to zero, which busy-loops;
                // the cloud side owns validation.
                .map(|secs| Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO))
                .unwrap_or(IDLE_POLL);
            let deadline = tokio::time::Instant::now() + wake_after;

            loop {
                tokio::select! {
                    changed = self.shutdown.changed() => {
                        // A dropped sender counts as a shutdown request.
                        if changed.is_err() || *self.shutdown.borrow() {
                            info!("shutdown requested, stopping hub loop");
                            return Ok(());
                        }
                    }
                    event = self.events.recv() => match event {
                        Some(event) => self.dispatch(event).await,
                        None => {
                            info!("transport event channel closed, stopping hub loop");
                            return Ok(());
                        }
                    },
                    _ = tokio::time::sleep_until(deadline) => break,
                }
            }

            self.on_wake().await?;
        }
    }

    async fn dispatch(&self, event: TransportEvent) {
        let result = match event {
            TransportEvent::Connected => self.controller.on_connect().await,
            TransportEvent::Message { topic, payload } => {
                self.controller.on_message(&topic, &payload).await
            }
        };
        // Per-message isolation: a bad payload never takes the loop down.
        if let Err(e) = result {
            error!(error = %e, "inbound event handler failed, message dropped");
        }
    }

    async fn on_wake(&self) -> HubResult<()> {
        if !self.controller.is_connected().await {
            debug!("waiting for connection");
            return Ok(());
        }

        if !self.controller.status_sent().await {
            self.controller.send_status().await?;
            self.controller.send_device_info().await?;
        }

        // Sensor publication is gated on the polling interval alone, not on
        // whether the status announcement has happened.
        if self.controller.polling_interval().await.is_some() {
            self.controller.send_sensor_values().await?;
        }

        Ok(())
    }
}
