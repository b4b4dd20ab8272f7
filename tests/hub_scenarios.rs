//! End-to-end hub scenarios against the mock transport.
//!
//! All tests run with a paused tokio clock, so the polling loop's sleeps are
//! driven by virtual time and the tests finish immediately in wall time.

use sensaur_hub::config::HubConfig;
use sensaur_hub::device::{ComponentSpec, Device};
use sensaur_hub::hub::{HubController, HubRunner};
use sensaur_hub::testing::{MockTransport, PublishedMessage};
use sensaur_hub::transport::{QoS, TransportEvent};
use sensaur_hub::HubResult;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

fn test_config() -> HubConfig {
    toml::from_str(
        r#"
owner_id = "acme"
hub_id = "h1"
host = "broker.example.com"

[tls]
ca_path = "certs/ca.pem"
cert_path = "certs/hub.pem"
key_path = "certs/hub.key"
"#,
    )
    .expect("test config should parse")
}

fn spec(kind: &str, dir: &str) -> ComponentSpec {
    ComponentSpec {
        kind: kind.to_string(),
        dir: dir.to_string(),
        model: None,
        units: None,
    }
}

struct Harness {
    transport: Arc<MockTransport>,
    controller: Arc<HubController<MockTransport>>,
    event_tx: mpsc::Sender<TransportEvent>,
    shutdown_tx: watch::Sender<bool>,
    runner_handle: JoinHandle<HubResult<()>>,
}

async fn start_hub(devices: Vec<Device>) -> Harness {
    let transport = Arc::new(MockTransport::new());
    let controller = Arc::new(HubController::new(&test_config(), transport.clone()));
    for device in devices {
        controller.add_device(device).await.unwrap();
    }

    let (event_tx, event_rx) = mpsc::channel(32);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = HubRunner::new(controller.clone(), event_rx, shutdown_rx);
    let runner_handle = tokio::spawn(runner.run());

    Harness {
        transport,
        controller,
        event_tx,
        shutdown_tx,
        runner_handle,
    }
}

impl Harness {
    async fn connect(&self) {
        self.event_tx
            .send(TransportEvent::Connected)
            .await
            .unwrap();
    }

    async fn deliver(&self, topic: &str, payload: &[u8]) {
        self.event_tx
            .send(TransportEvent::Message {
                topic: topic.to_string(),
                payload: payload.to_vec(),
            })
            .await
            .unwrap();
    }

    /// Wait (in virtual time) until at least `n` publishes were recorded.
    async fn wait_for_publishes(&self, n: usize) -> Vec<PublishedMessage> {
        tokio::time::timeout(Duration::from_secs(60), async {
            loop {
                let published = self.transport.get_published().await;
                if published.len() >= n {
                    return published;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("expected publishes never arrived")
    }

    async fn stop(self) {
        self.shutdown_tx.send(true).unwrap();
        self.runner_handle
            .await
            .expect("runner task panicked")
            .expect("runner returned error");
    }
}

#[tokio::test(start_paused = true)]
async fn startup_sequence_announces_status_then_devices() {
    let hub = start_hub(vec![Device::with_id(0xab12, vec![spec("temp", "i")])]).await;
    hub.connect().await;

    // Connect announces the registry immediately; the first wake (0.5 s idle
    // cadence) adds the one-time status followed by another announcement.
    let published = hub.wait_for_publishes(5).await;
    assert_eq!(published[0].0, "acme/device/ab12");
    assert_eq!(published[1].0, "acme/hub/h1/devices");
    assert_eq!(published[2].0, "acme/hub/h1/status");
    assert_eq!(published[3].0, "acme/device/ab12");
    assert_eq!(published[3].1, br#""h1""#.to_vec());
    assert_eq!(published[4].0, "acme/hub/h1/devices");

    let aggregate: serde_json::Value = serde_json::from_slice(&published[4].1).unwrap();
    assert_eq!(aggregate["ab12"]["components"][0]["id"], "ab12-temp");

    // Status goes out fire-and-forget; device messages are QoS 1.
    assert_eq!(published[2].2, QoS::AtMostOnce);
    assert_eq!(published[3].2, QoS::AtLeastOnce);
    assert_eq!(published[4].2, QoS::AtLeastOnce);

    hub.stop().await;
}

#[tokio::test(start_paused = true)]
async fn status_is_sent_once_per_session() {
    let hub = start_hub(vec![Device::with_id(0x1, vec![spec("temp", "i")])]).await;
    hub.connect().await;

    hub.wait_for_publishes(5).await;
    // Several more idle wakes; no polling interval, so nothing new goes out.
    tokio::time::sleep(Duration::from_secs(5)).await;

    let published = hub.transport.get_published().await;
    let status_count = published
        .iter()
        .filter(|(topic, _, _)| topic == "acme/hub/h1/status")
        .count();
    assert_eq!(status_count, 1);
    assert_eq!(published.len(), 5);

    hub.stop().await;
}

#[tokio::test(start_paused = true)]
async fn no_publication_before_connect() {
    let hub = start_hub(vec![Device::with_id(0x1, vec![spec("temp", "i")])]).await;

    // Let the loop wake a few times without a connection.
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert!(hub.transport.get_published().await.is_empty());
    hub.stop().await;
}

#[tokio::test(start_paused = true)]
async fn device_registered_after_connect_is_announced() {
    let hub = start_hub(Vec::new()).await;
    hub.connect().await;

    // Empty registry: the first wake publishes status plus an empty aggregate.
    let published = hub.wait_for_publishes(2).await;
    assert_eq!(published[0].0, "acme/hub/h1/status");
    assert_eq!(published[1].0, "acme/hub/h1/devices");
    hub.transport.clear_history().await;

    hub.controller
        .add_device(Device::with_id(0xbeef, vec![spec("CO2", "i")]))
        .await
        .unwrap();

    let published = hub.transport.get_published().await;
    assert_eq!(published.len(), 2);
    assert_eq!(published[0].0, "acme/device/beef");
    assert_eq!(published[1].0, "acme/hub/h1/devices");

    hub.stop().await;
}

#[tokio::test(start_paused = true)]
async fn polling_interval_drives_sensor_cadence() {
    let hub = start_hub(vec![Device::with_id(0xab12, vec![spec("temp", "i")])]).await;
    hub.connect().await;
    hub.deliver("acme/hub/h1/config", br#"{"polling_interval": 2.5}"#)
        .await;

    // Connect announcement (2) + first wake: status, announcement, sensors (4).
    let published = hub.wait_for_publishes(6).await;
    assert_eq!(published[5].0, "acme/hub/h1/sensors");
    let first_snapshot = Instant::now();

    let values: BTreeMap<String, String> = serde_json::from_slice(&published[5].1).unwrap();
    assert_eq!(values.len(), 1);
    let reading = &values["ab12-temp"];
    let parsed: f64 = reading.parse().unwrap();
    assert!((10.0..20.0).contains(&parsed));
    assert_eq!(reading.split('.').nth(1).unwrap().len(), 2);

    // The next wake honors the configured cadence.
    let published = hub.wait_for_publishes(7).await;
    assert_eq!(published[6].0, "acme/hub/h1/sensors");
    let gap = first_snapshot.elapsed().as_secs_f64();
    assert!(
        (gap - 2.5).abs() < 0.1,
        "expected ~2.5 s between snapshots, got {gap}"
    );

    hub.stop().await;
}

#[tokio::test(start_paused = true)]
async fn no_sensor_publication_without_polling_interval() {
    let hub = start_hub(vec![Device::with_id(0x1, vec![spec("temp", "i")])]).await;
    hub.connect().await;

    hub.wait_for_publishes(5).await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    let published = hub.transport.get_published().await;
    assert!(published
        .iter()
        .all(|(topic, _, _)| topic != "acme/hub/h1/sensors"));

    hub.stop().await;
}

#[tokio::test(start_paused = true)]
async fn actuators_message_produces_no_outbound_publish() {
    let hub = start_hub(vec![Device::with_id(0x1, vec![spec("valve", "o")])]).await;
    hub.connect().await;
    hub.wait_for_publishes(5).await;
    hub.transport.clear_history().await;

    hub.deliver("acme/hub/h1/actuators", br#"{"valve1": 75}"#).await;
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(hub.transport.get_published().await.is_empty());
    hub.stop().await;
}

#[tokio::test(start_paused = true)]
async fn malformed_message_is_dropped_and_loop_survives() {
    let hub = start_hub(vec![Device::with_id(0x1, vec![spec("temp", "i")])]).await;
    hub.connect().await;
    hub.wait_for_publishes(5).await;

    hub.deliver("acme/hub/h1/config", b"{not json").await;
    // A later, well-formed config still takes effect.
    hub.deliver("acme/hub/h1/config", br#"{"polling_interval": 1.0}"#)
        .await;

    let published = hub.wait_for_publishes(6).await;
    assert_eq!(published[5].0, "acme/hub/h1/sensors");

    hub.stop().await;
}

#[tokio::test(start_paused = true)]
async fn unknown_topic_suffix_is_ignored() {
    let hub = start_hub(Vec::new()).await;
    hub.connect().await;
    hub.wait_for_publishes(2).await;
    hub.transport.clear_history().await;

    hub.deliver("acme/hub/h1/firmware", b"ignored").await;
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(hub.transport.get_published().await.is_empty());
    hub.stop().await;
}

#[tokio::test(start_paused = true)]
async fn device_identity_is_stable_across_all_topics() {
    let hub = start_hub(vec![Device::with_id(0xab12, vec![spec("temp", "i")])]).await;
    hub.connect().await;
    hub.deliver("acme/hub/h1/config", br#"{"polling_interval": 1.0}"#)
        .await;

    let published = hub.wait_for_publishes(6).await;

    for (topic, payload, _) in &published {
        if topic.starts_with("acme/device/") {
            assert_eq!(topic, "acme/device/ab12");
        }
        if topic == "acme/hub/h1/devices" {
            let aggregate: serde_json::Value = serde_json::from_slice(payload).unwrap();
            assert!(aggregate.get("ab12").is_some());
        }
        if topic == "acme/hub/h1/sensors" {
            let values: BTreeMap<String, String> = serde_json::from_slice(payload).unwrap();
            assert!(values.contains_key("ab12-temp"));
        }
    }

    hub.stop().await;
}

#[tokio::test(start_paused = true)]
async fn runner_stops_when_event_channel_closes() {
    let hub = start_hub(Vec::new()).await;

    drop(hub.event_tx);
    let result = hub.runner_handle.await.expect("runner task panicked");
    assert!(result.is_ok());
}

#[tokio::test(start_paused = true)]
async fn runner_stops_when_shutdown_sender_dropped() {
    let hub = start_hub(Vec::new()).await;

    // Dropping the sender without ever signalling counts as shutdown; the
    // loop must return rather than spin on a closed watch channel.
    drop(hub.shutdown_tx);
    let result = tokio::time::timeout(Duration::from_secs(5), hub.runner_handle)
        .await
        .expect("runner did not stop after shutdown sender was dropped")
        .expect("runner task panicked");
    assert!(result.is_ok());
}
