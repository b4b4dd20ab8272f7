//! Sensaur hub simulator
//!
//! Simulates an edge gateway ("hub") that announces itself and its attached
//! devices to the Sensaur cloud telemetry service over MQTT, periodically
//! publishes synthetic sensor readings, and reacts to inbound configuration
//! and actuation commands.
//!
//! # Overview
//!
//! The crate is organized around a few seams:
//! - [`device`] — device identities and the components derived from them
//! - [`protocol`] — topic layout and the JSON payloads on the wire
//! - [`hub`] — the controller (state + dispatch) and the polling loop
//! - [`transport`] — the [`transport::Transport`] publish seam, with a
//!   rumqttc implementation and a recording mock for tests
//!
//! # Quick Start
//!
//! ```rust
//! use sensaur_hub::device::{ComponentSpec, Device};
//!
//! let device = Device::new(vec![ComponentSpec {
//!     kind: "temperature".to_string(),
//!     dir: "i".to_string(),
//!     model: Some("K-30".to_string()),
//!     units: Some("C".to_string()),
//! }]);
//!
//! // Component ids are stable: hex device id, dash, first five chars of type.
//! assert_eq!(
//!     device.components()[0].id,
//!     format!("{:x}-tempe", device.id())
//! );
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod hub;
pub mod protocol;
pub mod sensors;
pub mod testing;
pub mod transport;

pub use config::HubConfig;
pub use device::{Component, ComponentSpec, Device};
pub use error::{HubError, HubResult};
pub use hub::{HubController, HubRunner};
pub use transport::{Transport, TransportEvent};
