//! Device and component identity model.
//!
//! A device is a simulated unit with one or more addressable components
//! (sensors or actuators). The device identity is drawn once at construction
//! and is immutable afterwards; component identifiers are derived from it.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration-level description of a single component.
///
/// Mirrors the device info format `dir,type,model,units`: `dir` is `"i"` for a
/// sensor input, anything else is an actuator/output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentSpec {
    /// Type label, e.g. "temperature" or "CO2"
    #[serde(rename = "type")]
    pub kind: String,
    /// Direction: "i" = sensor input, other = actuator/output
    pub dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

impl ComponentSpec {
    /// True for sensor-input components, the ones that produce readings.
    pub fn is_input(&self) -> bool {
        self.dir == "i"
    }
}

/// A component attached to a device, with its derived identifier.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Component {
    pub id: String,
    #[serde(flatten)]
    pub spec: ComponentSpec,
}

/// Derive a component identifier: lowercase hex device id, a dash, and at most
/// the first five characters of the type label (no padding for shorter labels).
pub fn component_id(device_id: u32, kind: &str) -> String {
    let prefix: String = kind.chars().take(5).collect();
    format!("{device_id:x}-{prefix}")
}

/// A simulated device attached to the hub.
///
/// The identity is drawn uniformly from `[1, u32::MAX]` once, at construction.
/// No uniqueness check is made against other devices; collisions are treated
/// as acceptably unlikely for simulation purposes.
#[derive(Debug, Clone)]
pub struct Device {
    id: u32,
    components: Vec<Component>,
}

impl Device {
    /// Construct a device with a freshly drawn identity.
    pub fn new(specs: Vec<ComponentSpec>) -> Self {
        Self::with_id(rand::thread_rng().gen_range(1..=u32::MAX), specs)
    }

    /// Construct a device with a caller-chosen identity. Tests use this to pin
    /// identifiers; `new` is the normal path.
    pub fn with_id(id: u32, specs: Vec<ComponentSpec>) -> Self {
        let components: Vec<Component> = specs
            .into_iter()
            .map(|spec| Component {
                id: component_id(id, &spec.kind),
                spec,
            })
            .collect();
        for component in &components {
            debug!(component_id = %component.id, "loaded component");
        }
        Self { id, components }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Device identity as used in topics and payload keys: lowercase hex.
    pub fn hex_id(&self) -> String {
        format!("{:x}", self.id)
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }
}
