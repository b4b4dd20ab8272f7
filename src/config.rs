//! Hub configuration loaded from a TOML file.
//!
//! Supplies the owner and hub identifiers, broker endpoint, TLS material
//! paths, status fields, and the device specifications constructed at startup.

use crate::device::ComponentSpec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main hub configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HubConfig {
    /// Owner identifier (leading topic segment)
    pub owner_id: String,
    /// Hub identifier
    pub hub_id: String,
    /// Broker host
    pub host: String,
    /// Broker port (default: 8883)
    #[serde(default = "default_port")]
    pub port: u16,
    /// MQTT keep-alive in seconds (default: 60)
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
    /// TLS material; opaque to the protocol core
    pub tls: TlsSection,
    /// Network name reported on the status topic
    #[serde(default = "default_wifi_network")]
    pub wifi_network: String,
    /// Network credential reported on the status topic
    #[serde(default = "default_wifi_password")]
    pub wifi_password: String,
    /// Devices to construct at startup: one component list per device
    #[serde(default)]
    pub devices: Vec<Vec<ComponentSpec>>,
}

/// TLS material references
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TlsSection {
    pub ca_path: PathBuf,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

fn default_port() -> u16 {
    8883
}

fn default_keep_alive() -> u64 {
    60
}

fn default_wifi_network() -> String {
    "abc".to_string()
}

fn default_wifi_password() -> String {
    "123".to_string()
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
}

impl HubConfig {
    /// Load configuration from a TOML file and validate the topic identifiers.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: HubConfig = toml::from_str(&content)?;
        validate_identifier(&config.owner_id)?;
        validate_identifier(&config.hub_id)?;
        Ok(config)
    }

    /// Create a test configuration for unit testing
    #[cfg(test)]
    pub fn test_config() -> Self {
        let toml_content = r#"
owner_id = "acme"
hub_id = "h1"
host = "broker.example.com"

devices = [
    [
        { type = "temperature", dir = "i" },
        { type = "valve", dir = "o" },
    ],
]

[tls]
ca_path = "certs/ca.pem"
cert_path = "certs/hub.pem"
key_path = "certs/hub.key"
"#;
        toml::from_str(toml_content).expect("Test config should parse")
    }
}

/// Owner and hub identifiers become topic segments; keep them to the charset
/// the cloud side accepts.
fn validate_identifier(id: &str) -> Result<(), ConfigError> {
    let valid_chars = id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-');

    if id.is_empty() || !valid_chars {
        return Err(ConfigError::InvalidIdentifier(format!(
            "'{id}' must match pattern [a-zA-Z0-9._-]+"
        )));
    }

    Ok(())
}
