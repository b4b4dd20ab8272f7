//! Crate-level error types for hub operations.

use thiserror::Error;

/// Main error type for hub protocol operations
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Transport error: {0}")]
    Transport(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Malformed payload on {topic}: {source}")]
    MalformedPayload {
        topic: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HubError {
    /// Wrap a transport implementation's error.
    pub fn transport<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        Self::Transport(Box::new(error))
    }
}

/// Result type for hub operations
pub type HubResult<T> = Result<T, HubError>;
