//! Error types for the MQTT climate platform.

use thiserror::Error;

/// Result type for climate operations.
pub type ClimateResult<T> = Result<T, ClimateError>;

/// Error type for climate entity operations.
#[derive(Debug, Error)]
pub enum ClimateError {
    /// Platform configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Topic rejected by publish/subscribe validation
    #[error("Invalid topic '{topic}': {reason}")]
    InvalidTopic { topic: String, reason: String },

    /// Unit string that is neither Celsius nor Fahrenheit
    #[error("Unknown temperature unit: {0}")]
    UnknownUnit(String),

    /// Operation mode outside the configured list
    #[error("Unrecognized operation mode: {0}")]
    UnknownOperationMode(String),

    /// Failure reported by the MQTT collaborator
    #[error("Transport error: {0}")]
    Transport(String),

    /// Filesystem error while loading configuration
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("Climate error: {0}")]
    Other(#[from] anyhow::Error),
}

impl ClimateError {
    pub(crate) fn invalid_topic(topic: &str, reason: impl Into<String>) -> Self {
        Self::InvalidTopic {
            topic: topic.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<toml::de::Error> for ClimateError {
    fn from(e: toml::de::Error) -> Self {
        Self::Configuration(e.to_string())
    }
}
