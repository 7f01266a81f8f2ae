//! Climate platform configuration.
//!
//! One [`ClimateConfig`] describes one thermostat: its name, the MQTT
//! delivery settings, and the topic for every inbound and outbound channel.
//!
//! ```toml
//! name = "Living Room"
//! qos = 1
//! retain = true
//! temperature_topic = "home/living/thermostat/target"
//! current_temperature_topic = "home/living/thermostat/current"
//! operation_topic = "home/living/thermostat/mode"
//! operation_modes = ["auto", "heat", "off"]
//! default_operation = "auto"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ClimateError, ClimateResult};
use crate::topic::{validate_publish_topic, validate_subscribe_topic};
use crate::transport::QoS;

pub const DEFAULT_NAME: &str = "MQTT Climate Device";
pub const DEFAULT_OPERATION: &str = "auto";

/// Configuration for an MQTT climate entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateConfig {
    /// Entity name shown by the host
    #[serde(default = "default_name")]
    pub name: String,

    /// QoS for every publish and the current temperature subscription
    #[serde(default)]
    pub qos: QoS,

    /// Retain flag for every publish
    #[serde(default)]
    pub retain: bool,

    /// Target temperature is published here
    pub temperature_topic: String,

    /// Current temperature readings arrive here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_temperature_topic: Option<String>,

    /// Maximum temperature is published here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_temperature_topic: Option<String>,

    /// Minimum temperature is published here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_temperature_topic: Option<String>,

    /// Away mode (`On`/`Off`) is published here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away_mode_topic: Option<String>,

    /// Operation mode is published here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_topic: Option<String>,

    /// Operation modes the host may select
    #[serde(default = "default_operation_modes")]
    pub operation_modes: Vec<String>,

    /// Operation mode at startup
    #[serde(default = "default_operation")]
    pub default_operation: String,
}

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

fn default_operation() -> String {
    DEFAULT_OPERATION.to_string()
}

fn default_operation_modes() -> Vec<String> {
    ["auto", "heat", "cool", "idle"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl ClimateConfig {
    /// Create a configuration with only the required target temperature topic.
    pub fn new(temperature_topic: impl Into<String>) -> Self {
        Self {
            name: default_name(),
            qos: QoS::default(),
            retain: false,
            temperature_topic: temperature_topic.into(),
            current_temperature_topic: None,
            max_temperature_topic: None,
            min_temperature_topic: None,
            away_mode_topic: None,
            operation_topic: None,
            operation_modes: default_operation_modes(),
            default_operation: default_operation(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }

    pub fn with_retain(mut self, retain: bool) -> Self {
        self.retain = retain;
        self
    }

    pub fn with_current_temperature_topic(mut self, topic: impl Into<String>) -> Self {
        self.current_temperature_topic = Some(topic.into());
        self
    }

    pub fn with_min_temperature_topic(mut self, topic: impl Into<String>) -> Self {
        self.min_temperature_topic = Some(topic.into());
        self
    }

    pub fn with_max_temperature_topic(mut self, topic: impl Into<String>) -> Self {
        self.max_temperature_topic = Some(topic.into());
        self
    }

    pub fn with_away_mode_topic(mut self, topic: impl Into<String>) -> Self {
        self.away_mode_topic = Some(topic.into());
        self
    }

    pub fn with_operation_topic(mut self, topic: impl Into<String>) -> Self {
        self.operation_topic = Some(topic.into());
        self
    }

    pub fn with_operation_modes(mut self, modes: Vec<String>) -> Self {
        self.operation_modes = modes;
        self
    }

    pub fn with_default_operation(mut self, mode: impl Into<String>) -> Self {
        self.default_operation = mode.into();
        self
    }

    /// Check topics and operation modes.
    pub fn validate(&self) -> ClimateResult<()> {
        validate_publish_topic(&self.temperature_topic)?;

        if let Some(topic) = &self.current_temperature_topic {
            validate_subscribe_topic(topic)?;
        }

        for topic in [
            &self.max_temperature_topic,
            &self.min_temperature_topic,
            &self.away_mode_topic,
            &self.operation_topic,
        ]
        .into_iter()
        .flatten()
        {
            validate_publish_topic(topic)?;
        }

        if self.operation_modes.is_empty() {
            return Err(ClimateError::Configuration(
                "operation_modes must list at least one mode".to_string(),
            ));
        }

        if !self.operation_modes.contains(&self.default_operation) {
            warn!(
                "Default operation '{}' of '{}' is not one of {:?}",
                self.default_operation, self.name, self.operation_modes
            );
        }

        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> ClimateResult<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ClimateResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }
}
