//! Host configuration file.
//!
//! ```toml
//! unit = "°C"
//!
//! [broker]
//! host = "localhost"
//! port = 1883
//!
//! [climate]
//! name = "Living Room"
//! temperature_topic = "home/living/target"
//! current_temperature_topic = "home/living/current"
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use mqtt_climate::{BrokerConfig, ClimateConfig, TemperatureUnit};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig {
    /// Temperature display unit of the host
    #[serde(default = "default_unit")]
    pub unit: String,

    #[serde(default)]
    pub broker: BrokerConfig,

    pub climate: ClimateConfig,
}

fn default_unit() -> String {
    TemperatureUnit::Celsius.as_str().to_string()
}

impl HostConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).context("Failed to parse host configuration")?;
        config.climate.validate()?;
        config
            .unit
            .parse::<TemperatureUnit>()
            .with_context(|| format!("Unsupported host unit '{}'", config.unit))?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_minimal_file() {
        let config = HostConfig::from_toml_str(
            r#"
            [climate]
            temperature_topic = "home/target"
            "#,
        )
        .unwrap();

        assert_eq!(config.unit, "°C");
        assert_eq!(config.broker.full_broker_addr(), "localhost:1883");
        assert_eq!(config.climate.temperature_topic, "home/target");
    }

    #[test]
    fn test_full_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            unit = "°F"

            [broker]
            host = "mqtt.local"
            port = 8883
            username = "user"
            password = "secret"

            [climate]
            name = "Office"
            qos = 2
            temperature_topic = "office/target"
            current_temperature_topic = "office/current"
            "#
        )
        .unwrap();

        let config = HostConfig::load(file.path()).unwrap();
        assert_eq!(config.unit, "°F");
        assert_eq!(config.broker.full_broker_addr(), "mqtt.local:8883");
        assert_eq!(config.broker.username.as_deref(), Some("user"));
        assert_eq!(config.climate.name, "Office");
    }

    #[test]
    fn test_unknown_unit_rejected() {
        let err = HostConfig::from_toml_str(
            r#"
            unit = "K"
            [climate]
            temperature_topic = "t"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Unsupported host unit"));
    }

    #[test]
    fn test_invalid_topic_rejected() {
        let result = HostConfig::from_toml_str(
            r#"
            [climate]
            temperature_topic = "home/#"
            "#,
        );
        assert!(result.is_err());
    }
}
