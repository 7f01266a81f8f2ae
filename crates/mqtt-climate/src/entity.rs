//! MQTT climate entity.
//!
//! [`MqttClimate`] is the thermostat the host framework sees. It keeps the
//! entity state, turns current temperature readings from the bus into state
//! updates, and publishes every state change the host requests.
//!
//! The host stays outside the entity: it hands in its temperature display
//! unit and, optionally, a listener that is called with a [`ClimateState`]
//! snapshot whenever the state changes.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::codec::{convert_temperature, format_temperature_payload, parse_temperature};
use crate::config::ClimateConfig;
use crate::error::{ClimateError, ClimateResult};
use crate::topic::topic_matches;
use crate::transport::MqttTransport;
use crate::unit::TemperatureUnit;

/// Away mode payload when enabled.
pub const ON_PAYLOAD: &str = "On";
/// Away mode payload when disabled.
pub const OFF_PAYLOAD: &str = "Off";

/// Fallback minimum temperature, in Celsius.
pub const DEFAULT_MIN_TEMP_CELSIUS: f64 = 7.0;
/// Fallback maximum temperature, in Celsius.
pub const DEFAULT_MAX_TEMP_CELSIUS: f64 = 35.0;

/// Called with the new state after every state change.
pub type UpdateListener = Arc<dyn Fn(&ClimateState) + Send + Sync>;

/// Snapshot of the entity state handed to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateState {
    pub name: String,
    pub unit: String,
    pub current_temperature: Option<f64>,
    pub target_temperature: Option<f64>,
    pub min_temp: f64,
    pub max_temp: f64,
    pub operation: String,
    pub operation_list: Vec<String>,
    pub away_mode: bool,
}

/// Target temperature request from the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SetTemperature {
    #[serde(default)]
    pub temperature: Option<f64>,
}

impl SetTemperature {
    pub fn new(temperature: f64) -> Self {
        Self {
            temperature: Some(temperature),
        }
    }
}

/// Thermostat entity backed by MQTT topics.
pub struct MqttClimate {
    config: ClimateConfig,
    /// Host display unit, e.g. `°C`
    unit: String,
    transport: Arc<dyn MqttTransport>,
    on_update: Option<UpdateListener>,

    operation: String,
    current_temperature: Option<f64>,
    target_temperature: Option<f64>,
    min_temp: Option<f64>,
    max_temp: Option<f64>,
    away: bool,
}

impl fmt::Debug for MqttClimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MqttClimate")
            .field("name", &self.config.name)
            .field("unit", &self.unit)
            .field("operation", &self.operation)
            .field("current_temperature", &self.current_temperature)
            .field("target_temperature", &self.target_temperature)
            .field("away", &self.away)
            .finish_non_exhaustive()
    }
}

impl MqttClimate {
    /// Create a climate entity.
    ///
    /// `unit` is the host's temperature display string (`°C` or `°F`).
    pub fn new(
        config: ClimateConfig,
        unit: impl Into<String>,
        transport: Arc<dyn MqttTransport>,
    ) -> Self {
        let operation = config.default_operation.clone();
        Self {
            config,
            unit: unit.into(),
            transport,
            on_update: None,
            operation,
            current_temperature: None,
            target_temperature: None,
            min_temp: None,
            max_temp: None,
            away: false,
        }
    }

    /// Register the host's update notification.
    pub fn with_update_listener<F>(mut self, listener: F) -> Self
    where
        F: Fn(&ClimateState) + Send + Sync + 'static,
    {
        self.on_update = Some(Arc::new(listener));
        self
    }

    pub fn config(&self) -> &ClimateConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Host display unit.
    pub fn temperature_unit(&self) -> &str {
        &self.unit
    }

    /// The display unit as a [`TemperatureUnit`], if it is one.
    pub fn unit(&self) -> Option<TemperatureUnit> {
        self.unit.parse().ok()
    }

    /// State is pushed from MQTT, never polled.
    pub fn should_poll(&self) -> bool {
        false
    }

    pub fn current_temperature(&self) -> Option<f64> {
        self.current_temperature
    }

    pub fn target_temperature(&self) -> Option<f64> {
        self.target_temperature
    }

    pub fn current_operation(&self) -> &str {
        &self.operation
    }

    pub fn operation_list(&self) -> &[String] {
        &self.config.operation_modes
    }

    pub fn is_away_mode_on(&self) -> bool {
        self.away
    }

    /// Minimum settable temperature, falling back to 7 °C in the display unit.
    pub fn min_temp(&self) -> f64 {
        self.min_temp
            .unwrap_or_else(|| self.default_temp(DEFAULT_MIN_TEMP_CELSIUS))
    }

    /// Maximum settable temperature, falling back to 35 °C in the display unit.
    pub fn max_temp(&self) -> f64 {
        self.max_temp
            .unwrap_or_else(|| self.default_temp(DEFAULT_MAX_TEMP_CELSIUS))
    }

    fn default_temp(&self, celsius: f64) -> f64 {
        match self.unit() {
            Some(unit) => convert_temperature(celsius, TemperatureUnit::Celsius, unit),
            None => celsius,
        }
    }

    pub fn state(&self) -> ClimateState {
        ClimateState {
            name: self.config.name.clone(),
            unit: self.unit.clone(),
            current_temperature: self.current_temperature,
            target_temperature: self.target_temperature,
            min_temp: self.min_temp(),
            max_temp: self.max_temp(),
            operation: self.operation.clone(),
            operation_list: self.config.operation_modes.clone(),
            away_mode: self.away,
        }
    }

    /// Subscribe to the current temperature topic, if one is configured.
    ///
    /// Called when the host adds the entity and again after every reconnect.
    pub async fn subscribe(&self) -> ClimateResult<()> {
        let Some(topic) = &self.config.current_temperature_topic else {
            debug!("'{}' has no current temperature topic", self.config.name);
            return Ok(());
        };

        self.transport.subscribe(topic, self.config.qos).await?;
        info!(
            "'{}' subscribed to current temperature on {} (qos {})",
            self.config.name, topic, self.config.qos
        );
        Ok(())
    }

    /// Whether a message on `topic` is meant for this entity.
    pub fn handles_topic(&self, topic: &str) -> bool {
        self.config
            .current_temperature_topic
            .as_deref()
            .is_some_and(|filter| topic_matches(filter, topic))
    }

    /// Route an incoming MQTT message. Returns the stored current temperature
    /// when the message updated it.
    pub fn handle_message(&mut self, topic: &str, payload: &[u8]) -> Option<f64> {
        if !self.handles_topic(topic) {
            debug!("'{}' ignoring message on {}", self.config.name, topic);
            return None;
        }

        match std::str::from_utf8(payload) {
            Ok(text) => self.current_temperature_received(text),
            Err(e) => {
                warn!(
                    "'{}' received non UTF-8 temperature on {}: {}",
                    self.config.name, topic, e
                );
                None
            }
        }
    }

    /// Apply a current temperature payload.
    ///
    /// Malformed payloads and display units that are neither Celsius nor
    /// Fahrenheit are logged and leave the state untouched.
    pub fn current_temperature_received(&mut self, payload: &str) -> Option<f64> {
        let Some(parsed) = parse_temperature(payload) else {
            warn!(
                "'{}' could not parse temperature payload {:?}",
                self.config.name, payload
            );
            return None;
        };

        let Some(unit) = self.unit() else {
            warn!("Cannot convert from {} to {}", parsed.unit, self.unit);
            return None;
        };

        let value = parsed.in_unit(unit);
        debug!(
            "'{}' current temperature {} {} (received {:?})",
            self.config.name, value, self.unit, payload
        );

        self.current_temperature = Some(value);
        self.notify();
        Some(value)
    }

    /// Select an operation mode from the configured list and publish it.
    pub async fn set_operation_mode(&mut self, operation_mode: &str) -> ClimateResult<()> {
        if !self.config.operation_modes.iter().any(|m| m == operation_mode) {
            error!("Unrecognized operation mode: {}", operation_mode);
            return Err(ClimateError::UnknownOperationMode(
                operation_mode.to_string(),
            ));
        }

        self.operation = operation_mode.to_string();

        let published = self
            .publish(self.config.operation_topic.as_deref(), operation_mode)
            .await;
        self.notify();
        published
    }

    /// Set the target temperature and publish it. A request without a
    /// temperature is ignored.
    pub async fn set_temperature(&mut self, request: SetTemperature) -> ClimateResult<()> {
        let Some(temperature) = request.temperature else {
            debug!("'{}' set_temperature without a temperature", self.config.name);
            return Ok(());
        };

        self.target_temperature = Some(temperature);

        let payload = format_temperature_payload(temperature, &self.unit);
        let published = self
            .publish(Some(self.config.temperature_topic.as_str()), &payload)
            .await;
        self.notify();
        published
    }

    pub async fn set_min_temp(&mut self, value: f64) -> ClimateResult<()> {
        self.min_temp = Some(value);

        let payload = format_temperature_payload(value, &self.unit);
        let published = self
            .publish(self.config.min_temperature_topic.as_deref(), &payload)
            .await;
        self.notify();
        published
    }

    pub async fn set_max_temp(&mut self, value: f64) -> ClimateResult<()> {
        self.max_temp = Some(value);

        let payload = format_temperature_payload(value, &self.unit);
        let published = self
            .publish(self.config.max_temperature_topic.as_deref(), &payload)
            .await;
        self.notify();
        published
    }

    pub async fn turn_away_mode_on(&mut self) -> ClimateResult<()> {
        self.set_away_mode(true).await
    }

    pub async fn turn_away_mode_off(&mut self) -> ClimateResult<()> {
        self.set_away_mode(false).await
    }

    async fn set_away_mode(&mut self, away: bool) -> ClimateResult<()> {
        self.away = away;

        let payload = if away { ON_PAYLOAD } else { OFF_PAYLOAD };
        let published = self
            .publish(self.config.away_mode_topic.as_deref(), payload)
            .await;
        self.notify();
        published
    }

    async fn publish(&self, topic: Option<&str>, payload: &str) -> ClimateResult<()> {
        let Some(topic) = topic else {
            return Ok(());
        };

        debug!("'{}' publishing {:?} to {}", self.config.name, payload, topic);
        self.transport
            .publish(topic, payload, self.config.qos, self.config.retain)
            .await
            .inspect_err(|e| error!("'{}' failed to publish to {}: {}", self.config.name, topic, e))
    }

    fn notify(&self) {
        if let Some(listener) = &self.on_update {
            listener(&self.state());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::QoS;
    use async_trait::async_trait;

    struct NullTransport;

    #[async_trait]
    impl MqttTransport for NullTransport {
        async fn publish(
            &self,
            _topic: &str,
            _payload: &str,
            _qos: QoS,
            _retain: bool,
        ) -> ClimateResult<()> {
            Ok(())
        }

        async fn subscribe(&self, _topic: &str, _qos: QoS) -> ClimateResult<()> {
            Ok(())
        }
    }

    fn climate(unit: &str) -> MqttClimate {
        let config = ClimateConfig::new("t/set").with_current_temperature_topic("t/current");
        MqttClimate::new(config, unit, Arc::new(NullTransport))
    }

    #[test]
    fn test_initial_state() {
        let entity = climate("°C");
        assert_eq!(entity.name(), "MQTT Climate Device");
        assert_eq!(entity.current_operation(), "auto");
        assert_eq!(entity.current_temperature(), None);
        assert_eq!(entity.target_temperature(), None);
        assert!(!entity.is_away_mode_on());
        assert!(!entity.should_poll());
    }

    #[test]
    fn test_default_min_max_celsius() {
        let entity = climate("°C");
        assert_eq!(entity.min_temp(), 7.0);
        assert_eq!(entity.max_temp(), 35.0);
    }

    #[test]
    fn test_default_min_max_fahrenheit() {
        let entity = climate("°F");
        assert!((entity.min_temp() - 44.6).abs() < 1e-9);
        assert_eq!(entity.max_temp(), 95.0);
    }

    #[test]
    fn test_same_unit_stored_unchanged() {
        let mut entity = climate("°C");
        assert_eq!(entity.current_temperature_received("21.5 °C"), Some(21.5));
        assert_eq!(entity.current_temperature(), Some(21.5));
    }

    #[test]
    fn test_handle_message_checks_topic() {
        let mut entity = climate("°C");
        assert_eq!(entity.handle_message("other/topic", b"20C"), None);
        assert_eq!(entity.current_temperature(), None);

        assert_eq!(entity.handle_message("t/current", b"20C"), Some(20.0));
    }

    #[test]
    fn test_handle_message_rejects_invalid_utf8() {
        let mut entity = climate("°C");
        assert_eq!(entity.handle_message("t/current", &[0xff, 0xfe, b'C']), None);
        assert_eq!(entity.current_temperature(), None);
    }
}
