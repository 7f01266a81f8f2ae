//! Bindings from [`crate::MqttTransport`] to concrete MQTT clients.

#[cfg(feature = "mqtt")]
pub mod rumqtt;

#[cfg(feature = "mqtt")]
pub use rumqtt::{BrokerConfig, ClimateRuntime, RumqttTransport};

/// Names of the client bindings compiled into this build.
pub fn available_adapters() -> Vec<&'static str> {
    #[allow(unused_mut)]
    let mut adapters = Vec::new();
    #[cfg(feature = "mqtt")]
    adapters.push("rumqttc");
    adapters
}
