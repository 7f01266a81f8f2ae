//! MQTT Climate Platform
//!
//! A thermostat entity for home-automation hosts, driven over MQTT. The
//! entity subscribes to a current temperature topic and publishes target
//! temperature, operation mode, min/max temperature and away mode changes.
//!
//! ## Features
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `mqtt` | ✅ | `rumqttc` transport and runtime |
//!
//! ## Architecture
//!
//! - **codec**: temperature payload parsing (`21.5 °C`, `70F`) and unit conversion
//! - **MqttClimate**: the entity; state, host requests, inbound readings
//! - **MqttTransport**: the publish/subscribe seam the host backs with an MQTT client
//! - **ClimateConfig**: per-entity topics, QoS, retain flag and operation modes
//!
//! The host injects its temperature display unit and an update listener, so
//! the entity never reaches into host state.

pub mod adapters;
pub mod codec;
pub mod config;
pub mod entity;
pub mod error;
pub mod topic;
pub mod transport;
pub mod unit;

pub use codec::{
    convert_temperature, format_temperature_payload, parse_temperature, ParsedTemperature,
};
pub use config::ClimateConfig;
pub use entity::{ClimateState, MqttClimate, SetTemperature, UpdateListener};
pub use error::{ClimateError, ClimateResult};
pub use transport::{MqttTransport, QoS};
pub use unit::TemperatureUnit;

#[cfg(feature = "mqtt")]
pub use adapters::{BrokerConfig, ClimateRuntime, RumqttTransport};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
