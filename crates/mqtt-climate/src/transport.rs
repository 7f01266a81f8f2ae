//! MQTT transport interface.
//!
//! The climate entity never talks to a broker itself. Publishing and
//! subscribing go through [`MqttTransport`], which the host backs with its
//! own MQTT client (see [`crate::adapters`] for the `rumqttc` binding).

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ClimateError, ClimateResult};

/// MQTT delivery guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum QoS {
    #[default]
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl TryFrom<u8> for QoS {
    type Error = ClimateError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::AtMostOnce),
            1 => Ok(Self::AtLeastOnce),
            2 => Ok(Self::ExactlyOnce),
            other => Err(ClimateError::Configuration(format!(
                "QoS must be 0, 1 or 2, got {}",
                other
            ))),
        }
    }
}

impl From<QoS> for u8 {
    fn from(qos: QoS) -> Self {
        match qos {
            QoS::AtMostOnce => 0,
            QoS::AtLeastOnce => 1,
            QoS::ExactlyOnce => 2,
        }
    }
}

impl fmt::Display for QoS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// Publish/subscribe operations the climate entity needs from an MQTT client.
///
/// Implementations report failures as [`ClimateError::Transport`]; the entity
/// does not retry.
#[async_trait]
pub trait MqttTransport: Send + Sync {
    /// Publish `payload` on `topic`.
    async fn publish(
        &self,
        topic: &str,
        payload: &str,
        qos: QoS,
        retain: bool,
    ) -> ClimateResult<()>;

    /// Subscribe to `topic` (may be a filter).
    async fn subscribe(&self, topic: &str, qos: QoS) -> ClimateResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qos_from_u8() {
        assert_eq!(QoS::try_from(0).unwrap(), QoS::AtMostOnce);
        assert_eq!(QoS::try_from(2).unwrap(), QoS::ExactlyOnce);
        assert!(QoS::try_from(3).is_err());
    }

    #[test]
    fn test_qos_serde() {
        let qos: QoS = serde_json::from_str("1").unwrap();
        assert_eq!(qos, QoS::AtLeastOnce);
        assert_eq!(serde_json::to_string(&QoS::ExactlyOnce).unwrap(), "2");
        assert!(serde_json::from_str::<QoS>("7").is_err());
    }
}
