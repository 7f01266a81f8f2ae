//! Temperature units understood by the climate platform.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ClimateError;

/// Display string the host uses for Celsius.
pub const TEMP_CELSIUS: &str = "°C";
/// Display string the host uses for Fahrenheit.
pub const TEMP_FAHRENHEIT: &str = "°F";

/// Temperature unit of a payload or of the host display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Host display string (`°C` / `°F`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Celsius => TEMP_CELSIUS,
            Self::Fahrenheit => TEMP_FAHRENHEIT,
        }
    }

    /// Unit letter used in payloads.
    pub fn symbol(&self) -> char {
        match self {
            Self::Celsius => 'C',
            Self::Fahrenheit => 'F',
        }
    }

    /// Map a payload unit letter. Only upper-case `C` and `F` are accepted.
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            'C' => Some(Self::Celsius),
            'F' => Some(Self::Fahrenheit),
            other => {
                warn!("Error in parsing temperature unit: {:?}", other);
                None
            }
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemperatureUnit {
    type Err = ClimateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            TEMP_CELSIUS | "C" => Ok(Self::Celsius),
            TEMP_FAHRENHEIT | "F" => Ok(Self::Fahrenheit),
            word if word.eq_ignore_ascii_case("celsius") => Ok(Self::Celsius),
            word if word.eq_ignore_ascii_case("fahrenheit") => Ok(Self::Fahrenheit),
            other => Err(ClimateError::UnknownUnit(other.to_string())),
        }
    }
}
