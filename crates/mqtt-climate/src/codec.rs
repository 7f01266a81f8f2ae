//! Temperature payload codec.
//!
//! Thermostats on the bus report their reading as free text such as
//! `21.5 °C`, `21.5C` or `70F`. This module turns that text into a value and a
//! [`TemperatureUnit`], converts between Celsius and Fahrenheit, and formats
//! the payloads published back to the bus.
//!
//! ## Payload grammar
//!
//! ```text
//! [digits][.[digits]] [ ] [°] (F|C) [anything]
//! ```
//!
//! The match is anchored at the start of the trimmed payload. A payload whose
//! numeric part is empty (`C`) or a lone decimal point (`.C`) matches the
//! grammar but is rejected when the number is converted.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::unit::TemperatureUnit;

static TEMPERATURE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<number>[0-9]*(?:\.[0-9]*)?) ?°?(?P<unit>[FC])")
        .expect("temperature payload pattern is valid")
});

/// A temperature read from a payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParsedTemperature {
    pub value: f64,
    pub unit: TemperatureUnit,
}

impl ParsedTemperature {
    pub fn new(value: f64, unit: TemperatureUnit) -> Self {
        Self { value, unit }
    }

    /// Express this reading in `unit`.
    pub fn in_unit(&self, unit: TemperatureUnit) -> f64 {
        convert_temperature(self.value, self.unit, unit)
    }
}

/// Parse a temperature payload. Returns `None` when the payload does not
/// follow the grammar or its number cannot be read.
pub fn parse_temperature(payload: &str) -> Option<ParsedTemperature> {
    let caps = TEMPERATURE_RE.captures(payload.trim())?;

    let symbol = caps.name("unit")?.as_str().chars().next()?;
    let unit = TemperatureUnit::from_symbol(symbol)?;

    let number = caps.name("number").map(|m| m.as_str()).unwrap_or_default();
    match number.parse::<f64>() {
        Ok(value) => Some(ParsedTemperature { value, unit }),
        Err(e) => {
            debug!("Temperature payload has no usable number '{}': {}", number, e);
            None
        }
    }
}

/// Convert `value` from one unit to another.
pub fn convert_temperature(value: f64, from: TemperatureUnit, to: TemperatureUnit) -> f64 {
    match (from, to) {
        (TemperatureUnit::Fahrenheit, TemperatureUnit::Celsius) => fahrenheit_to_celsius(value),
        (TemperatureUnit::Celsius, TemperatureUnit::Fahrenheit) => celsius_to_fahrenheit(value),
        (TemperatureUnit::Celsius, TemperatureUnit::Celsius)
        | (TemperatureUnit::Fahrenheit, TemperatureUnit::Fahrenheit) => value,
    }
}

pub fn fahrenheit_to_celsius(value: f64) -> f64 {
    (value - 32.0) * 5.0 / 9.0
}

pub fn celsius_to_fahrenheit(value: f64) -> f64 {
    (value * 9.0 / 5.0) + 32.0
}

/// Format an outbound temperature payload: `"<value> <unit>"`.
///
/// Whole numbers keep one decimal place so the payload always reads as a
/// decimal (`21.0 °C`).
pub fn format_temperature_payload(value: f64, unit: &str) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1} {}", value, unit)
    } else {
        format!("{} {}", value, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_parse_with_degree_sign() {
        let parsed = parse_temperature("21.5 °C").unwrap();
        assert_eq!(parsed, ParsedTemperature::new(21.5, TemperatureUnit::Celsius));
    }

    #[test]
    fn test_parse_compact() {
        let parsed = parse_temperature("70F").unwrap();
        assert_eq!(parsed.value, 70.0);
        assert_eq!(parsed.unit, TemperatureUnit::Fahrenheit);
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let parsed = parse_temperature("  19 C\n").unwrap();
        assert_eq!(parsed, ParsedTemperature::new(19.0, TemperatureUnit::Celsius));
    }

    #[test]
    fn test_parse_partial_decimals() {
        assert_eq!(parse_temperature("5.F").unwrap().value, 5.0);
        assert_eq!(parse_temperature(".5°C").unwrap().value, 0.5);
    }

    #[test]
    fn test_parse_ignores_trailing_text() {
        let parsed = parse_temperature("22C reported").unwrap();
        assert_eq!(parsed.value, 22.0);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_temperature("garbage").is_none());
        assert!(parse_temperature("").is_none());
        assert!(parse_temperature("   ").is_none());
        assert!(parse_temperature("21.5").is_none());
        assert!(parse_temperature("21.5 K").is_none());
        assert!(parse_temperature("21.5 c").is_none());
        assert!(parse_temperature("21.5  C").is_none());
        assert!(parse_temperature("-5 C").is_none());
    }

    #[test]
    fn test_parse_empty_number_is_failure() {
        assert!(parse_temperature("C").is_none());
        assert!(parse_temperature(".C").is_none());
        assert!(parse_temperature("°F").is_none());
    }

    #[test]
    fn test_parse_only_ascii_digits() {
        // Arabic-Indic and full-width digits
        assert!(parse_temperature("٢١ C").is_none());
        assert!(parse_temperature("２１C").is_none());
        assert_eq!(parse_temperature("21 C").unwrap().value, 21.0);
    }

    #[test]
    fn test_fahrenheit_to_celsius() {
        let c = convert_temperature(0.0, TemperatureUnit::Fahrenheit, TemperatureUnit::Celsius);
        assert!((c - (-17.777_777_777_777_78)).abs() < EPSILON);
        let c = convert_temperature(212.0, TemperatureUnit::Fahrenheit, TemperatureUnit::Celsius);
        assert!((c - 100.0).abs() < EPSILON);
    }

    #[test]
    fn test_celsius_to_fahrenheit() {
        let f = convert_temperature(100.0, TemperatureUnit::Celsius, TemperatureUnit::Fahrenheit);
        assert_eq!(f, 212.0);
        let f = convert_temperature(-40.0, TemperatureUnit::Celsius, TemperatureUnit::Fahrenheit);
        assert_eq!(f, -40.0);
    }

    #[test]
    fn test_same_unit_is_identity() {
        for unit in [TemperatureUnit::Celsius, TemperatureUnit::Fahrenheit] {
            for x in [-12.25, 0.0, 21.5, 98.6] {
                assert_eq!(convert_temperature(x, unit, unit), x);
            }
        }
    }

    #[test]
    fn test_conversion_round_trip() {
        for x in [-40.0, -3.3, 0.0, 17.0, 21.5, 37.77, 100.0] {
            let f = convert_temperature(x, TemperatureUnit::Celsius, TemperatureUnit::Fahrenheit);
            let back = convert_temperature(f, TemperatureUnit::Fahrenheit, TemperatureUnit::Celsius);
            assert!((back - x).abs() < EPSILON, "{} -> {} -> {}", x, f, back);
        }
    }

    #[test]
    fn test_in_unit() {
        let parsed = ParsedTemperature::new(50.0, TemperatureUnit::Fahrenheit);
        assert!((parsed.in_unit(TemperatureUnit::Celsius) - 10.0).abs() < EPSILON);
        assert_eq!(parsed.in_unit(TemperatureUnit::Fahrenheit), 50.0);
    }

    #[test]
    fn test_format_payload() {
        assert_eq!(format_temperature_payload(21.0, "°C"), "21.0 °C");
        assert_eq!(format_temperature_payload(21.5, "°C"), "21.5 °C");
        assert_eq!(format_temperature_payload(-3.25, "°F"), "-3.25 °F");
    }

    #[test]
    fn test_formatted_payload_parses_back() {
        let payload = format_temperature_payload(68.5, TemperatureUnit::Fahrenheit.as_str());
        let parsed = parse_temperature(&payload).unwrap();
        assert_eq!(parsed, ParsedTemperature::new(68.5, TemperatureUnit::Fahrenheit));
    }
}
