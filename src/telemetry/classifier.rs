//! Sensor classification.
//!
//! Maps the free-form sensor descriptor of a telemetry line onto a canonical
//! [`SensorCategory`] and derives the reading value and units for it.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Leading numeric token of an ultrasonic payload with an optional unit.
static DISTANCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<value>[\d,.]+)\s*(?P<unit>cm|mm)?").expect("invalid distance grammar")
});

/// Unit reported when an ultrasonic reading carries none.
const DEFAULT_DISTANCE_UNIT: &str = "cm";

/// Device signatures, checked in order; the first contained signature wins.
const SIGNATURES: &[(&str, SensorCategory)] = &[
    ("PIR", SensorCategory::PirMotion),
    ("HC-SR04", SensorCategory::Ultrasonic),
    ("RQ-S003", SensorCategory::Flame),
    ("HW-201", SensorCategory::Vibration),
];

/// Canonical sensor category.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SensorCategory {
    PirMotion,
    Ultrasonic,
    Flame,
    Vibration,
    /// No known signature matched; carries the descriptor verbatim.
    Other(String),
}

impl SensorCategory {
    /// Returns the human-readable label written to the sink.
    pub fn label(&self) -> &str {
        match self {
            SensorCategory::PirMotion => "PIR Motion",
            SensorCategory::Ultrasonic => "Ultrasonic",
            SensorCategory::Flame => "Flame",
            SensorCategory::Vibration => "Vibration",
            SensorCategory::Other(descriptor) => descriptor,
        }
    }
}

impl fmt::Display for SensorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of classifying a sensor descriptor and its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: SensorCategory,
    pub value: String,
    pub units: String,
}

/// Classify a sensor descriptor and derive the reading value and units.
///
/// Total: a descriptor without a known signature becomes
/// [`SensorCategory::Other`] with the payload passed through.
pub fn classify(sensor: &str, reading: &str) -> Classification {
    let category = SIGNATURES
        .iter()
        .find(|(signature, _)| sensor.contains(signature))
        .map(|(_, category)| category.clone())
        .unwrap_or_else(|| SensorCategory::Other(sensor.to_string()));

    match category {
        SensorCategory::Ultrasonic => {
            let (value, units) = split_distance(reading);
            Classification {
                category,
                value,
                units,
            }
        }
        category => Classification {
            category,
            value: reading.to_string(),
            units: String::new(),
        },
    }
}

/// Split an ultrasonic payload into a dotted decimal and its unit.
///
/// Falls back to the verbatim payload with no unit when it does not start
/// with a numeric token.
fn split_distance(reading: &str) -> (String, String) {
    match DISTANCE.captures(reading) {
        Some(caps) => {
            let value = caps["value"].replace(',', ".");
            let units = caps
                .name("unit")
                .map_or(DEFAULT_DISTANCE_UNIT, |m| m.as_str())
                .to_string();
            (value, units)
        }
        None => (reading.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_pir() {
        let c = classify("PIR sensor", "motion detected");
        assert_eq!(c.category, SensorCategory::PirMotion);
        assert_eq!(c.category.label(), "PIR Motion");
        assert_eq!(c.value, "motion detected");
        assert_eq!(c.units, "");
    }

    #[test]
    fn test_classify_ultrasonic_comma_decimal() {
        let c = classify("HC-SR04 ultrasonic", "12,5 cm");
        assert_eq!(c.category, SensorCategory::Ultrasonic);
        assert_eq!(c.value, "12.5");
        assert_eq!(c.units, "cm");
    }

    #[test]
    fn test_classify_ultrasonic_millimetres() {
        let c = classify("HC-SR04", "125mm");
        assert_eq!(c.value, "125");
        assert_eq!(c.units, "mm");
    }

    #[test]
    fn test_classify_ultrasonic_default_unit() {
        let c = classify("HC-SR04", "33.1");
        assert_eq!(c.value, "33.1");
        assert_eq!(c.units, "cm");
    }

    #[test]
    fn test_classify_ultrasonic_without_number() {
        let c = classify("HC-SR04", "out of range");
        assert_eq!(c.category, SensorCategory::Ultrasonic);
        assert_eq!(c.value, "out of range");
        assert_eq!(c.units, "");
    }

    #[test]
    fn test_classify_flame_and_vibration() {
        let flame = classify("RQ-S003 flame", "512");
        assert_eq!(flame.category.label(), "Flame");
        assert_eq!(flame.value, "512");

        let vibration = classify("HW-201 module", "1");
        assert_eq!(vibration.category.label(), "Vibration");
        assert_eq!(vibration.units, "");
    }

    #[test]
    fn test_classify_first_signature_wins() {
        let c = classify("PIR+HC-SR04 combo", "5 cm");
        assert_eq!(c.category, SensorCategory::PirMotion);
        assert_eq!(c.value, "5 cm");
    }

    #[test]
    fn test_classify_is_case_sensitive() {
        let c = classify("pir sensor", "1");
        assert_eq!(c.category, SensorCategory::Other("pir sensor".to_string()));
    }

    #[test]
    fn test_classify_unknown_falls_back_to_descriptor() {
        let c = classify("DHT11 humidity", "45 %");
        assert_eq!(c.category.label(), "DHT11 humidity");
        assert_eq!(c.value, "45 %");
        assert_eq!(c.units, "");
    }

    #[test]
    fn test_classify_is_pure() {
        assert_eq!(classify("HC-SR04", "7,25 mm"), classify("HC-SR04", "7,25 mm"));
    }
}
