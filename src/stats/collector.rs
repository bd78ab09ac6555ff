//! Per-sensor accumulation of numeric readings.

use std::collections::HashMap;

/// Attempt to read a reading value as a finite decimal number.
///
/// Single underscores between digits are accepted as separators (`1_000`).
/// Non-numeric payloads such as `motion detected` yield `None`.
pub fn coerce_numeric(value: &str) -> Option<f64> {
    let value = value.trim();
    let parsed = if value.contains('_') {
        strip_digit_separators(value)?.parse::<f64>()
    } else {
        value.parse::<f64>()
    };
    parsed.ok().filter(|v| v.is_finite())
}

/// Remove underscores that sit between two ASCII digits; any other
/// underscore makes the value invalid.
fn strip_digit_separators(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    let digit = |c: Option<u8>| c.is_some_and(|c| c.is_ascii_digit());
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'_' {
            continue;
        }
        let before = i.checked_sub(1).map(|j| bytes[j]);
        let after = bytes.get(i + 1).copied();
        if !(digit(before) && digit(after)) {
            return None;
        }
    }
    Some(value.replace('_', ""))
}

/// Numeric readings collected for one run, keyed by sensor label.
///
/// Series are kept in the order their sensor first produced a numeric
/// reading; values within a series keep arrival order.
#[derive(Debug, Clone, Default)]
pub struct SensorSeries {
    /// Position of each sensor in `series`.
    index: HashMap<String, usize>,
    series: Vec<(String, Vec<f64>)>,
}

impl SensorSeries {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a reading value for a sensor.
    ///
    /// Returns the coerced value when it was retained, `None` when the value
    /// was not numeric and was ignored.
    pub fn offer(&mut self, sensor: &str, value: &str) -> Option<f64> {
        let number = coerce_numeric(value)?;
        self.push(sensor, number);
        Some(number)
    }

    /// Append an already numeric value to a sensor's series.
    pub fn push(&mut self, sensor: &str, value: f64) {
        match self.index.get(sensor) {
            Some(&i) => self.series[i].1.push(value),
            None => {
                self.index.insert(sensor.to_string(), self.series.len());
                self.series.push((sensor.to_string(), vec![value]));
            }
        }
    }

    /// Values collected for a sensor.
    pub fn get(&self, sensor: &str) -> Option<&[f64]> {
        self.index.get(sensor).map(|&i| self.series[i].1.as_slice())
    }

    /// Iterate `(sensor, values)` in first-observed order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.series.iter().map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Number of sensors with at least one numeric reading.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Total number of retained values across all sensors.
    pub fn total_values(&self) -> usize {
        self.series.iter().map(|(_, v)| v.len()).sum()
    }
}
