//! Telemetry line grammar.
//!
//! A telemetry line looks like:
//!
//! ```text
//! FORWARD <sensor descriptor> Reading: <payload> at 2024/3/5 14:02:09
//! FORWARD <sensor descriptor> Distance: <payload> at 2024/3/5 14:02:09
//! ```
//!
//! The descriptor and payload are captured lazily, so the match is the
//! shortest span that satisfies every fixed anchor.

use std::sync::LazyLock;

use regex::Regex;

static TELEMETRY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"FORWARD\s+(?P<sensor>.*?)\s+(?:Reading:|Distance:)\s*(?P<reading>.*?)\s+at\s+(?P<timestamp>\d{4}/\d{1,2}/\d{1,2}\s+\d{1,2}:\d{1,2}:\d{1,2})",
    )
    .expect("invalid telemetry grammar")
});

/// The three captures of an accepted telemetry line, borrowed from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineMatch<'a> {
    /// Sensor descriptor, e.g. `HC-SR04 ultrasonic`.
    pub sensor: &'a str,
    /// Reading payload, e.g. `12,5 cm`.
    pub reading: &'a str,
    /// Device timestamp, `YYYY/M/D H:M:S`.
    pub device_timestamp: &'a str,
}

/// Match a raw line against the telemetry grammar.
///
/// Returns `None` when the line does not contain a telemetry record.
pub fn parse_line(line: &str) -> Option<LineMatch<'_>> {
    let caps = TELEMETRY_LINE.captures(line)?;
    Some(LineMatch {
        sensor: caps.name("sensor")?.as_str().trim(),
        reading: caps.name("reading")?.as_str().trim(),
        device_timestamp: caps.name("timestamp")?.as_str().trim(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_distance_line() {
        let m = parse_line("FORWARD HC-SR04 ultrasonic Distance: 12,5 cm at 2024/3/5 14:2:9").unwrap();
        assert_eq!(m.sensor, "HC-SR04 ultrasonic");
        assert_eq!(m.reading, "12,5 cm");
        assert_eq!(m.device_timestamp, "2024/3/5 14:2:9");
    }

    #[test]
    fn test_parse_reading_line() {
        let m = parse_line("FORWARD PIR sensor Reading: motion detected at 2024/1/1 0:0:0").unwrap();
        assert_eq!(m.sensor, "PIR sensor");
        assert_eq!(m.reading, "motion detected");
        assert_eq!(m.device_timestamp, "2024/1/1 0:0:0");
    }

    #[test]
    fn test_parse_with_prefix_noise() {
        let m = parse_line("[rx] FORWARD HW-201 Reading: 1 at 2024/12/31 23:59:59").unwrap();
        assert_eq!(m.sensor, "HW-201");
        assert_eq!(m.reading, "1");
        assert_eq!(m.device_timestamp, "2024/12/31 23:59:59");
    }

    #[test]
    fn test_parse_no_whitespace_after_label() {
        let m = parse_line("FORWARD RQ-S003 flame Reading:512 at 2024/6/7 8:09:10").unwrap();
        assert_eq!(m.reading, "512");
    }

    #[test]
    fn test_parse_lazy_payload() {
        // The payload stops at the first " at <timestamp>".
        let line = "FORWARD PIR Reading: clear at 2024/1/1 1:00:00 at 2024/1/1 2:00:00";
        let m = parse_line(line).unwrap();
        assert_eq!(m.reading, "clear");
        assert_eq!(m.device_timestamp, "2024/1/1 1:00:00");
    }

    #[test]
    fn test_parse_lazy_sensor_with_repeated_label() {
        let line = "FORWARD PIR Reading: x Reading: y at 2024/1/1 1:00:00";
        let m = parse_line(line).unwrap();
        assert_eq!(m.sensor, "PIR");
        assert_eq!(m.reading, "x Reading: y");
    }

    #[test]
    fn test_parse_payload_containing_at_word() {
        let line = "FORWARD PIR Reading: look at me at 2024/1/1 1:00:00";
        let m = parse_line(line).unwrap();
        assert_eq!(m.reading, "look at me");
    }

    #[test]
    fn test_reject_missing_timestamp() {
        assert!(parse_line("FORWARD PIR sensor Reading: motion detected").is_none());
        assert!(parse_line("FORWARD PIR sensor Reading: motion detected at yesterday").is_none());
    }

    #[test]
    fn test_reject_missing_keyword_or_label() {
        assert!(parse_line("PIR sensor Reading: 1 at 2024/1/1 0:0:0").is_none());
        assert!(parse_line("forward PIR sensor Reading: 1 at 2024/1/1 0:0:0").is_none());
        assert!(parse_line("FORWARD PIR sensor Value: 1 at 2024/1/1 0:0:0").is_none());
        assert!(parse_line("FORWARD PIR sensor reading: 1 at 2024/1/1 0:0:0").is_none());
        assert!(parse_line("").is_none());
    }

    #[test]
    fn test_reject_out_of_order_anchors() {
        assert!(parse_line("Reading: 1 FORWARD PIR at 2024/1/1 0:0:0").is_none());
    }

    #[test]
    fn test_timestamp_shape() {
        let m = parse_line("FORWARD X Reading: 1 at 2024/10/11 12:34:56").unwrap();
        assert_eq!(m.device_timestamp, "2024/10/11 12:34:56");
        assert!(parse_line("FORWARD X Reading: 1 at 24/10/11 12:34:56").is_none());
    }
}
