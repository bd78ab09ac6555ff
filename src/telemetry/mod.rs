//! Telemetry line parsing and sensor classification.
//!
//! ## Submodules
//!
//! - [`parser`]: The `FORWARD ... Reading:/Distance: ... at <timestamp>` grammar
//! - [`classifier`]: Device signature dispatch to a [`SensorCategory`]
//!
//! ## Data Flow
//!
//! ```text
//! raw line
//!    │
//!    ▼
//! parse_line()  ──▶ None (dropped)
//!    │
//!    ▼
//! classify()
//!    │
//!    ▼
//! ParsedReading (+ local timestamp)
//! ```

pub mod classifier;
pub mod parser;

pub use classifier::{classify, Classification, SensorCategory};
pub use parser::{parse_line, LineMatch};

/// Local timestamp format used for data and statistics rows.
pub const LOCAL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current wall-clock time formatted for the sink.
pub fn local_timestamp() -> String {
    chrono::Local::now().format(LOCAL_TIMESTAMP_FORMAT).to_string()
}

/// A telemetry line that passed the grammar, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReading {
    pub category: SensorCategory,
    pub value: String,
    pub units: String,
    pub device_timestamp: String,
    /// Assigned when the line was parsed, not carried by the device.
    pub local_timestamp: String,
}

impl ParsedReading {
    /// Parse and classify a raw line, stamping it with `local_timestamp`.
    pub fn from_line_at(line: &str, local_timestamp: String) -> Option<Self> {
        let LineMatch {
            sensor,
            reading,
            device_timestamp,
        } = parse_line(line)?;
        let Classification {
            category,
            value,
            units,
        } = classify(sensor, reading);

        Some(Self {
            category,
            value,
            units,
            device_timestamp: device_timestamp.to_string(),
            local_timestamp,
        })
    }

    /// Parse and classify a raw line, stamping it with the current time.
    pub fn from_line(line: &str) -> Option<Self> {
        Self::from_line_at(line, local_timestamp())
    }
}
