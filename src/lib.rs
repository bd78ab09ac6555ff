//! # sensorlog
//!
//! Records microcontroller sensor telemetry read from a serial link and
//! summarizes it per sensor at the end of a timed collection window.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌────────────┐   ┌──────────┐
//! │  source  │──▶│ telemetry │──▶│  session   │──▶│   sink   │
//! │ (lines)  │   │ (parse +  │   │ (run loop) │   │  (rows)  │
//! └──────────┘   │ classify) │   └─────┬──────┘   └──────────┘
//!                └───────────┘         │                ▲
//!                                      ▼                │
//!                                ┌───────────┐          │
//!                                │   stats   │──────────┘
//!                                └───────────┘
//! ```
//!
//! - **[`source`]**: [`LineSource`] trait with a serial/stream source, a
//!   capture-file replay source and a channel source
//! - **[`telemetry`]**: The telemetry line grammar and sensor classification
//! - **[`stats`]**: Per-sensor numeric series and end-of-run statistics
//! - **[`sink`]**: [`Sink`] trait with CSV file and in-memory tables
//! - **[`session`]**: The run loop tying them together
//!
//! ## Usage
//!
//! ```bash
//! # Record from the default serial port for 45 seconds
//! sensorlog --port /dev/ttyACM0 --output readings.csv
//!
//! # Replay a captured serial log
//! sensorlog --replay capture.log --output readings.csv
//! ```
//!
//! ### As a library
//!
//! ```
//! use std::time::Duration;
//! use sensorlog::{ChannelSource, MemorySink, Session, SessionConfig};
//!
//! let (tx, source) = ChannelSource::create("example");
//! tx.send("FORWARD HC-SR04 Distance: 12,5 cm at 2024/3/5 14:2:9".to_string()).unwrap();
//! drop(tx);
//!
//! let sink = MemorySink::new();
//! let config = SessionConfig {
//!     duration: Duration::from_secs(1),
//!     idle_interval: Duration::from_millis(1),
//!     stop_when_drained: true,
//!     ..SessionConfig::default()
//! };
//! let report = Session::run(Box::new(source), Box::new(sink), config).unwrap();
//! assert_eq!(report.rows_appended, 1);
//! assert_eq!(report.statistics[0].mean, 12.5);
//! ```

pub mod config;
pub mod logging;
pub mod session;
pub mod sink;
pub mod source;
pub mod stats;
pub mod telemetry;

// Re-export main types for convenience
pub use config::Settings;
pub use session::{Phase, RunReport, Session, SessionConfig};
pub use sink::{Cell, CsvSink, MemorySink, Sink, SinkError, Throttle};
pub use source::{ChannelSource, FileSource, LineSource, StreamSource};
pub use stats::{SensorSeries, SensorStatistics, StatsError};
pub use telemetry::{ParsedReading, SensorCategory};
