//! Runtime settings.
//!
//! Settings are layered: built-in defaults, then an optional TOML file,
//! then environment variables prefixed with `SENSORLOG_` (nested keys are
//! separated by `__`, e.g. `SENSORLOG_SERIAL__BAUD_RATE=115200`).
//!
//! ```toml
//! log_level = "info"
//!
//! [serial]
//! port = "/dev/ttyACM0"
//! baud_rate = 9600
//!
//! [sink]
//! path = "readings.csv"
//! stats_row_delay_ms = 1000
//!
//! [collection]
//! duration_secs = 45
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "SENSORLOG";

/// Serial transport settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Device node of the board, e.g. `/dev/ttyACM0`.
    pub port: PathBuf,
    pub baud_rate: u32,
    /// Delay after opening the port before reading, in milliseconds.
    pub settle_ms: u64,
    /// Apply `baud_rate` to the device with `stty` before opening it.
    pub configure_tty: bool,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: PathBuf::from("/dev/ttyACM0"),
            baud_rate: 9600,
            settle_ms: 2000,
            configure_tty: true,
        }
    }
}

/// Output table settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SinkSettings {
    /// CSV file receiving the rows.
    pub path: PathBuf,
    /// Rows to pre-allocate.
    pub max_rows: usize,
    /// Delay after each statistics row, in milliseconds.
    pub stats_row_delay_ms: u64,
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("readings.csv"),
            max_rows: 10_000,
            stats_row_delay_ms: 1000,
        }
    }
}

/// Collection window settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CollectionSettings {
    pub duration_secs: u64,
    /// Sleep between polls when no line is available, in milliseconds.
    pub idle_ms: u64,
    /// End the window early once the source has ended and been drained.
    pub stop_when_drained: bool,
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self {
            duration_secs: 45,
            idle_ms: 100,
            stop_when_drained: false,
        }
    }
}

impl CollectionSettings {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_ms)
    }
}

/// Complete settings for one run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub serial: SerialSettings,
    pub sink: SinkSettings,
    pub collection: CollectionSettings,
    /// Log level used when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            serial: SerialSettings::default(),
            sink: SinkSettings::default(),
            collection: CollectionSettings::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from an optional file and the `SENSORLOG_` environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    /// Load settings from an optional file and environment variables with
    /// the given prefix.
    pub fn load_with_prefix(path: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("failed to load settings")?;
        let settings: Settings = config
            .try_deserialize()
            .context("failed to deserialize settings")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings a run cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.as_os_str().is_empty() {
            bail!("serial.port must not be empty");
        }
        if self.serial.baud_rate == 0 {
            bail!("serial.baud_rate must be positive");
        }
        if self.sink.path.as_os_str().is_empty() {
            bail!("sink.path must not be empty");
        }
        Ok(())
    }
}
