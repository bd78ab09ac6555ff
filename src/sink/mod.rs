//! Tabular sink abstraction for recorded rows.
//!
//! A sink is an append-only table. Data rows are appended as readings
//! arrive; the statistics block is appended once the run ends.

mod file;
mod memory;

pub use file::CsvSink;
pub use memory::{MemorySink, MemoryTable};

use std::fmt::{self, Debug};
use std::time::Duration;

use thiserror::Error;

/// Header of data rows.
pub const DATA_HEADERS: [&str; 6] = [
    "Local Timestamp",
    "Arduino Timestamp",
    "Sensor",
    "Reading",
    "Units",
    "Raw Line",
];

/// Header of the statistics block.
pub const STATS_HEADERS: [&str; 8] = [
    "Sensor",
    "Count",
    "Mean",
    "Median",
    "Min",
    "Max",
    "Std Dev",
    "Calculation Time",
];

/// Marker cell opening the statistics block.
pub const STATS_MARKER: &str = "STATISTICS:";

/// Column widths (in pixels) for the data columns, A through F.
pub const DATA_COLUMN_WIDTHS: [u32; 6] = [140, 160, 120, 100, 60, 260];

/// Errors reported by a sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The sink was already closed.
    #[error("sink is closed")]
    Closed,

    /// The sink refused the row.
    #[error("row rejected: {0}")]
    Rejected(String),
}

/// One cell of a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Count(usize),
    Number(f64),
    /// Rendered as `N/A`.
    NotApplicable,
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    /// A row of `n` empty cells.
    pub fn blank_row(n: usize) -> Vec<Cell> {
        vec![Cell::Empty; n]
    }

    /// A row of text cells.
    pub fn text_row<S: AsRef<str>>(cells: &[S]) -> Vec<Cell> {
        cells.iter().map(|s| Cell::text(s.as_ref())).collect()
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Count(n) => write!(f, "{}", n),
            Cell::Number(v) => write!(f, "{}", v),
            Cell::NotApplicable => f.write_str("N/A"),
        }
    }
}

/// Pacing applied after rate-limited appends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Throttle {
    /// No delay.
    #[default]
    None,
    /// Sleep for a fixed duration.
    Fixed(Duration),
}

impl Throttle {
    /// Build a throttle from a millisecond delay; zero disables it.
    pub fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            Throttle::None
        } else {
            Throttle::Fixed(Duration::from_millis(ms))
        }
    }

    /// Block the caller for the configured delay.
    pub fn pause(&self) {
        if let Throttle::Fixed(delay) = self {
            std::thread::sleep(*delay);
        }
    }
}

/// Trait for tabular append targets.
///
/// Implementations must preserve append order.
pub trait Sink: Send + Debug {
    /// Remove every row.
    fn clear(&mut self) -> Result<(), SinkError>;

    /// Pre-allocate room for `rows` rows.
    fn resize(&mut self, rows: usize) -> Result<(), SinkError>;

    /// Append one row after the last appended row.
    fn append_row(&mut self, row: &[Cell]) -> Result<(), SinkError>;

    /// Set a column's display width. Cosmetic; ignored by default.
    fn set_column_width(&mut self, _column: usize, _width: u32) -> Result<(), SinkError> {
        Ok(())
    }

    /// Flush buffered rows and release the target.
    fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Pacing to apply between rate-limited appends.
    fn throttle(&self) -> Throttle {
        Throttle::None
    }

    /// Returns a human-readable description of the sink.
    fn description(&self) -> &str;
}
