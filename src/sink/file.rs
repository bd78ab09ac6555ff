//! CSV file sink.
//!
//! Appends rows to a local CSV file. Rows of different widths share the
//! file, so the writer is flexible about record length.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{Writer, WriterBuilder};
use tracing::debug;

use super::{Cell, Sink, SinkError, Throttle};

/// A sink that writes rows to a CSV file.
///
/// Every appended row is flushed immediately so an interrupted run keeps
/// everything appended before the interruption.
#[derive(Debug)]
pub struct CsvSink {
    path: PathBuf,
    description: String,
    writer: Option<Writer<File>>,
    capacity: usize,
    rows: usize,
    throttle: Throttle,
}

impl CsvSink {
    /// Create (or truncate) the CSV file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let description = format!("csv: {}", path.display());
        let writer = Self::open_writer(&path)?;
        Ok(Self {
            path,
            description,
            writer: Some(writer),
            capacity: 0,
            rows: 0,
            throttle: Throttle::None,
        })
    }

    /// Set the pacing applied between rate-limited appends.
    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    /// Returns the path being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of rows appended since the last clear.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Pre-allocated row capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn open_writer(path: &Path) -> Result<Writer<File>, SinkError> {
        let file = File::create(path)?;
        Ok(WriterBuilder::new().flexible(true).from_writer(file))
    }

    fn writer(&mut self) -> Result<&mut Writer<File>, SinkError> {
        self.writer.as_mut().ok_or(SinkError::Closed)
    }
}

impl Sink for CsvSink {
    fn clear(&mut self) -> Result<(), SinkError> {
        if self.writer.is_none() {
            return Err(SinkError::Closed);
        }
        self.writer = Some(Self::open_writer(&self.path)?);
        self.rows = 0;
        Ok(())
    }

    fn resize(&mut self, rows: usize) -> Result<(), SinkError> {
        self.writer()?;
        debug!(rows, path = %self.path.display(), "Reserved sink rows");
        self.capacity = rows;
        Ok(())
    }

    fn append_row(&mut self, row: &[Cell]) -> Result<(), SinkError> {
        let writer = self.writer()?;
        writer.write_record(row.iter().map(|cell| cell.to_string()))?;
        writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }

    fn throttle(&self) -> Throttle {
        self.throttle
    }

    fn description(&self) -> &str {
        &self.description
    }
}

impl Drop for CsvSink {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
