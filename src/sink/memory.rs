//! In-memory sink.
//!
//! Keeps rows in a shared table so the caller can inspect them after the
//! sink has been handed to a session.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Cell, Sink, SinkError, Throttle};

/// Contents of a [`MemorySink`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryTable {
    pub rows: Vec<Vec<Cell>>,
    pub capacity: usize,
    pub column_widths: BTreeMap<usize, u32>,
    pub clears: usize,
    pub closed: bool,
}

impl MemoryTable {
    /// Rendered text of every row.
    pub fn text_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect()
    }
}

/// A sink that appends rows to a shared in-memory table.
///
/// # Example
///
/// ```
/// use sensorlog::{Cell, MemorySink, Sink};
///
/// let mut sink = MemorySink::new();
/// let table = sink.table();
/// sink.append_row(&[Cell::text("hello")]).unwrap();
/// assert_eq!(table.lock().unwrap().rows.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MemorySink {
    table: Arc<Mutex<MemoryTable>>,
    throttle: Throttle,
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySink {
    /// Create an empty in-memory sink.
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(MemoryTable::default())),
            throttle: Throttle::None,
        }
    }

    /// Set the pacing applied between rate-limited appends.
    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    /// Shared handle to the table.
    pub fn table(&self) -> Arc<Mutex<MemoryTable>> {
        self.table.clone()
    }

    /// Copy of the current table contents.
    pub fn snapshot(&self) -> MemoryTable {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open_table(&self) -> Result<MutexGuard<'_, MemoryTable>, SinkError> {
        let table = self.lock();
        if table.closed {
            return Err(SinkError::Closed);
        }
        Ok(table)
    }
}

impl Sink for MemorySink {
    fn clear(&mut self) -> Result<(), SinkError> {
        let mut table = self.open_table()?;
        table.rows.clear();
        table.clears += 1;
        Ok(())
    }

    fn resize(&mut self, rows: usize) -> Result<(), SinkError> {
        let mut table = self.open_table()?;
        table.capacity = rows;
        let additional = rows.saturating_sub(table.rows.len());
        table.rows.reserve(additional);
        Ok(())
    }

    fn append_row(&mut self, row: &[Cell]) -> Result<(), SinkError> {
        self.open_table()?.rows.push(row.to_vec());
        Ok(())
    }

    fn set_column_width(&mut self, column: usize, width: u32) -> Result<(), SinkError> {
        self.open_table()?.column_widths.insert(column, width);
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.lock().closed = true;
        Ok(())
    }

    fn throttle(&self) -> Throttle {
        self.throttle
    }

    fn description(&self) -> &str {
        "memory"
    }
}
