//! Collection session: the run loop driving source, parser, collector and
//! sink for one timed window.
//!
//! ```text
//! Initializing ──▶ Collecting ──▶ Summarizing ──▶ Closed
//! ```
//!
//! The source and sink are released when the session is closed or dropped,
//! whichever comes first, so every exit path releases them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::sink::{
    Cell, Sink, DATA_COLUMN_WIDTHS, DATA_HEADERS, STATS_HEADERS, STATS_MARKER,
};
use crate::source::LineSource;
use crate::stats::{self, SensorSeries, SensorStatistics};
use crate::telemetry::{local_timestamp, ParsedReading};

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Initializing,
    Collecting,
    Summarizing,
    Closed,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Initializing => "initializing",
            Phase::Collecting => "collecting",
            Phase::Summarizing => "summarizing",
            Phase::Closed => "closed",
        }
    }
}

/// Parameters of one run.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Length of the collection window.
    pub duration: Duration,
    /// Sleep between polls when no line is available.
    pub idle_interval: Duration,
    /// Rows to pre-allocate in the sink.
    pub max_rows: usize,
    /// End the window early once the source has ended and been drained.
    pub stop_when_drained: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(45),
            idle_interval: Duration::from_millis(100),
            max_rows: 10_000,
            stop_when_drained: false,
        }
    }
}

impl From<&Settings> for SessionConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            duration: settings.collection.duration(),
            idle_interval: settings.collection.idle_interval(),
            max_rows: settings.sink.max_rows,
            stop_when_drained: settings.collection.stop_when_drained,
        }
    }
}

/// Outcome of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Non-empty lines taken from the source.
    pub lines_received: usize,
    /// Lines that did not match the telemetry grammar.
    pub lines_rejected: usize,
    /// Data rows appended to the sink.
    pub rows_appended: usize,
    /// Rows (data or statistics) the sink failed to append.
    pub rows_failed: usize,
    /// Readings retained for statistics.
    pub numeric_readings: usize,
    /// Statistics written, in first-observed sensor order.
    pub statistics: Vec<SensorStatistics>,
    /// Sensors whose statistics could not be computed.
    pub statistics_skipped: usize,
}

/// One collection run over a source and a sink.
#[derive(Debug)]
pub struct Session {
    source: Box<dyn LineSource>,
    sink: Box<dyn Sink>,
    config: SessionConfig,
    series: SensorSeries,
    report: RunReport,
    phase: Phase,
    cancel: Option<Arc<AtomicBool>>,
}

impl Session {
    /// Prepare the sink and enter the collecting phase.
    ///
    /// The sink is cleared, sized, given the data header row and column
    /// widths. Any failure here is fatal; the source and sink are released
    /// before the error is returned.
    pub fn open(
        source: Box<dyn LineSource>,
        sink: Box<dyn Sink>,
        config: SessionConfig,
    ) -> Result<Self> {
        let mut session = Self {
            source,
            sink,
            config,
            series: SensorSeries::new(),
            report: RunReport::default(),
            phase: Phase::Initializing,
            cancel: None,
        };

        info!(
            source = session.source.description(),
            sink = session.sink.description(),
            "Initializing session"
        );
        session.prepare_sink()?;
        session.phase = Phase::Collecting;
        Ok(session)
    }

    /// Stop collecting early once `flag` is set.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Run a whole session: open, collect, summarize, close.
    pub fn run(
        source: Box<dyn LineSource>,
        sink: Box<dyn Sink>,
        config: SessionConfig,
    ) -> Result<RunReport> {
        let mut session = Self::open(source, sink, config)?;
        session.collect()?;
        session.summarize()?;
        Ok(session.close())
    }

    fn prepare_sink(&mut self) -> Result<()> {
        self.sink.clear().context("failed to clear sink")?;
        self.sink
            .resize(self.config.max_rows)
            .context("failed to resize sink")?;
        self.sink
            .append_row(&Cell::text_row(&DATA_HEADERS))
            .context("failed to write header row")?;
        for (column, width) in DATA_COLUMN_WIDTHS.iter().enumerate() {
            self.sink
                .set_column_width(column, *width)
                .context("failed to set column width")?;
        }
        info!(sink = self.sink.description(), "Cleared old data and set up headers");
        Ok(())
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Numeric readings collected so far.
    pub fn series(&self) -> &SensorSeries {
        &self.series
    }

    /// Counters collected so far.
    pub fn report(&self) -> &RunReport {
        &self.report
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Poll the source until the collection window has elapsed.
    ///
    /// Per-line failures are logged and never end the window.
    pub fn collect(&mut self) -> Result<()> {
        if self.phase != Phase::Collecting {
            bail!("cannot collect while {}", self.phase.label());
        }

        info!(duration = ?self.config.duration, "Starting data collection");
        let started = Instant::now();

        while started.elapsed() < self.config.duration {
            if self.cancelled() {
                info!("Collection interrupted");
                break;
            }

            match self.source.poll_line() {
                Some(line) => self.record_line(&line),
                None => {
                    if self.config.stop_when_drained && self.source.is_closed() {
                        info!(source = self.source.description(), "Source drained");
                        break;
                    }
                    std::thread::sleep(self.config.idle_interval);
                }
            }
        }

        if let Some(err) = self.source.error() {
            debug!(error = %err, "Source reported an error");
        }
        info!(
            lines = self.report.lines_received,
            rows = self.report.rows_appended,
            rejected = self.report.lines_rejected,
            "Data collection complete"
        );
        self.phase = Phase::Summarizing;
        Ok(())
    }

    /// Parse one raw line, append it as a data row and offer its value to
    /// the collector.
    ///
    /// Lines outside the telemetry grammar are dropped. A failed append is
    /// logged; the reading still counts toward statistics.
    pub fn record_line(&mut self, line: &str) {
        self.report.lines_received += 1;

        let Some(reading) = ParsedReading::from_line(line) else {
            debug!(line, "Ignoring non-telemetry line");
            self.report.lines_rejected += 1;
            return;
        };

        match self.sink.append_row(&data_row(&reading, line)) {
            Ok(()) => {
                self.report.rows_appended += 1;
                info!(
                    sensor = %reading.category,
                    value = %reading.value,
                    units = %reading.units,
                    device_time = %reading.device_timestamp,
                    "Appended row"
                );
            }
            Err(e) => {
                self.report.rows_failed += 1;
                warn!(error = %e, line, "Failed to append row");
            }
        }

        if self
            .series
            .offer(reading.category.label(), &reading.value)
            .is_some()
        {
            self.report.numeric_readings += 1;
        }
    }

    /// Compute statistics and append the statistics block.
    ///
    /// Runs once. The sink's throttle is applied after every statistics row.
    pub fn summarize(&mut self) -> Result<()> {
        if self.phase != Phase::Summarizing {
            bail!("cannot summarize while {}", self.phase.label());
        }

        info!(sensors = self.series.len(), "Calculating and writing statistics");
        self.append_block_row(&Cell::blank_row(DATA_HEADERS.len()));
        self.append_block_row(&[Cell::text(STATS_MARKER)]);
        self.append_block_row(&Cell::text_row(&STATS_HEADERS));

        let (computed, failed) = stats::summarize(&self.series, local_timestamp);
        for err in &failed {
            warn!(error = %err, "Skipping statistics row");
        }

        let throttle = self.sink.throttle();
        for stats in &computed {
            self.append_block_row(&stats_row(stats));
            throttle.pause();
            info!(
                sensor = %stats.sensor,
                count = stats.count,
                mean = stats.mean,
                median = stats.median,
                min = stats.min,
                max = stats.max,
                std_dev = %stats.std_dev.map_or("N/A".to_string(), |s| s.to_string()),
                "Sensor statistics"
            );
        }

        self.append_block_row(&Cell::blank_row(STATS_HEADERS.len()));

        self.report.statistics = computed;
        self.report.statistics_skipped = failed.len();
        Ok(())
    }

    fn append_block_row(&mut self, row: &[Cell]) {
        if let Err(e) = self.sink.append_row(row) {
            self.report.rows_failed += 1;
            warn!(error = %e, "Failed to append statistics row");
        }
    }

    /// Release the source and sink and return the report.
    pub fn close(mut self) -> RunReport {
        self.release();
        std::mem::take(&mut self.report)
    }

    fn release(&mut self) {
        if self.phase == Phase::Closed {
            return;
        }
        self.source.close();
        if let Err(e) = self.sink.close() {
            warn!(error = %e, "Failed to close sink");
        }
        info!(source = self.source.description(), "Source closed");
        self.phase = Phase::Closed;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release();
    }
}

/// `[Local Timestamp, Arduino Timestamp, Sensor, Reading, Units, Raw Line]`
fn data_row(reading: &ParsedReading, line: &str) -> Vec<Cell> {
    vec![
        Cell::text(reading.local_timestamp.as_str()),
        Cell::text(reading.device_timestamp.as_str()),
        Cell::text(reading.category.label()),
        Cell::text(reading.value.as_str()),
        Cell::text(reading.units.as_str()),
        Cell::text(line),
    ]
}

/// `[Sensor, Count, Mean, Median, Min, Max, Std Dev, Calculation Time]`
fn stats_row(stats: &SensorStatistics) -> Vec<Cell> {
    vec![
        Cell::text(stats.sensor.as_str()),
        Cell::Count(stats.count),
        Cell::Number(stats.mean),
        Cell::Number(stats.median),
        Cell::Number(stats.min),
        Cell::Number(stats.max),
        stats.std_dev.map_or(Cell::NotApplicable, Cell::Number),
        Cell::text(stats.computed_at.as_str()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use crate::source::ChannelSource;

    fn quick_config() -> SessionConfig {
        SessionConfig {
            duration: Duration::from_millis(200),
            idle_interval: Duration::from_millis(1),
            max_rows: 100,
            stop_when_drained: true,
        }
    }

    #[test]
    fn test_open_writes_header() {
        let (_tx, source) = ChannelSource::create("test");
        let sink = MemorySink::new();
        let table = sink.table();

        let session = Session::open(Box::new(source), Box::new(sink), quick_config()).unwrap();
        assert_eq!(session.phase(), Phase::Collecting);

        let table = table.lock().unwrap();
        assert_eq!(table.clears, 1);
        assert_eq!(table.capacity, 100);
        assert_eq!(table.text_rows(), vec![DATA_HEADERS.to_vec()]);
        assert_eq!(table.column_widths.get(&5), Some(&260));
    }

    #[test]
    fn test_record_line_counts() {
        let (_tx, source) = ChannelSource::create("test");
        let mut session =
            Session::open(Box::new(source), Box::new(MemorySink::new()), quick_config()).unwrap();

        session.record_line("FORWARD HC-SR04 Distance: 10 cm at 2024/1/1 0:0:0");
        session.record_line("FORWARD PIR Reading: motion detected at 2024/1/1 0:0:1");
        session.record_line("garbage");

        let report = session.report();
        assert_eq!(report.lines_received, 3);
        assert_eq!(report.rows_appended, 2);
        assert_eq!(report.lines_rejected, 1);
        assert_eq!(report.numeric_readings, 1);
        assert_eq!(session.series().get("Ultrasonic"), Some(&[10.0][..]));
    }

    #[test]
    fn test_phases_are_enforced() {
        let (_tx, source) = ChannelSource::create("test");
        let mut session =
            Session::open(Box::new(source), Box::new(MemorySink::new()), quick_config()).unwrap();

        assert!(session.summarize().is_err());
        session.collect().unwrap();
        assert_eq!(session.phase(), Phase::Summarizing);
        assert!(session.collect().is_err());
        session.summarize().unwrap();

        let report = session.close();
        assert!(report.statistics.is_empty());
    }

    #[test]
    fn test_close_releases_resources() {
        let (tx, source) = ChannelSource::create("test");
        let sink = MemorySink::new();
        let table = sink.table();

        let session = Session::open(Box::new(source), Box::new(sink), quick_config()).unwrap();
        drop(session);

        assert!(table.lock().unwrap().closed);
        assert!(tx.send("late".to_string()).is_err());
    }

    #[test]
    fn test_cancel_stops_collection() {
        let (_tx, source) = ChannelSource::create("test");
        let flag = Arc::new(AtomicBool::new(true));
        let config = SessionConfig {
            duration: Duration::from_secs(30),
            ..quick_config()
        };

        let mut session = Session::open(Box::new(source), Box::new(MemorySink::new()), config)
            .unwrap()
            .with_cancel(flag);

        let started = Instant::now();
        session.collect().unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_stats_row_layout() {
        let stats = SensorStatistics {
            sensor: "Flame".to_string(),
            count: 1,
            mean: 3.0,
            median: 3.0,
            min: 3.0,
            max: 3.0,
            std_dev: None,
            computed_at: "2024-01-01 00:00:00".to_string(),
        };
        let row: Vec<String> = stats_row(&stats).iter().map(|c| c.to_string()).collect();
        assert_eq!(
            row,
            vec!["Flame", "1", "3", "3", "3", "3", "N/A", "2024-01-01 00:00:00"]
        );
    }
}
