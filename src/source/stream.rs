//! Stream-based line source.
//!
//! Receives telemetry lines from an async byte stream. This covers the
//! serial device, which is opened as a character device and read as a
//! plain byte stream on its own thread.

use std::io::{BufRead, Read};
use std::path::Path;
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{decode_line, is_blank, LineSource};

/// Lines buffered between the reader task and the consumer.
const QUEUE_DEPTH: usize = 1024;

/// A line source fed by a background task reading an async stream.
///
/// The task reads newline-terminated chunks and forwards decoded,
/// non-empty lines over a FIFO queue with a single consumer, so
/// `poll_line()` yields lines in arrival order.
///
/// # Example with a byte stream
///
/// ```
/// use std::io::Cursor;
/// use sensorlog::StreamSource;
///
/// # tokio_test::block_on(async {
/// let data = b"FORWARD PIR Reading: 1 at 2024/1/1 0:0:0\n";
/// let stream = Cursor::new(data.to_vec());
/// let source = StreamSource::spawn(stream, "example");
/// # });
/// ```
#[derive(Debug)]
pub struct StreamSource {
    receiver: mpsc::Receiver<String>,
    description: String,
    last_error: Arc<Mutex<Option<String>>>,
    task: Option<JoinHandle<()>>,
    disconnected: bool,
}

impl StreamSource {
    /// Spawn a background task that reads lines from the given async reader.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<R>(reader: R, description: &str) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let last_error = Arc::new(Mutex::new(None));
        let error_handle = last_error.clone();

        let task = tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            let mut buf = Vec::new();

            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => {
                        // EOF
                        set_error(&error_handle, "Connection closed".to_string());
                        break;
                    }
                    Ok(_) => {
                        let line = decode_line(&buf);
                        if is_blank(&line) {
                            continue;
                        }
                        if tx.send(line).await.is_err() {
                            // Receiver dropped
                            break;
                        }
                    }
                    Err(e) => {
                        set_error(&error_handle, format!("Read error: {}", e));
                        break;
                    }
                }
            }
        });

        Self {
            receiver: rx,
            description: format!("stream: {}", description),
            last_error,
            task: Some(task),
            disconnected: false,
        }
    }

    /// Read lines from a blocking reader on a dedicated thread.
    ///
    /// The thread is detached: closing the source never waits for a read in
    /// progress. The thread exits on EOF, on a read error, or at the first
    /// line received after the source was closed.
    pub fn spawn_blocking<R>(reader: R, description: &str) -> Result<Self>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let last_error = Arc::new(Mutex::new(None));
        let error_handle = last_error.clone();

        std::thread::Builder::new()
            .name("sensorlog-reader".to_string())
            .spawn(move || {
                let mut reader = std::io::BufReader::new(reader);
                let mut buf = Vec::new();

                loop {
                    buf.clear();
                    match reader.read_until(b'\n', &mut buf) {
                        Ok(0) => {
                            set_error(&error_handle, "Connection closed".to_string());
                            break;
                        }
                        Ok(_) => {
                            let line = decode_line(&buf);
                            if is_blank(&line) {
                                continue;
                            }
                            if tx.blocking_send(line).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            set_error(&error_handle, format!("Read error: {}", e));
                            break;
                        }
                    }
                }
            })
            .context("failed to start reader thread")?;

        Ok(Self {
            receiver: rx,
            description: format!("stream: {}", description),
            last_error,
            task: None,
            disconnected: false,
        })
    }

    /// Open a serial device node and start reading lines from it.
    ///
    /// When `configure_tty` is set the line speed is applied with `stty`
    /// first; a failure there is logged and the device is opened as-is.
    /// Reading starts after `settle`, giving the board time to reset. The
    /// device is read on its own thread, so a silent board never holds up
    /// shutdown.
    pub async fn open_serial(
        port: &Path,
        baud_rate: u32,
        configure_tty: bool,
        settle: Duration,
    ) -> Result<Self> {
        if configure_tty {
            configure_line_speed(port, baud_rate);
        }

        info!(port = %port.display(), baud_rate, "Opening serial port");
        let device = tokio::fs::OpenOptions::new()
            .read(true)
            .open(port)
            .await
            .with_context(|| format!("failed to open serial port {}", port.display()))?
            .into_std()
            .await;

        if !settle.is_zero() {
            debug!(?settle, "Waiting for the serial connection to settle");
            tokio::time::sleep(settle).await;
        }

        let description = format!("{} @ {} baud", port.display(), baud_rate);
        Self::spawn_blocking(device, &description)
    }

    /// Get the last error message, if any.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|e| e.clone())
    }
}

fn set_error(handle: &Mutex<Option<String>>, message: String) {
    if let Ok(mut slot) = handle.lock() {
        *slot = Some(message);
    }
}

/// Apply raw mode and the line speed to a tty with `stty`.
fn configure_line_speed(port: &Path, baud_rate: u32) {
    let status = Command::new("stty")
        .arg("-F")
        .arg(port)
        .arg(baud_rate.to_string())
        .args(["raw", "-echo"])
        .status();

    match status {
        Ok(status) if status.success() => {
            debug!(port = %port.display(), baud_rate, "Configured serial line speed");
        }
        Ok(status) => {
            warn!(port = %port.display(), %status, "stty failed; using current line settings");
        }
        Err(e) => {
            warn!(port = %port.display(), error = %e, "stty unavailable; using current line settings");
        }
    }
}

impl LineSource for StreamSource {
    fn poll_line(&mut self) -> Option<String> {
        // Try to receive without blocking
        match self.receiver.try_recv() {
            Ok(line) => Some(line),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                self.disconnected = true;
                None
            }
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<String> {
        self.last_error()
    }

    fn is_closed(&self) -> bool {
        self.disconnected
    }

    fn close(&mut self) {
        self.receiver.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.disconnected = true;
    }
}

impl Drop for StreamSource {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;
    use tempfile::NamedTempFile;

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_stream_source_spawn() {
        let cursor = Cursor::new("FORWARD PIR Reading: 1 at 2024/1/1 0:0:0\r\n");
        let mut source = StreamSource::spawn(cursor, "test");

        settle().await;

        assert_eq!(
            source.poll_line().as_deref(),
            Some("FORWARD PIR Reading: 1 at 2024/1/1 0:0:0")
        );
    }

    #[tokio::test]
    async fn test_stream_source_preserves_order_and_skips_blank_lines() {
        let cursor = Cursor::new("one\n\n\r\ntwo\nthree");
        let mut source = StreamSource::spawn(cursor, "test");

        settle().await;

        assert_eq!(source.poll_line().as_deref(), Some("one"));
        assert_eq!(source.poll_line().as_deref(), Some("two"));
        assert_eq!(source.poll_line().as_deref(), Some("three"));
        assert!(source.poll_line().is_none());
        assert!(source.is_closed());
        assert_eq!(source.error().as_deref(), Some("Connection closed"));
    }

    #[tokio::test]
    async fn test_stream_source_drops_invalid_utf8() {
        let cursor = Cursor::new(b"ab\xfe\xffcd\n".to_vec());
        let mut source = StreamSource::spawn(cursor, "test");

        settle().await;

        assert_eq!(source.poll_line().as_deref(), Some("abcd"));
    }

    #[tokio::test]
    async fn test_stream_source_description() {
        let source = StreamSource::spawn(Cursor::new(""), "/dev/ttyACM0 @ 9600 baud");
        assert_eq!(source.description(), "stream: /dev/ttyACM0 @ 9600 baud");
    }

    #[tokio::test]
    async fn test_stream_source_close() {
        let (_client, server) = tokio::io::duplex(64);
        let mut source = StreamSource::spawn(server, "test");
        assert!(!source.is_closed());

        source.close();
        assert!(source.is_closed());
        assert!(source.poll_line().is_none());
    }

    #[tokio::test]
    async fn test_stream_source_pending_is_not_closed() {
        let (_client, server) = tokio::io::duplex(64);
        let mut source = StreamSource::spawn(server, "test");

        settle().await;

        assert!(source.poll_line().is_none());
        assert!(!source.is_closed());
    }

    #[tokio::test]
    async fn test_open_serial_reads_device_node() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "FORWARD HW-201 Reading: 1 at 2024/1/1 0:0:0").unwrap();

        let mut source = StreamSource::open_serial(file.path(), 9600, false, Duration::ZERO)
            .await
            .unwrap();

        settle().await;

        assert_eq!(
            source.poll_line().as_deref(),
            Some("FORWARD HW-201 Reading: 1 at 2024/1/1 0:0:0")
        );
        assert!(source.description().contains("9600 baud"));
    }

    #[test]
    fn test_spawn_blocking_reads_lines() {
        let data = "one\r\n  \ntwo\n";
        let mut source = StreamSource::spawn_blocking(Cursor::new(data), "test").unwrap();

        std::thread::sleep(Duration::from_millis(50));

        assert_eq!(source.poll_line().as_deref(), Some("one"));
        assert_eq!(source.poll_line().as_deref(), Some("two"));
        assert!(source.poll_line().is_none());
        assert!(source.is_closed());
        assert_eq!(source.error().as_deref(), Some("Connection closed"));
    }

    #[tokio::test]
    async fn test_stream_source_skips_whitespace_only_lines() {
        let cursor = Cursor::new(" \t \r\nx\n");
        let mut source = StreamSource::spawn(cursor, "test");

        settle().await;

        assert_eq!(source.poll_line().as_deref(), Some("x"));
    }

    #[test]
    fn test_runtime_shutdown_with_silent_device() {
        let dir = tempfile::tempdir().unwrap();
        let fifo = dir.path().join("ttyFAKE");
        let made = Command::new("mkfifo").arg(&fifo).status().unwrap();
        assert!(made.success());

        // Held open for the whole test and never written to.
        let _writer = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&fifo)
            .unwrap();

        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut source = rt
            .block_on(StreamSource::open_serial(&fifo, 9600, false, Duration::ZERO))
            .unwrap();
        std::thread::sleep(Duration::from_millis(50));
        assert!(source.poll_line().is_none());

        source.close();
        drop(source);

        let started = std::time::Instant::now();
        drop(rt);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_open_serial_missing_device() {
        let result = StreamSource::open_serial(
            Path::new("/nonexistent/ttyACM9"),
            9600,
            false,
            Duration::ZERO,
        )
        .await;
        assert!(result.is_err());
    }
}
