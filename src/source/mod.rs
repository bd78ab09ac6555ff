//! Line source abstraction for receiving raw telemetry.
//!
//! This module provides a trait-based abstraction for receiving raw text
//! lines from various transports (a serial device, a captured log file, an
//! in-memory channel).

mod channel;
mod file;
mod stream;

pub use channel::ChannelSource;
pub use file::FileSource;
pub use stream::StreamSource;

use std::fmt::Debug;

/// Trait for receiving raw telemetry lines.
///
/// Lines are yielded in arrival order, decoded as UTF-8 with invalid bytes
/// dropped and trailing line terminators removed. Blank lines are skipped.
///
/// # Example
///
/// ```
/// use sensorlog::{ChannelSource, LineSource};
///
/// let (tx, mut source) = ChannelSource::create("example");
/// tx.send("FORWARD PIR Reading: 1 at 2024/1/1 0:0:0\r\n".to_string()).unwrap();
/// assert_eq!(
///     source.poll_line().as_deref(),
///     Some("FORWARD PIR Reading: 1 at 2024/1/1 0:0:0")
/// );
/// ```
pub trait LineSource: Send + Debug {
    /// Take the next available line.
    ///
    /// Returns `None` when no line is available right now. This method
    /// must not block.
    fn poll_line(&mut self) -> Option<String>;

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;

    /// Returns the last transport error, if any.
    fn error(&self) -> Option<String>;

    /// True once the transport has ended and every line has been taken.
    fn is_closed(&self) -> bool;

    /// Release the transport. Further polls return `None`.
    fn close(&mut self) {}
}

/// Decode raw bytes into a line, dropping invalid UTF-8 and trailing
/// `\r`/`\n` terminators.
pub fn decode_line(bytes: &[u8]) -> String {
    let mut line = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        line.push_str(chunk.valid());
    }
    strip_terminators(&line).to_string()
}

/// True for lines holding nothing but whitespace.
pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Remove trailing line terminators.
pub fn strip_terminators(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_line_strips_terminators() {
        assert_eq!(decode_line(b"hello\r\n"), "hello");
        assert_eq!(decode_line(b"hello\n"), "hello");
        assert_eq!(decode_line(b"hello"), "hello");
        assert_eq!(decode_line(b"  padded  \n"), "  padded  ");
        assert_eq!(decode_line(b"\r\n"), "");
    }

    #[test]
    fn test_decode_line_drops_invalid_bytes() {
        assert_eq!(decode_line(b"FOR\xffWARD\xc3\n"), "FORWARD");
        assert_eq!(decode_line("temp 21\u{b0}C\n".as_bytes()), "temp 21\u{b0}C");
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(""));
        assert!(is_blank("  \t "));
        assert!(!is_blank("  x "));
    }
}
