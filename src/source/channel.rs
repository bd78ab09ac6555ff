//! Channel-based line source.
//!
//! Receives lines pushed through a tokio mpsc channel. Useful when lines
//! come from somewhere other than a byte stream, and in tests.

use tokio::sync::mpsc;

use super::{is_blank, strip_terminators, LineSource};

/// A line source that receives lines via an unbounded channel.
///
/// Sending and polling are both synchronous, so no runtime is needed.
///
/// # Example
///
/// ```
/// use sensorlog::ChannelSource;
///
/// let (tx, source) = ChannelSource::create("bench");
/// tx.send("FORWARD HW-201 Reading: 0 at 2024/1/1 0:0:0".to_string()).unwrap();
/// ```
#[derive(Debug)]
pub struct ChannelSource {
    receiver: mpsc::UnboundedReceiver<String>,
    description: String,
    disconnected: bool,
}

impl ChannelSource {
    /// Create a new channel source from a receiver.
    pub fn new(receiver: mpsc::UnboundedReceiver<String>, source_description: &str) -> Self {
        Self {
            receiver,
            description: format!("channel: {}", source_description),
            disconnected: false,
        }
    }

    /// Create a channel pair for sending lines to a ChannelSource.
    pub fn create(source_description: &str) -> (mpsc::UnboundedSender<String>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self::new(rx, source_description))
    }
}

impl LineSource for ChannelSource {
    fn poll_line(&mut self) -> Option<String> {
        loop {
            match self.receiver.try_recv() {
                Ok(line) => {
                    let line = strip_terminators(&line);
                    if !is_blank(line) {
                        return Some(line.to_string());
                    }
                }
                Err(mpsc::error::TryRecvError::Empty) => return None,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.disconnected = true;
                    return None;
                }
            }
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<String> {
        None
    }

    fn is_closed(&self) -> bool {
        self.disconnected
    }

    fn close(&mut self) {
        self.receiver.close();
        self.disconnected = true;
    }
}
