//! File-based line source.
//!
//! Replays a captured serial log, one line per poll.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::{decode_line, is_blank, LineSource};

/// A line source that replays the lines of a captured log file.
///
/// The file is read once when the source is opened; every poll yields the
/// next non-blank line until the capture is exhausted.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    description: String,
    lines: VecDeque<String>,
}

impl FileSource {
    /// Open and load the capture file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let bytes = fs::read(&path)
            .with_context(|| format!("failed to read capture file {}", path.display()))?;

        let lines = bytes
            .split(|&b| b == b'\n')
            .map(decode_line)
            .filter(|line| !is_blank(line))
            .collect();

        Ok(Self {
            description: format!("file: {}", path.display()),
            path,
            lines,
        })
    }

    /// Returns the path being replayed.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines not yet polled.
    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

impl LineSource for FileSource {
    fn poll_line(&mut self) -> Option<String> {
        self.lines.pop_front()
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<String> {
        None
    }

    fn is_closed(&self) -> bool {
        self.lines.is_empty()
    }

    fn close(&mut self) {
        self.lines.clear();
    }
}
