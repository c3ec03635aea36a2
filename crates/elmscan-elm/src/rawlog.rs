//! Raw adapter traffic log

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Tx,
    Rx,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Tx => "TX",
            Direction::Rx => "RX",
        }
    }
}

/// Receives every command sent and every reply read
pub trait RawLog: Send {
    fn record(&mut self, direction: Direction, command: &str, lines: &[String]);
}

/// Appends traffic to a text file
///
/// ```text
/// [2024-05-01 10:22:03] TX 010C
/// [2024-05-01 10:22:03] RX 010C
///   7E8 04 41 0C 1A F8
/// ```
#[derive(Debug, Clone)]
pub struct FileRawLog {
    path: PathBuf,
}

impl FileRawLog {
    /// Create the log, making parent directories as needed
    pub fn new(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, direction: Direction, command: &str, lines: &[String]) -> io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let ts = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(file, "[{}] {} {}", ts, direction.as_str(), command)?;
        for line in lines {
            writeln!(file, "  {}", line)?;
        }
        Ok(())
    }
}

impl RawLog for FileRawLog {
    fn record(&mut self, direction: Direction, command: &str, lines: &[String]) {
        if let Err(e) = self.append(direction, command, lines) {
            warn!(path = %self.path.display(), error = %e, "Failed to write raw log");
        }
    }
}
