//! Live monitor session recording

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use elmscan_core::SensorReading;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::monitor::ReadingSink;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Csv,
    /// One JSON object per reading
    Json,
}

impl LogFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            LogFormat::Csv => "csv",
            LogFormat::Json => "jsonl",
        }
    }
}

const CSV_HEADER: &str = "timestamp,pid,name,value,unit,raw_hex";

/// Writes readings to a CSV or JSON-lines file
pub struct SessionLog {
    path: PathBuf,
    format: LogFormat,
    writer: Option<BufWriter<File>>,
    rows: usize,
}

impl SessionLog {
    pub fn new(path: impl Into<PathBuf>, format: LogFormat) -> Self {
        Self {
            path: path.into(),
            format,
            writer: None,
            rows: 0,
        }
    }

    /// `<dir>/session_<YYYYmmdd_HHMMSS>.<ext>`
    pub fn in_dir(dir: &Path, format: LogFormat) -> Self {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        Self::new(
            dir.join(format!("session_{}.{}", stamp, format.extension())),
            format,
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn is_active(&self) -> bool {
        self.writer.is_some()
    }

    fn writer(&mut self) -> io::Result<&mut BufWriter<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "session not started"))
    }
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

impl ReadingSink for SessionLog {
    fn start_session(&mut self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut writer = BufWriter::new(File::create(&self.path)?);
        if self.format == LogFormat::Csv {
            writeln!(writer, "{}", CSV_HEADER)?;
        }
        self.writer = Some(writer);
        self.rows = 0;
        info!(path = %self.path.display(), "Session log started");
        Ok(())
    }

    fn log_readings(&mut self, readings: &[SensorReading]) -> io::Result<()> {
        let format = self.format;
        let writer = self.writer()?;
        for reading in readings {
            match format {
                LogFormat::Csv => writeln!(
                    writer,
                    "{},{},{},{},{},{}",
                    reading.timestamp.to_rfc3339(),
                    reading.pid,
                    csv_field(&reading.name),
                    reading.value,
                    csv_field(&reading.unit),
                    reading.raw_hex
                )?,
                LogFormat::Json => {
                    serde_json::to_writer(&mut *writer, reading)?;
                    writeln!(writer)?;
                }
            }
        }
        writer.flush()?;
        self.rows += readings.len();
        Ok(())
    }

    fn end_session(&mut self) -> io::Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            info!(path = %self.path.display(), rows = self.rows, "Session log closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(pid: &str, name: &str, value: f64) -> SensorReading {
        SensorReading::new(name, value, "%", pid, &[0x80])
    }

    #[test]
    fn test_csv_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = SessionLog::new(dir.path().join("s.csv"), LogFormat::Csv);
        log.start_session().unwrap();
        log.log_readings(&[reading("11", "Throttle Position", 50.2), reading("04", "Load, calc", 3.0)])
            .unwrap();
        log.end_session().unwrap();
        assert!(!log.is_active());

        let content = fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].ends_with(",11,Throttle Position,50.2,%,80"));
        assert!(lines[2].contains(",04,\"Load, calc\",3,%,80"));
        assert_eq!(log.rows(), 2);
    }

    #[test]
    fn test_json_lines_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = SessionLog::in_dir(&dir.path().join("logs"), LogFormat::Json);
        log.start_session().unwrap();
        log.log_readings(&[reading("05", "Engine Coolant Temperature", 88.0)]).unwrap();
        log.end_session().unwrap();

        assert_eq!(log.path().extension().unwrap(), "jsonl");
        let content = fs::read_to_string(log.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(value["pid"], "05");
        assert_eq!(value["value"], 88.0);
    }

    #[test]
    fn test_log_before_start_fails() {
        let mut log = SessionLog::new("unused.csv", LogFormat::Csv);
        assert!(log.log_readings(&[]).is_err());
        assert!(log.end_session().is_ok());
    }
}
