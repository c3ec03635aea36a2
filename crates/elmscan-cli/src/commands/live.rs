//! Live command - periodic PID polling

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use elmscan_core::SensorReading;
use elmscan_obd::{LiveMonitor, LogFormat, ReadingSink, SessionLog, DIAGNOSTIC_PIDS};

use crate::config::MergedConfig;
use crate::connection::open_scanner;
use crate::output::{escape_csv, OutputContext, OutputFormat, ReadingRow};

/// Options for the live command after CLI/config merging
#[derive(Debug, Clone)]
pub struct LiveOptions {
    /// PIDs to poll; empty means the diagnostic set
    pub pids: Vec<String>,
    pub interval_ms: u64,
    pub log_format: Option<LogFormat>,
    pub cycles: Option<usize>,
}

pub fn reading_rows<'a>(readings: impl IntoIterator<Item = &'a SensorReading>) -> Vec<ReadingRow> {
    readings
        .into_iter()
        .map(|r| ReadingRow {
            pid: r.pid.clone(),
            name: r.name.clone(),
            value: format_value(r.value),
            unit: r.unit.clone(),
            raw: r.raw_hex.clone(),
        })
        .collect()
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

/// Single-line rendering of one cycle for the table format
fn cycle_line(readings: &[SensorReading]) -> String {
    let stamp = readings
        .first()
        .map(|r| r.timestamp_str())
        .unwrap_or_default();
    let values: Vec<String> = readings
        .iter()
        .map(|r| format!("{}: {} {}", r.name, format_value(r.value), r.unit))
        .collect();
    format!("[{}] {}", stamp, values.join(" | "))
}

pub fn live(config: &MergedConfig, options: LiveOptions, ctx: &OutputContext) -> Result<()> {
    let pids = if options.pids.is_empty() {
        DIAGNOSTIC_PIDS.iter().map(|p| p.to_string()).collect()
    } else {
        options.pids.iter().map(|p| p.trim().to_uppercase()).collect()
    };

    let mut monitor = LiveMonitor::new(pids).interval(Duration::from_millis(options.interval_ms));
    if let Some(cycles) = options.cycles {
        monitor = monitor.max_cycles(cycles);
    }

    let mut scanner = open_scanner(config, ctx)?;

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("Failed to install Ctrl+C handler")?;

    let mut session = options
        .log_format
        .map(|format| SessionLog::in_dir(&config.log_dir, format));

    ctx.info(&format!(
        "Monitoring {} every {} ms (Ctrl+C to stop)",
        monitor.pids().join(", "),
        options.interval_ms
    ));

    let format = ctx.format;
    let mut csv_header = true;
    let sink = session.as_mut().map(|s| s as &mut dyn ReadingSink);
    let summary = monitor.run(&mut scanner, &cancel, sink, |readings| match format {
        OutputFormat::Table => {
            if !readings.is_empty() {
                println!("{}", cycle_line(readings));
            }
        }
        OutputFormat::Json => {
            for reading in readings {
                if let Ok(line) = serde_json::to_string(reading) {
                    println!("{}", line);
                }
            }
        }
        OutputFormat::Csv => {
            if csv_header {
                println!("timestamp,pid,name,value,unit,raw");
                csv_header = false;
            }
            for reading in readings {
                println!(
                    "{},{},{},{},{},{}",
                    reading.timestamp.to_rfc3339(),
                    reading.pid,
                    escape_csv(&reading.name),
                    reading.value,
                    escape_csv(&reading.unit),
                    reading.raw_hex
                );
            }
        }
    })?;

    ctx.success(&format!(
        "Stopped after {} cycle(s), {} reading(s)",
        summary.cycles, summary.readings
    ));
    if let Some(session) = &session {
        if session.rows() > 0 {
            ctx.info(&format!(
                "Logged {} row(s) to {}",
                session.rows(),
                session.path().display()
            ));
        }
    }
    Ok(())
}
