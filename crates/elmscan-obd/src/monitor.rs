//! Live data monitor loop
//!
//! Blocks for one read cycle, hands the readings to the caller and an
//! optional sink, then sleeps the interval in short slices so a cancel
//! flag is noticed promptly. The sink's `end_session` runs on every exit
//! path.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use elmscan_core::SensorReading;
use tracing::{debug, warn};

use crate::codec::pid::DIAGNOSTIC_PIDS;
use crate::error::Result;
use crate::scanner::Scanner;

const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Destination for monitor readings
pub trait ReadingSink {
    fn start_session(&mut self) -> io::Result<()>;

    fn log_readings(&mut self, readings: &[SensorReading]) -> io::Result<()>;

    fn end_session(&mut self) -> io::Result<()>;
}

/// Ends the sink session when dropped
struct SessionGuard<'a> {
    sink: &'a mut dyn ReadingSink,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.sink.end_session() {
            warn!(error = %e, "Failed to close monitor session");
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorSummary {
    pub cycles: usize,
    pub readings: usize,
}

/// Periodic PID poller
#[derive(Debug, Clone)]
pub struct LiveMonitor {
    pids: Vec<String>,
    interval: Duration,
    max_cycles: Option<usize>,
}

impl Default for LiveMonitor {
    fn default() -> Self {
        Self::new(DIAGNOSTIC_PIDS.iter().map(|p| p.to_string()).collect())
    }
}

impl LiveMonitor {
    pub fn new(pids: Vec<String>) -> Self {
        Self {
            pids,
            interval: Duration::from_secs(1),
            max_cycles: None,
        }
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Stop after `cycles` reads
    pub fn max_cycles(mut self, cycles: usize) -> Self {
        self.max_cycles = Some(cycles);
        self
    }

    pub fn pids(&self) -> &[String] {
        &self.pids
    }

    /// Run until `cancel` is set, `max_cycles` is reached or the scanner fails
    pub fn run<F>(
        &self,
        scanner: &mut Scanner,
        cancel: &AtomicBool,
        sink: Option<&mut dyn ReadingSink>,
        mut on_cycle: F,
    ) -> Result<MonitorSummary>
    where
        F: FnMut(&[SensorReading]),
    {
        let mut guard = match sink {
            Some(sink) => match sink.start_session() {
                Ok(()) => Some(SessionGuard { sink }),
                Err(e) => {
                    warn!(error = %e, "Monitor session log unavailable");
                    None
                }
            },
            None => None,
        };

        let pids: Vec<&str> = self.pids.iter().map(String::as_str).collect();
        let mut summary = MonitorSummary::default();

        while !cancel.load(Ordering::SeqCst) {
            let readings = scanner.read_live_data(&pids)?;
            summary.cycles += 1;
            summary.readings += readings.len();

            on_cycle(&readings);
            if let Some(guard) = guard.as_mut() {
                if let Err(e) = guard.sink.log_readings(&readings) {
                    warn!(error = %e, "Failed to log readings");
                }
            }

            if self.max_cycles.is_some_and(|max| summary.cycles >= max) {
                break;
            }
            sleep_interruptible(self.interval, cancel);
        }

        debug!(cycles = summary.cycles, "Monitor stopped");
        Ok(summary)
    }
}

fn sleep_interruptible(duration: Duration, cancel: &AtomicBool) {
    let deadline = Instant::now() + duration;
    while !cancel.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}
