//! Readiness command - emission monitor status

use anyhow::Result;
use elmscan_core::ReadinessStatus;

use crate::config::MergedConfig;
use crate::connection::open_scanner;
use crate::output::{MonitorRow, OutputContext};

pub fn monitor_rows(monitors: &[ReadinessStatus]) -> Vec<MonitorRow> {
    monitors
        .iter()
        .map(|m| MonitorRow {
            monitor: m.monitor_name.clone(),
            status: m.status_str().to_string(),
        })
        .collect()
}

pub fn readiness(config: &MergedConfig, ctx: &OutputContext) -> Result<()> {
    let mut scanner = open_scanner(config, ctx)?;
    let monitors = scanner.read_readiness()?;
    if monitors.is_empty() {
        ctx.warn("Readiness data not available");
        return Ok(());
    }

    let incomplete = monitors
        .iter()
        .filter(|m| m.available && !m.complete)
        .count();
    ctx.print(&monitor_rows(&monitors));
    if incomplete == 0 {
        ctx.success("All supported monitors complete");
    } else {
        ctx.warn(&format!("{} monitor(s) incomplete", incomplete));
    }
    Ok(())
}
