//! Freeze command - Mode 02 snapshot

use anyhow::Result;
use serde_json::json;

use super::live::reading_rows;
use crate::config::MergedConfig;
use crate::connection::open_scanner;
use crate::output::{OutputContext, OutputFormat};

pub fn freeze(config: &MergedConfig, frame: u8, ctx: &OutputContext) -> Result<()> {
    let mut scanner = open_scanner(config, ctx)?;
    let Some(data) = scanner.read_freeze_frame(frame)? else {
        ctx.warn(&format!("No freeze frame data (frame {})", frame));
        return Ok(());
    };

    if ctx.format == OutputFormat::Json {
        ctx.print_json(&json!({
            "frame": frame,
            "dtc": data.dtc_code,
            "description": scanner.describe(&data.dtc_code),
            "timestamp": data.timestamp,
            "readings": data.readings.values().collect::<Vec<_>>(),
        }));
        return Ok(());
    }

    if data.has_known_dtc() {
        ctx.heading(&format!(
            "Frame {}: {} - {}",
            frame,
            data.dtc_code,
            scanner.describe(&data.dtc_code)
        ));
    } else {
        ctx.heading(&format!("Frame {}: triggering DTC unknown", frame));
    }
    ctx.print(&reading_rows(data.readings.values()));
    Ok(())
}
