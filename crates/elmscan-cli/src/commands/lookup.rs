//! Lookup and pids commands - offline reference data

use anyhow::Result;
use elmscan_obd::codec::pid::all_pids;

use crate::config::MergedConfig;
use crate::connection::dtc_database;
use crate::output::{CodeRow, OutputContext, PidRow};

/// Exact code match first, then a description search
pub fn lookup(config: &MergedConfig, query: &str, ctx: &OutputContext) -> Result<()> {
    let db = dtc_database(config);
    if db.count() == 0 {
        ctx.warn(&format!(
            "No DTC tables found in {}",
            config.dtc_data_dir.display()
        ));
    }

    let rows: Vec<CodeRow> = match db.lookup(query) {
        Some(info) => vec![info],
        None => db.search(query),
    }
    .into_iter()
    .map(|info| CodeRow {
        code: info.code.clone(),
        description: info.description.clone(),
        source: info.source.clone(),
    })
    .collect();

    if rows.is_empty() {
        ctx.warn(&format!("No match for '{}'", query));
        return Ok(());
    }
    ctx.print(&rows);
    Ok(())
}

pub fn pids(ctx: &OutputContext) -> Result<()> {
    let rows: Vec<PidRow> = all_pids()
        .iter()
        .map(|p| PidRow {
            pid: p.code(),
            name: p.name.to_string(),
            unit: p.unit.to_string(),
            bytes: p.bytes,
            min: p.min,
            max: p.max,
        })
        .collect();
    ctx.print(&rows);
    Ok(())
}
