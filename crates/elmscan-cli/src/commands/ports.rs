//! Ports command - candidate adapter ports

use anyhow::Result;
use elmscan_elm::find_ports;

use crate::output::{OutputContext, PortRow};

pub fn ports(ctx: &OutputContext) -> Result<()> {
    let rows: Vec<PortRow> = find_ports()
        .into_iter()
        .map(|port| PortRow { port })
        .collect();

    if rows.is_empty() {
        ctx.warn("No USB serial ports found. Is the ELM327 plugged in?");
        return Ok(());
    }
    ctx.print(&rows);
    Ok(())
}
