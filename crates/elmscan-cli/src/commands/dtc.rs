//! DTC command - read and clear trouble codes

use std::io::{self, BufRead, Write};

use anyhow::{bail, Result};
use elmscan_core::DiagnosticCode;

use crate::config::MergedConfig;
use crate::connection::open_scanner;
use crate::output::{DtcRow, OutputContext};

pub fn dtc_rows(codes: &[DiagnosticCode]) -> Vec<DtcRow> {
    codes
        .iter()
        .map(|c| DtcRow {
            code: c.code.clone(),
            status: c.status.to_string(),
            description: c.description.clone(),
            timestamp: c.timestamp_str(),
        })
        .collect()
}

/// Ask on stdin; true when the answer equals `expected`
pub fn confirm(prompt: &str, expected: &[&str]) -> Result<bool> {
    print!("{} ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    let answer = answer.trim();
    Ok(expected.iter().any(|e| *e == answer))
}

pub fn dtc(config: &MergedConfig, clear: bool, yes: bool, ctx: &OutputContext) -> Result<()> {
    let mut scanner = open_scanner(config, ctx)?;

    if clear {
        if !yes
            && !confirm(
                "Clear all trouble codes and freeze frame data? [y/N]",
                &["y", "Y", "yes"],
            )?
        {
            ctx.info("Cancelled");
            return Ok(());
        }
        if !scanner.clear_dtcs()? {
            bail!("Vehicle did not acknowledge the clear request");
        }
        ctx.success("Trouble codes cleared");
        return Ok(());
    }

    let codes = scanner.read_dtcs()?;
    if codes.is_empty() {
        ctx.success("No trouble codes");
        return Ok(());
    }
    ctx.print(&dtc_rows(&codes));
    Ok(())
}
