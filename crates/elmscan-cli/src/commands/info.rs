//! Info and scan commands - vehicle summary

use anyhow::Result;
use elmscan_core::VehicleInfo;
use serde_json::json;

use super::dtc::dtc_rows;
use super::readiness::monitor_rows;
use crate::config::MergedConfig;
use crate::connection::open_scanner;
use crate::output::{yes_no, OutputContext, OutputFormat};

fn info_pairs(port: &str, info: &VehicleInfo) -> Vec<(&'static str, String)> {
    vec![
        ("Port", port.to_string()),
        ("Adapter", info.elm_version.clone()),
        ("Protocol", info.protocol.clone()),
        ("VIN", info.vin.clone().unwrap_or_else(|| "-".to_string())),
        ("MIL", if info.mil_on { "ON" } else { "OFF" }.to_string()),
        ("DTC Count", info.dtc_count.to_string()),
    ]
}

pub fn info(config: &MergedConfig, ctx: &OutputContext) -> Result<()> {
    let mut scanner = open_scanner(config, ctx)?;
    let info = scanner.get_vehicle_info()?;
    let port = scanner.elm().port().unwrap_or_default();

    let report = scanner.self_test();
    let mut pairs = info_pairs(&port, &info);
    pairs.push(("Vehicle Responding", yes_no(report.vehicle_ok)));
    ctx.print_kv(&pairs);
    Ok(())
}

/// Vehicle info, trouble codes and readiness in one pass
pub fn scan(config: &MergedConfig, ctx: &OutputContext) -> Result<()> {
    let mut scanner = open_scanner(config, ctx)?;
    let port = scanner.elm().port().unwrap_or_default();

    let info = scanner.get_vehicle_info()?;
    let dtcs = scanner.read_dtcs()?;
    let monitors = scanner.read_readiness()?;

    if ctx.format == OutputFormat::Json {
        ctx.print_json(&json!({
            "port": port,
            "vehicle": info,
            "dtcs": dtcs,
            "readiness": monitors,
        }));
        return Ok(());
    }

    ctx.heading("Vehicle");
    ctx.print_kv(&info_pairs(&port, &info));

    ctx.heading("Trouble Codes");
    if dtcs.is_empty() {
        ctx.success("No trouble codes");
    } else {
        ctx.print(&dtc_rows(&dtcs));
    }

    ctx.heading("Readiness Monitors");
    if monitors.is_empty() {
        ctx.warn("Readiness data not available");
    } else {
        ctx.print(&monitor_rows(&monitors));
    }
    Ok(())
}
