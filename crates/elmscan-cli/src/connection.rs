//! Adapter and scanner setup shared by the commands

use anyhow::{bail, Context, Result};
use elmscan_core::DtcDatabase;
use elmscan_elm::{find_ports, Elm327, ElmConfig, FileRawLog, SerialPortLink};
use elmscan_obd::Scanner;
use tracing::debug;

use crate::config::MergedConfig;
use crate::output::OutputContext;

pub fn dtc_database(config: &MergedConfig) -> DtcDatabase {
    let db = DtcDatabase::new(&config.dtc_data_dir, config.manufacturer.as_deref());
    debug!(
        dir = %config.dtc_data_dir.display(),
        codes = db.count(),
        files = ?db.loaded_files(),
        "DTC database loaded"
    );
    db
}

/// Adapter channel for `port`, not yet connected
pub fn adapter(config: &MergedConfig, port: Option<&str>) -> Result<Elm327> {
    let elm_config = ElmConfig {
        port: port.map(String::from),
        baudrate: config.baudrate,
        ..Default::default()
    };
    let link = match port {
        Some(name) => SerialPortLink::new(name, elm_config.baudrate, elm_config.timeout()),
        None => SerialPortLink::unassigned(elm_config.baudrate, elm_config.timeout()),
    };

    let mut elm = Elm327::new(Box::new(link), elm_config);
    if let Some(path) = &config.raw_log {
        let log = FileRawLog::new(path)
            .with_context(|| format!("Failed to open raw log: {}", path.display()))?;
        elm.set_raw_log(Some(Box::new(log)));
    }
    Ok(elm)
}

/// Ports to try: the configured one, else every detected candidate
pub fn candidate_ports(config: &MergedConfig) -> Result<Vec<String>> {
    if let Some(port) = &config.port {
        return Ok(vec![port.clone()]);
    }
    let ports = find_ports();
    if ports.is_empty() {
        bail!("No USB serial ports found. Is the ELM327 plugged in?");
    }
    Ok(ports)
}

/// Adapter initialised on the first candidate port that answers
///
/// Only the adapter is checked; the vehicle may not speak OBD-II at all.
pub fn connect_adapter(config: &MergedConfig, ctx: &OutputContext) -> Result<Elm327> {
    let ports = candidate_ports(config)?;
    let spinner = ctx.spinner(&format!("Opening adapter ({})...", ports.join(", ")));

    let mut last_error = None;
    for port in &ports {
        let mut elm = adapter(config, Some(port))?;
        match elm.connect() {
            Ok(()) => {
                if let Some(pb) = &spinner {
                    pb.finish_and_clear();
                }
                ctx.success(&format!("Adapter ready on {}", port));
                return Ok(elm);
            }
            Err(e) => {
                debug!(port = %port, error = %e, "Adapter did not initialise");
                last_error = Some(e);
            }
        }
    }

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    match last_error {
        Some(e) => Err(e).context("No ELM327 adapter answered"),
        None => bail!("No ELM327 adapter answered"),
    }
}

/// Connected OBD-II scanner
pub fn open_scanner(config: &MergedConfig, ctx: &OutputContext) -> Result<Scanner> {
    let ports = candidate_ports(config)?;
    let elm = adapter(config, None)?;
    let mut scanner = Scanner::new(elm, Box::new(dtc_database(config)));

    let spinner = ctx.spinner(&format!("Connecting ({})...", ports.join(", ")));
    let result = scanner.auto_connect(&ports);
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let port = result.context("Vehicle connection failed (try `elmscan kline` for older vehicles)")?;
    ctx.success(&format!("Connected on {}", port));
    Ok(scanner)
}
