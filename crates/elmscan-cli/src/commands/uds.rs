//! UDS command - services on one ECU

use anyhow::{bail, Context, Result};
use elmscan_uds::service::{negative_error, routine_sub_function, session_type};
use elmscan_uds::{
    parse_did, parse_hex_bytes, CatalogSet, DidReading, UdsClient, UdsClientConfig, UdsError,
    STANDARD_DID_KEYS,
};
use tracing::{debug, warn};

use super::dtc::confirm;
use crate::config::MergedConfig;
use crate::connection::connect_adapter;
use crate::output::{DidRow, OutputContext};
use crate::{RoutineAction, UdsCommand, UdsTarget};

/// Built-in catalogs plus the configured and requested YAML files
fn load_catalogs(config: &MergedConfig, target: &UdsTarget) -> Result<CatalogSet> {
    let mut catalogs = CatalogSet::new();
    for path in config.uds_catalogs.iter().chain(&target.catalog) {
        let brands = catalogs
            .load_file(path)
            .with_context(|| format!("Failed to load UDS catalog: {}", path.display()))?;
        debug!(path = %path.display(), brands, "UDS catalog loaded");
    }
    Ok(catalogs)
}

fn client_config(target: &UdsTarget) -> UdsClientConfig {
    let config = UdsClientConfig {
        protocol: target.protocol.clone(),
        auto_configure: !target.no_configure,
        ..Default::default()
    };
    match (&target.tx, &target.rx) {
        (None, None) => config,
        (tx, rx) => {
            let tx = tx.clone().unwrap_or_else(|| config.tx_id.clone());
            let rx = rx.clone().unwrap_or_else(|| config.rx_id.clone());
            config.with_ids(&tx, &rx)
        }
    }
}

/// `default`, `programming`, `extended` or a hex byte
fn parse_session(value: &str) -> Result<u8> {
    let session = match value.trim().to_lowercase().as_str() {
        "default" => session_type::DEFAULT,
        "programming" => session_type::PROGRAMMING,
        "extended" => session_type::EXTENDED,
        other => parse_hex_u8(other).with_context(|| format!("Unknown session type: {}", value))?,
    };
    Ok(session)
}

fn parse_hex_u8(value: &str) -> Result<u8> {
    let digits = value.trim().trim_start_matches("0x").trim_start_matches("0X");
    u8::from_str_radix(digits, 16).with_context(|| format!("Invalid hex byte: {}", value))
}

fn routine_sub(action: RoutineAction) -> u8 {
    match action {
        RoutineAction::Start => routine_sub_function::START_ROUTINE,
        RoutineAction::Stop => routine_sub_function::STOP_ROUTINE,
        RoutineAction::Results => routine_sub_function::REQUEST_ROUTINE_RESULTS,
    }
}

fn did_row(reading: &DidReading) -> DidRow {
    DidRow {
        did: reading.did.clone(),
        name: reading.name.clone().unwrap_or_default(),
        value: reading
            .value
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_default(),
        raw: reading.raw.clone(),
    }
}

fn read(
    client: &mut UdsClient<'_>,
    brand: &str,
    dids: &[String],
    name: Option<&str>,
    ctx: &OutputContext,
) -> Result<()> {
    if let Some(name) = name {
        let Some(reading) = client.read_did_named(brand, name)? else {
            bail!("No DID named '{}' in the {} catalog", name, brand);
        };
        ctx.print(&[did_row(&reading)]);
        return Ok(());
    }

    let keys: Vec<String> = if dids.is_empty() {
        STANDARD_DID_KEYS.iter().map(|k| k.to_string()).collect()
    } else {
        dids.to_vec()
    };

    let mut rows = Vec::with_capacity(keys.len());
    for key in &keys {
        let did = parse_did(key)?;
        match client.read_did(brand, did) {
            Ok(reading) => rows.push(did_row(&reading)),
            // One refused DID does not abort the batch
            Err(e @ UdsError::NegativeResponse { .. }) => {
                warn!(did = %key, error = %e, "DID read refused");
                rows.push(DidRow {
                    did: format!("{:04X}", did),
                    name: String::new(),
                    value: e.to_string(),
                    raw: String::new(),
                });
            }
            Err(e) => return Err(e.into()),
        }
    }
    ctx.print(&rows);
    Ok(())
}

fn write(
    client: &mut UdsClient<'_>,
    brand: &str,
    did: &str,
    data: &str,
    yes: bool,
    ctx: &OutputContext,
) -> Result<()> {
    let did = parse_did(did)?;
    let payload = parse_hex_bytes(data)?;
    if payload.is_empty() {
        bail!("Refusing to write an empty value");
    }

    if !yes {
        ctx.warn(&format!(
            "About to write {} to DID {:04X} on {}",
            hex::encode_upper(&payload),
            did,
            client.transport().tx_id()
        ));
        if !confirm("Type YES to continue:", &["YES"])? {
            ctx.info("Cancelled");
            return Ok(());
        }
    }

    let written = client.write_did(Some(brand), did, &payload)?;
    ctx.success(&format!("Wrote DID {}", written.did));
    ctx.print(&[did_row(&written)]);
    Ok(())
}

fn raw(
    client: &mut UdsClient<'_>,
    sid: &str,
    data: Option<&str>,
    strict: bool,
    ctx: &OutputContext,
) -> Result<()> {
    let sid = parse_hex_u8(sid)?;
    let payload = parse_hex_bytes(data.unwrap_or_default())?;
    let response = client.send_raw(sid, &payload, strict)?;

    let mut pairs = vec![
        ("Request", hex::encode_upper([&[sid][..], &payload[..]].concat())),
        ("Response", hex::encode_upper(&response)),
    ];
    if let Some(err) = negative_error(&response) {
        pairs.push(("Negative", err.to_string()));
    }
    ctx.print_kv(&pairs);
    Ok(())
}

/// Undo the target addressing, only if it was sent
fn restore_addressing(client: &mut UdsClient<'_>) {
    if !client.is_configured() {
        return;
    }
    if let Err(e) = client.release() {
        debug!(error = %e, "Failed to restore adapter addressing");
    }
}

pub fn uds(
    config: &MergedConfig,
    target: &UdsTarget,
    command: &UdsCommand,
    ctx: &OutputContext,
) -> Result<()> {
    let catalogs = load_catalogs(config, target)?;
    let brand = config.brand();
    let client_config = client_config(target);

    let mut elm = connect_adapter(config, ctx)?;
    let mut client = match &target.module {
        Some(module) => UdsClient::from_module(&mut elm, &catalogs, brand, module, client_config)?,
        None => UdsClient::new(&mut elm, &catalogs, client_config),
    };
    debug!(
        tx = client.transport().tx_id(),
        rx = client.transport().rx_id(),
        brand,
        "UDS target selected"
    );

    let result = match command {
        UdsCommand::Read { dids, name } => read(&mut client, brand, dids, name.as_deref(), ctx),
        UdsCommand::Write { did, data, yes } => write(&mut client, brand, did, data, *yes, ctx),
        UdsCommand::Routine { name, action, data } => {
            let payload = parse_hex_bytes(data)?;
            client
                .routine_control(brand, name, routine_sub(*action), &payload)
                .map_err(anyhow::Error::from)
                .map(|result| {
                    ctx.print_kv(&[
                        ("Routine", result.routine),
                        ("Routine ID", result.routine_id),
                        ("Status", result.status),
                    ])
                })
        }
        UdsCommand::Raw { sid, data, strict } => raw(&mut client, sid, data.as_deref(), *strict, ctx),
        UdsCommand::Session { session_type } => parse_session(session_type).and_then(|session| {
            client.diagnostic_session(session)?;
            ctx.success(&format!("Session 0x{:02X} active", session));
            Ok(())
        }),
    };

    restore_addressing(&mut client);
    elm.close();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use elmscan_elm::{Elm327, ElmConfig, MockLink};
    use elmscan_uds::DidValue;
    use pretty_assertions::assert_eq;

    fn adapter(mock: &MockLink) -> Elm327 {
        let mut elm = Elm327::new(Box::new(mock.clone()), ElmConfig::fast());
        elm.connect().unwrap();
        mock.clear_sent();
        elm
    }

    fn target() -> UdsTarget {
        UdsTarget {
            module: None,
            tx: None,
            rx: None,
            protocol: "6".to_string(),
            catalog: Vec::new(),
            no_configure: false,
        }
    }

    #[test]
    fn test_parse_session() {
        assert_eq!(parse_session("extended").unwrap(), 0x03);
        assert_eq!(parse_session("Default").unwrap(), 0x01);
        assert_eq!(parse_session("0x40").unwrap(), 0x40);
        assert!(parse_session("sleepy").is_err());
    }

    #[test]
    fn test_parse_hex_u8() {
        assert_eq!(parse_hex_u8("22").unwrap(), 0x22);
        assert_eq!(parse_hex_u8("0x3E").unwrap(), 0x3E);
        assert!(parse_hex_u8("122").is_err());
    }

    #[test]
    fn test_client_config_ids() {
        let config = client_config(&target());
        assert_eq!(config.tx_id, "7E0");
        assert_eq!(config.rx_id, "7E8");
        assert!(config.auto_configure);

        let custom = UdsTarget {
            tx: Some("7e1".to_string()),
            no_configure: true,
            ..target()
        };
        let config = client_config(&custom);
        assert_eq!(config.tx_id, "7E1");
        assert_eq!(config.rx_id, "7E8");
        assert!(!config.auto_configure);
    }

    #[test]
    fn test_did_row() {
        let row = did_row(&DidReading {
            did: "F190".to_string(),
            raw: "574457".to_string(),
            name: Some("VIN".to_string()),
            value: Some(DidValue::Text("WDW".to_string())),
        });
        assert_eq!(row.value, "WDW");
        assert_eq!(row.name, "VIN");

        let bare = did_row(&DidReading {
            did: "2023".to_string(),
            raw: "01F4".to_string(),
            name: None,
            value: None,
        });
        assert_eq!(bare.value, "");
    }

    #[test]
    fn test_restore_addressing_skips_unconfigured_client() {
        let mock = MockLink::new();
        let mut elm = adapter(&mock);
        let catalogs = CatalogSet::new();
        let config = UdsClientConfig {
            auto_configure: false,
            ..Default::default()
        };
        let mut client = UdsClient::new(&mut elm, &catalogs, config);

        restore_addressing(&mut client);
        assert!(mock.sent().is_empty());

        client.configure().unwrap();
        mock.clear_sent();
        restore_addressing(&mut client);
        assert_eq!(mock.sent(), vec!["ATCRA", "ATSH7DF", "ATH1"]);
    }

    #[test]
    fn test_routine_sub() {
        assert_eq!(routine_sub(RoutineAction::Start), 0x01);
        assert_eq!(routine_sub(RoutineAction::Results), 0x03);
    }
}
