//! UDS client over a scripted adapter

use elmscan_elm::{ChannelError, Elm327, ElmConfig, MockLink};
use elmscan_uds::{
    CatalogSet, DidValue, NegativeResponseCode, RoutineResult, UdsClient, UdsClientConfig,
    UdsError,
};
use pretty_assertions::assert_eq;

const SETUP: [&str; 4] = ["ATSP6", "ATH1", "ATSH7E0", "ATCRA7E8"];

const JEEP_YAML: &str = r#"
brands:
  jeep:
    modules:
      - { name: bcm, tx_id: "620", rx_id: "504" }
    routines:
      - { name: reset_tpms, routine_id: "0203" }
"#;

fn connected(mock: &MockLink) -> Elm327 {
    let mut elm = Elm327::new(Box::new(mock.clone()), ElmConfig::fast());
    elm.connect().expect("connect over mock link");
    mock.clear_sent();
    elm
}

fn sent_after_setup(mock: &MockLink) -> Vec<String> {
    let sent = mock.sent();
    assert_eq!(&sent[..SETUP.len()], &SETUP);
    sent[SETUP.len()..].to_vec()
}

#[test]
fn test_negative_response() {
    let mock = MockLink::new();
    let mut elm = connected(&mock);
    let catalogs = CatalogSet::new();
    let mut uds = UdsClient::new(&mut elm, &catalogs, UdsClientConfig::default());

    mock.expect("22F190", &["7E8 03 7F 22 31"]);
    let err = uds.read_vin("generic").unwrap_err();
    assert_eq!(
        err,
        UdsError::NegativeResponse {
            service_id: 0x22,
            nrc: NegativeResponseCode::RequestOutOfRange,
        }
    );
    assert_eq!(sent_after_setup(&mock), vec!["22F190"]);
}

#[test]
fn test_read_vin_multi_frame_configures_once() {
    let mock = MockLink::new();
    let mut elm = connected(&mock);
    let catalogs = CatalogSet::new();
    let mut uds = UdsClient::new(&mut elm, &catalogs, UdsClientConfig::default());

    mock.expect(
        "22F190",
        &[
            "7E8 10 14 62 F1 90 57 56 57",
            "7E8 21 5A 5A 5A 31 4B 5A 41",
            "7E8 22 4D 30 37 34 36 33 32",
        ],
    );
    mock.expect("22F18C", &["7E8 07 62 F1 8C 41 42 43 00"]);

    let vin = uds.read_vin("jeep").unwrap();
    assert_eq!(vin.did, "F190");
    assert_eq!(vin.name.as_deref(), Some("VIN"));
    assert_eq!(
        vin.value,
        Some(DidValue::Text("WVWZZZ1KZAM074632".to_string()))
    );
    assert_eq!(vin.raw.len(), 34);

    let serial = uds.read_did("generic", 0xF18C).unwrap();
    assert_eq!(serial.value, Some(DidValue::Text("ABC".to_string())));
    assert_eq!(serial.raw, "41424300");
    assert!(uds.is_configured());

    assert_eq!(sent_after_setup(&mock), vec!["22F190", "22F18C"]);
}

#[test]
fn test_unknown_did_is_raw_only() {
    let mock = MockLink::new();
    let mut elm = connected(&mock);
    let catalogs = CatalogSet::new();
    let mut uds = UdsClient::new(&mut elm, &catalogs, UdsClientConfig::default());

    mock.expect("222023", &["7E8 05 62 20 23 01 F4"]);
    let reading = uds.read_did("generic", 0x2023).unwrap();
    assert_eq!(reading.did, "2023");
    assert_eq!(reading.raw, "01F4");
    assert_eq!(reading.name, None);
    assert_eq!(reading.value, None);
}

#[test]
fn test_send_raw_keeps_negative_responses() {
    let mock = MockLink::new();
    let mut elm = connected(&mock);
    let catalogs = CatalogSet::new();
    let mut uds = UdsClient::new(&mut elm, &catalogs, UdsClientConfig::default());

    mock.respond("22F1A0", &["7E8 03 7F 22 31"]);
    assert_eq!(
        uds.send_raw(0x22, &[0xF1, 0xA0], false).unwrap(),
        vec![0x7F, 0x22, 0x31]
    );
    assert!(matches!(
        uds.send_raw(0x22, &[0xF1, 0xA0], true),
        Err(UdsError::NegativeResponse { service_id: 0x22, .. })
    ));
}

#[test]
fn test_unexpected_and_empty_responses() {
    let mock = MockLink::new();
    let mut elm = connected(&mock);
    let catalogs = CatalogSet::new();
    let mut uds = UdsClient::new(&mut elm, &catalogs, UdsClientConfig::default());

    mock.expect("3E00", &["7E8 02 50 03"]);
    assert_eq!(
        uds.tester_present(),
        Err(UdsError::UnexpectedResponse {
            expected: 0x7E,
            actual: 0x50,
        })
    );

    // Nothing scripted: the adapter answers NO DATA
    assert_eq!(
        uds.tester_present(),
        Err(UdsError::InvalidResponse("Empty UDS response".to_string()))
    );
    assert!(matches!(
        uds.send_raw(0x22, &[0xF1, 0x90], false),
        Err(UdsError::InvalidResponse(_))
    ));
}

#[test]
fn test_from_module_and_routine() {
    let mock = MockLink::new();
    let mut elm = connected(&mock);
    let catalogs = CatalogSet::from_yaml(JEEP_YAML).unwrap();
    let mut uds = UdsClient::from_module(
        &mut elm,
        &catalogs,
        "Dodge",
        "bcm",
        UdsClientConfig::default(),
    )
    .unwrap();
    assert_eq!(uds.transport().tx_id(), "620");
    assert_eq!(uds.transport().rx_id(), "504");

    mock.expect("31010203", &["504 05 71 01 02 03 00"]);
    let result = uds.start_routine("jeep", "reset_tpms").unwrap();
    assert_eq!(
        result,
        RoutineResult {
            routine: "reset_tpms".to_string(),
            routine_id: "0203".to_string(),
            status: "00".to_string(),
        }
    );
    assert_eq!(
        uds.routine_control("jeep", "bleed_brakes", 0x01, &[]),
        Err(UdsError::UnknownRoutine("bleed_brakes".to_string()))
    );
    assert_eq!(
        mock.sent(),
        vec!["ATSP6", "ATH1", "ATSH620", "ATCRA504", "31010203"]
    );
}

#[test]
fn test_from_module_unknown() {
    let mock = MockLink::new();
    let mut elm = connected(&mock);
    let catalogs = CatalogSet::new();
    let result = UdsClient::from_module(
        &mut elm,
        &catalogs,
        "jeep",
        "abs",
        UdsClientConfig::default(),
    );
    assert!(matches!(
        result,
        Err(UdsError::UnknownModule { ref brand, ref module }) if brand == "jeep" && module == "abs"
    ));
}

#[test]
fn test_session_without_auto_configure() {
    let mock = MockLink::new();
    let mut elm = connected(&mock);
    let catalogs = CatalogSet::new();
    let config = UdsClientConfig {
        auto_configure: false,
        ..Default::default()
    };
    let mut uds = UdsClient::new(&mut elm, &catalogs, config);

    mock.expect("1003", &["7E8 06 50 03 00 32 01 F4"]);
    uds.diagnostic_session(0x03).unwrap();
    assert!(!uds.is_configured());
    assert_eq!(mock.sent(), vec!["1003"]);
}

#[test]
fn test_write_did_after_response_pending() {
    let mock = MockLink::new();
    let mut elm = connected(&mock);
    let catalogs = CatalogSet::new();
    let mut uds = UdsClient::new(&mut elm, &catalogs, UdsClientConfig::default());

    mock.expect("2EF19041", &["7E8 03 7F 2E 78", "7E8 03 6E F1 90"]);
    let written = uds.write_did(Some("generic"), 0xF190, &[0x41]).unwrap();
    assert_eq!(written.did, "F190");
    assert_eq!(written.raw, "41");
    assert_eq!(written.name.as_deref(), Some("VIN"));
    assert_eq!(written.value, None);
}

#[test]
fn test_read_did_named() {
    let mock = MockLink::new();
    let mut elm = connected(&mock);
    let catalogs = CatalogSet::new();
    let mut uds = UdsClient::new(&mut elm, &catalogs, UdsClientConfig::default());

    assert_eq!(uds.read_did_named("generic", "Odometer"), Ok(None));
    assert!(mock.sent().is_empty());

    mock.expect("22F18C", &["7E8 06 62 F1 8C 31 32 33"]);
    let reading = uds
        .read_did_named("generic", "ecu serial number")
        .unwrap()
        .unwrap();
    assert_eq!(reading.value, Some(DidValue::Text("123".to_string())));
}

#[test]
fn test_release_restores_functional_addressing() {
    let mock = MockLink::new();
    let mut elm = connected(&mock);
    let catalogs = CatalogSet::new();
    let mut uds = UdsClient::new(&mut elm, &catalogs, UdsClientConfig::default());

    uds.configure().unwrap();
    mock.clear_sent();
    uds.release().unwrap();
    assert!(!uds.is_configured());
    assert_eq!(mock.sent(), vec!["ATCRA", "ATSH7DF", "ATH1"]);
}

#[test]
fn test_no_implicit_reconfigure_after_release() {
    let mock = MockLink::new();
    let mut elm = connected(&mock);
    let catalogs = CatalogSet::new();
    let mut uds = UdsClient::new(&mut elm, &catalogs, UdsClientConfig::default());

    mock.respond("3E00", &["7E8 02 7E 00"]);
    uds.tester_present().unwrap();
    uds.release().unwrap();
    mock.clear_sent();

    uds.tester_present().unwrap();
    assert!(!uds.is_configured());
    assert_eq!(mock.sent(), vec!["3E00"]);

    uds.configure().unwrap();
    assert!(uds.is_configured());
    assert_eq!(&mock.sent()[1..], &SETUP);
}

#[test]
fn test_adapter_rejects_header() {
    let mock = MockLink::new();
    let mut elm = connected(&mock);
    let catalogs = CatalogSet::new();
    let mut uds = UdsClient::new(&mut elm, &catalogs, UdsClientConfig::default());

    mock.expect("ATSH7E0", &["?"]);
    assert_eq!(
        uds.tester_present(),
        Err(UdsError::Channel(ChannelError::Negotiation(
            "ATSH7E0 rejected by adapter".to_string()
        )))
    );
    assert!(!uds.is_configured());
}

#[test]
fn test_disconnected_adapter() {
    let mock = MockLink::new();
    let mut elm = connected(&mock);
    let catalogs = CatalogSet::new();
    let mut uds = UdsClient::new(&mut elm, &catalogs, UdsClientConfig::default());

    mock.disconnect();
    assert!(matches!(
        uds.read_vin("generic"),
        Err(UdsError::Channel(ChannelError::Disconnected(_)))
    ));
}
