//! Channel + normalizer over a scripted adapter

use elmscan_elm::normalize::ascii_printable;
use elmscan_elm::{EcuPayloads, Elm327, ElmConfig, FileRawLog, MockLink};

fn connected(mock: &MockLink) -> Elm327 {
    let mut elm = Elm327::new(Box::new(mock.clone()), ElmConfig::fast());
    elm.connect().expect("connect over mock link");
    elm
}

#[test]
fn test_multi_ecu_reply_normalized() {
    let mock = MockLink::new();
    let mut elm = connected(&mock);
    mock.expect(
        "0100",
        &[
            "SEARCHING...",
            "7E9 06 41 00 98 18 80 13",
            "7E8 06 41 00 BE 3E B8 11",
            ">",
        ],
    );

    let lines = elm.send_obd_lines("0100").unwrap();
    let payloads = EcuPayloads::from_lines(&lines, elm.headers_on());
    assert_eq!(payloads.len(), 2);

    let hit = payloads.find_prefix(&[0x41, 0x00], &["7E8"]).unwrap();
    assert_eq!(hit.ecu, "7E8");
    assert_eq!(hit.payload, vec![0x41, 0x00, 0xBE, 0x3E, 0xB8, 0x11]);
}

#[test]
fn test_vin_over_isotp() {
    let mock = MockLink::new();
    let mut elm = connected(&mock);
    mock.expect(
        "0902",
        &[
            "7E8 10 14 49 02 01 57 56 57",
            "7E8 21 5A 5A 5A 31 4B 5A 41",
            "7E8 22 4D 30 37 34 36 33 32",
        ],
    );

    let lines = elm.send_obd_lines("0902").unwrap();
    let payloads = EcuPayloads::from_lines_isotp(&lines, true);
    let payload = payloads.get("7E8").unwrap();
    assert_eq!(ascii_printable(&payload[3..]), "WVWZZZ1KZAM074632");
}

#[test]
fn test_raw_log_captures_traffic() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("raw.log");
    let mock = MockLink::new();
    let mut elm = Elm327::new(Box::new(mock.clone()), ElmConfig::fast())
        .with_raw_log(Box::new(FileRawLog::new(&path).unwrap()));
    elm.connect().unwrap();
    mock.expect("010D", &["7E8 03 41 0D 32"]);
    elm.send_obd_lines("010D").unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("TX ATZ"));
    assert!(content.contains("RX 010D\n  7E8 03 41 0D 32\n"));
}
