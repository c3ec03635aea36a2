//! Readiness monitor decoding (Mode 01 PID 01)
//!
//! Input is the four data bytes A B C D. `A & 0x80` is the MIL, `B & 0x08`
//! selects compression ignition. For every monitor a set completion bit
//! means "incomplete"; unsupported monitors never report complete.

use elmscan_core::ReadinessStatus;

pub const MIL_MONITOR: &str = "MIL (Check Engine Light)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Byte {
    B,
    C,
}

/// (name, support byte, support bit, completion bit in D)
const SPARK_NON_CONTINUOUS: [(&str, Byte, u8, u8); 8] = [
    ("Catalyst", Byte::B, 4, 0),
    ("Heated Catalyst", Byte::B, 5, 1),
    ("Evaporative System", Byte::B, 6, 2),
    ("Secondary Air", Byte::B, 7, 3),
    ("A/C Refrigerant", Byte::C, 3, 4),
    ("Oxygen Sensor", Byte::C, 4, 5),
    ("Oxygen Sensor Heater", Byte::C, 5, 6),
    ("EGR System", Byte::C, 6, 7),
];

const CONTINUOUS: [(&str, u8); 3] = [("Misfire", 0), ("Fuel System", 1), ("Components", 2)];

/// (name, bit) - support from C, completion from D at the same bit
const DIESEL: [(&str, u8); 6] = [
    ("NMHC Catalyst", 0),
    ("NOx/SCR Aftertreatment", 1),
    ("Boost Pressure", 3),
    ("Exhaust Gas Sensor", 5),
    ("PM Filter", 6),
    ("EGR/VVT System", 7),
];

fn bit(byte: u8, n: u8) -> bool {
    byte & (1 << n) != 0
}

fn monitor(name: &str, supported: bool, incomplete: bool) -> ReadinessStatus {
    ReadinessStatus::new(name, supported, supported && !incomplete)
}

pub fn is_compression_ignition(b: u8) -> bool {
    b & 0x08 != 0
}

/// Decode readiness bytes into monitors, MIL first
pub fn decode(a: u8, b: u8, c: u8, d: u8) -> Vec<ReadinessStatus> {
    let mil_on = a & 0x80 != 0;
    let mut monitors = vec![ReadinessStatus::new(MIL_MONITOR, true, !mil_on)];

    if is_compression_ignition(b) {
        for (name, n) in DIESEL {
            monitors.push(monitor(name, bit(c, n), bit(d, n)));
        }
    } else {
        for (name, n) in CONTINUOUS {
            monitors.push(monitor(name, bit(b, n), bit(c, n)));
        }
        for (name, byte, support_bit, d_bit) in SPARK_NON_CONTINUOUS {
            let source = match byte {
                Byte::B => b,
                Byte::C => c,
            };
            monitors.push(monitor(name, bit(source, support_bit), bit(d, d_bit)));
        }
    }
    monitors
}

/// Decode from a `41 01 A B C D` payload; empty when too short
pub fn decode_payload(payload: &[u8]) -> Vec<ReadinessStatus> {
    match payload {
        [0x41, 0x01, a, b, c, d, ..] => decode(*a, *b, *c, *d),
        _ => Vec::new(),
    }
}
