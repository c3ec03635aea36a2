//! Mode 01 PID registry and formulas

/// One Mode 01 parameter
#[derive(Debug, Clone, Copy)]
pub struct PidInfo {
    pub pid: u8,
    pub name: &'static str,
    pub unit: &'static str,
    /// Data bytes the formula consumes (1 or 2)
    pub bytes: usize,
    pub formula: fn(&[u8]) -> f64,
    pub min: f64,
    pub max: f64,
}

impl PidInfo {
    /// PID as two uppercase hex digits
    pub fn code(&self) -> String {
        format!("{:02X}", self.pid)
    }

    /// Apply the formula; `None` when `data` is too short
    pub fn decode(&self, data: &[u8]) -> Option<f64> {
        if data.len() < self.bytes {
            return None;
        }
        Some((self.formula)(&data[..self.bytes]))
    }
}

/// PIDs read by default for live data
pub const DIAGNOSTIC_PIDS: &[&str] = &[
    "05", "0C", "0D", "11", "45", "49", "4A", "4C", "42", "0B", "06", "07",
];

pub const TEMPERATURE_PIDS: &[&str] = &["05", "0F", "5C"];

pub const THROTTLE_PIDS: &[&str] = &["11", "45", "47", "4C", "49", "4A"];

/// PIDs read under Mode 02 for a freeze frame
pub const FREEZE_FRAME_PIDS: &[&str] = &["04", "05", "06", "07", "0B", "0C", "0D", "0E", "0F", "11"];

fn a(d: &[u8]) -> f64 {
    d[0] as f64
}

fn ab(d: &[u8]) -> f64 {
    d[0] as f64 * 256.0 + d[1] as f64
}

fn percent(d: &[u8]) -> f64 {
    a(d) * 100.0 / 255.0
}

fn temperature(d: &[u8]) -> f64 {
    a(d) - 40.0
}

fn fuel_trim(d: &[u8]) -> f64 {
    (a(d) - 128.0) * 100.0 / 128.0
}

macro_rules! pid_table {
    ($( $pid:literal, $name:literal, $unit:literal, $bytes:literal, $formula:expr, $min:literal, $max:literal; )*) => {
        static PIDS: &[PidInfo] = &[
            $( PidInfo {
                pid: $pid,
                name: $name,
                unit: $unit,
                bytes: $bytes,
                formula: $formula,
                min: $min,
                max: $max,
            }, )*
        ];
    };
}

pid_table! {
    0x04, "Calculated Engine Load", "%", 1, percent, 0.0, 100.0;
    0x05, "Engine Coolant Temperature", "°C", 1, temperature, -40.0, 215.0;
    0x06, "Short Term Fuel Trim - Bank 1", "%", 1, fuel_trim, -100.0, 99.2;
    0x07, "Long Term Fuel Trim - Bank 1", "%", 1, fuel_trim, -100.0, 99.2;
    0x08, "Short Term Fuel Trim - Bank 2", "%", 1, fuel_trim, -100.0, 99.2;
    0x09, "Long Term Fuel Trim - Bank 2", "%", 1, fuel_trim, -100.0, 99.2;
    0x0A, "Fuel Pressure", "kPa", 1, |d| a(d) * 3.0, 0.0, 765.0;
    0x0B, "Intake Manifold Pressure", "kPa", 1, a, 0.0, 255.0;
    0x0C, "Engine RPM", "rpm", 2, |d| ab(d) / 4.0, 0.0, 16383.75;
    0x0D, "Vehicle Speed", "km/h", 1, a, 0.0, 255.0;
    0x0E, "Timing Advance", "°", 1, |d| a(d) / 2.0 - 64.0, -64.0, 63.5;
    0x0F, "Intake Air Temperature", "°C", 1, temperature, -40.0, 215.0;
    0x10, "MAF Air Flow Rate", "g/s", 2, |d| ab(d) / 100.0, 0.0, 655.35;
    0x11, "Throttle Position", "%", 1, percent, 0.0, 100.0;
    0x1F, "Run Time Since Engine Start", "s", 2, ab, 0.0, 65535.0;
    0x21, "Distance Traveled with MIL On", "km", 2, ab, 0.0, 65535.0;
    0x22, "Fuel Rail Pressure (relative to vacuum)", "kPa", 2, |d| ab(d) * 0.079, 0.0, 5177.27;
    0x23, "Fuel Rail Gauge Pressure", "kPa", 2, |d| ab(d) * 10.0, 0.0, 655350.0;
    0x2C, "Commanded EGR", "%", 1, percent, 0.0, 100.0;
    0x2E, "Commanded Evaporative Purge", "%", 1, percent, 0.0, 100.0;
    0x2F, "Fuel Tank Level Input", "%", 1, percent, 0.0, 100.0;
    0x31, "Distance Traveled Since Codes Cleared", "km", 2, ab, 0.0, 65535.0;
    0x33, "Absolute Barometric Pressure", "kPa", 1, a, 0.0, 255.0;
    0x3C, "Catalyst Temperature Bank 1 Sensor 1", "°C", 2, |d| ab(d) / 10.0 - 40.0, -40.0, 6513.5;
    0x42, "Control Module Voltage", "V", 2, |d| ab(d) / 1000.0, 0.0, 65.535;
    0x43, "Absolute Load Value", "%", 2, |d| ab(d) * 100.0 / 255.0, 0.0, 25700.0;
    0x44, "Commanded Air-Fuel Equivalence Ratio", "ratio", 2, |d| ab(d) * 2.0 / 65536.0, 0.0, 2.0;
    0x45, "Relative Throttle Position", "%", 1, percent, 0.0, 100.0;
    0x46, "Ambient Air Temperature", "°C", 1, temperature, -40.0, 215.0;
    0x47, "Absolute Throttle Position B", "%", 1, percent, 0.0, 100.0;
    0x49, "Accelerator Pedal Position D", "%", 1, percent, 0.0, 100.0;
    0x4A, "Accelerator Pedal Position E", "%", 1, percent, 0.0, 100.0;
    0x4C, "Commanded Throttle Actuator", "%", 1, percent, 0.0, 100.0;
    0x4D, "Time Run with MIL On", "min", 2, ab, 0.0, 65535.0;
    0x4E, "Time Since Trouble Codes Cleared", "min", 2, ab, 0.0, 65535.0;
    0x5A, "Relative Accelerator Pedal Position", "%", 1, percent, 0.0, 100.0;
    0x5B, "Hybrid Battery Pack Remaining Life", "%", 1, percent, 0.0, 100.0;
    0x5C, "Engine Oil Temperature", "°C", 1, temperature, -40.0, 215.0;
    0x5E, "Engine Fuel Rate", "L/h", 2, |d| ab(d) / 20.0, 0.0, 3276.75;
}

/// Parse a PID given as hex ("0C", "0x0c", " 5C ")
pub fn parse_pid(pid: &str) -> Option<u8> {
    let pid = pid.trim();
    let pid = pid
        .strip_prefix("0x")
        .or_else(|| pid.strip_prefix("0X"))
        .unwrap_or(pid);
    if pid.is_empty() || pid.len() > 2 {
        return None;
    }
    u8::from_str_radix(pid, 16).ok()
}

pub fn pid_info(pid: u8) -> Option<&'static PidInfo> {
    PIDS.iter().find(|info| info.pid == pid)
}

pub fn get_pid_info(pid: &str) -> Option<&'static PidInfo> {
    parse_pid(pid).and_then(pid_info)
}

/// Every PID in the registry, as hex codes
pub fn list_available_pids() -> Vec<String> {
    PIDS.iter().map(PidInfo::code).collect()
}

pub fn all_pids() -> &'static [PidInfo] {
    PIDS
}

/// Decode data bytes for `pid`; `None` for unknown PIDs or short data
pub fn decode_pid(pid: &str, data: &[u8]) -> Option<f64> {
    get_pid_info(pid)?.decode(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpm() {
        assert_eq!(decode_pid("0C", &[0x1A, 0xF8]), Some(1726.0));
        assert_eq!(decode_pid("0c", &[0x1A, 0x2B]), Some(1674.75));
    }

    #[test]
    fn test_single_byte_formulas() {
        assert_eq!(decode_pid("05", &[0x7B]), Some(83.0));
        assert_eq!(decode_pid("0D", &[0x32]), Some(50.0));
        assert_eq!(decode_pid("04", &[0xFF]), Some(100.0));
        assert_eq!(decode_pid("06", &[0x80]), Some(0.0));
        assert_eq!(decode_pid("0E", &[0x80]), Some(0.0));
    }

    #[test]
    fn test_unknown_or_short() {
        assert_eq!(decode_pid("FF", &[0x00]), None);
        assert_eq!(decode_pid("0C", &[0x1A]), None);
        assert_eq!(decode_pid("zz", &[0x1A]), None);
    }

    #[test]
    fn test_extra_bytes_ignored() {
        assert_eq!(decode_pid("0D", &[0x32, 0x00, 0x00]), Some(50.0));
    }

    #[test]
    fn test_registry() {
        let info = get_pid_info("0x0c").unwrap();
        assert_eq!(info.name, "Engine RPM");
        assert_eq!(info.bytes, 2);
        assert_eq!(info.code(), "0C");

        let pids = list_available_pids();
        assert!(pids.contains(&"5C".to_string()));
        for pid in DIAGNOSTIC_PIDS.iter().chain(TEMPERATURE_PIDS).chain(THROTTLE_PIDS) {
            assert!(get_pid_info(pid).is_some(), "missing {}", pid);
        }
    }

    #[test]
    fn test_widths_are_one_or_two() {
        assert!(all_pids().iter().all(|p| p.bytes == 1 || p.bytes == 2));
    }
}
