//! Serial port discovery

use serialport::SerialPortType;
use tracing::debug;

/// Candidate adapter devices, in enumeration order
///
/// USB serial ports plus devices whose name marks them as USB serial
/// bridges. Bluetooth and debug console devices are excluded.
pub fn find_ports() -> Vec<String> {
    let ports = match serialport::available_ports() {
        Ok(ports) => ports,
        Err(e) => {
            debug!(error = %e, "Serial port enumeration failed");
            return Vec::new();
        }
    };

    ports
        .into_iter()
        .filter(|p| is_candidate(&p.port_name, matches!(p.port_type, SerialPortType::UsbPort(_))))
        .map(|p| p.port_name)
        .collect()
}

fn is_candidate(device: &str, usb: bool) -> bool {
    let dev = device.to_lowercase();
    if dev.contains("bluetooth") || dev.contains("debug-console") {
        return false;
    }
    usb || ["usbserial", "ttyusb", "ttyacm", "slab_usbtouart"]
        .iter()
        .any(|pattern| dev.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_filter() {
        assert!(is_candidate("/dev/ttyUSB0", false));
        assert!(is_candidate("/dev/cu.wchusbserial1410", false));
        assert!(is_candidate("COM3", true));
        assert!(!is_candidate("/dev/cu.Bluetooth-Incoming-Port", true));
        assert!(!is_candidate("/dev/cu.debug-console", false));
        assert!(!is_candidate("/dev/ttyS0", false));
    }
}
