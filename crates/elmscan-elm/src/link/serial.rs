//! Serial port link backed by the `serialport` crate

use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, Parity, SerialPort, StopBits};
use tracing::debug;

use super::{not_open, SerialLink};

/// 8N1 serial port
pub struct SerialPortLink {
    port_name: Option<String>,
    baudrate: u32,
    timeout: Duration,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialPortLink {
    pub fn new(port_name: impl Into<String>, baudrate: u32, timeout: Duration) -> Self {
        Self {
            port_name: Some(port_name.into()),
            baudrate,
            timeout,
            port: None,
        }
    }

    /// Link without a device yet; call `set_port` before opening
    pub fn unassigned(baudrate: u32, timeout: Duration) -> Self {
        Self {
            port_name: None,
            baudrate,
            timeout,
            port: None,
        }
    }

    fn port_mut(&mut self) -> io::Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or_else(not_open)
    }
}

impl SerialLink for SerialPortLink {
    fn open(&mut self) -> io::Result<()> {
        let name = self
            .port_name
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "No serial port selected"))?;

        let port = serialport::new(&name, self.baudrate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(self.timeout)
            .open()?;

        debug!(port = %name, baudrate = self.baudrate, "Serial port opened");
        self.port = Some(port);
        Ok(())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!(port = ?self.port_name, "Serial port closed");
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn port(&self) -> Option<String> {
        self.port_name.clone()
    }

    fn set_port(&mut self, port: &str) {
        self.port_name = Some(port.to_string());
    }

    fn clear_buffers(&mut self) -> io::Result<()> {
        self.port_mut()?.clear(ClearBuffer::All)?;
        Ok(())
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        Write::write_all(self.port_mut()?, data)
    }

    fn flush(&mut self) -> io::Result<()> {
        Write::flush(self.port_mut()?)
    }

    fn bytes_to_read(&mut self) -> io::Result<usize> {
        Ok(self.port_mut()?.bytes_to_read()? as usize)
    }

    fn read_available(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        let pending = self.bytes_to_read()?;
        if pending == 0 {
            return Ok(0);
        }
        let mut chunk = vec![0u8; pending];
        let n = self.port_mut()?.read(&mut chunk)?;
        buf.extend_from_slice(&chunk[..n]);
        Ok(n)
    }
}
