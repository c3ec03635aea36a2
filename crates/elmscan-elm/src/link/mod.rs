//! Byte-level serial link to the adapter
//!
//! The channel only needs a handful of operations from the port; keeping
//! them behind [`SerialLink`] lets the channel, scanner and UDS client run
//! against [`MockLink`] in tests.

pub mod mock;
pub mod serial;

pub use mock::MockLink;
pub use serial::SerialPortLink;

use std::io;

/// Half-duplex byte link
///
/// I/O faults are reported as `io::Error`; the channel classifies them by
/// text into disconnected vs communication failures.
pub trait SerialLink: Send {
    fn open(&mut self) -> io::Result<()>;

    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Device name the link opens
    fn port(&self) -> Option<String>;

    /// Retarget the link; takes effect on the next `open`
    fn set_port(&mut self, port: &str);

    /// Discard pending input and output
    fn clear_buffers(&mut self) -> io::Result<()>;

    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;

    /// Bytes waiting in the input buffer
    fn bytes_to_read(&mut self) -> io::Result<usize>;

    /// Append everything currently buffered to `buf`
    fn read_available(&mut self, buf: &mut Vec<u8>) -> io::Result<usize>;
}

pub(crate) fn not_open() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "Serial port is closed")
}
