//! Serial transport seam and its `serialport`-backed implementation.

use crate::error::LinkError;
use log::debug;
use serialport::{ClearBuffer, SerialPort, SerialPortType};
use std::io::{self, Read, Write};
use std::time::Duration;

/// Baud rate the glove firmware talks at.
pub const DEFAULT_BAUD: u32 = 115_200;

/// Read timeout on an open port; bounds how long the reader takes to notice a stop.
pub const READ_TIMEOUT: Duration = Duration::from_millis(50);

/// An open serial connection.
pub trait SerialLink: Send {
    fn write_byte(&mut self, byte: u8) -> io::Result<()>;

    /// Discards anything buffered in either direction.
    fn clear(&mut self) -> io::Result<()>;

    /// Reads available bytes. A timeout surfaces as `ErrorKind::TimedOut`.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Enumerates and opens serial ports.
pub trait SerialTransport {
    fn list_ports(&self) -> Result<Vec<String>, LinkError>;
    fn open(&self, port: &str, baud_rate: u32) -> Result<Box<dyn SerialLink>, LinkError>;
}

/// The host's real serial ports.
pub struct SystemSerial;

impl SystemSerial {
    pub fn new() -> Self {
        SystemSerial
    }

    /// Port names with a short description, for `--list-ports`.
    pub fn describe_ports() -> Result<Vec<String>, LinkError> {
        let ports =
            serialport::available_ports().map_err(|e| LinkError::Enumeration(e.to_string()))?;
        Ok(ports
            .into_iter()
            .map(|p| {
                let detail = match &p.port_type {
                    SerialPortType::UsbPort(info) => format!(
                        "USB VID:{:04x} PID:{:04x}{}",
                        info.vid,
                        info.pid,
                        info.product
                            .as_deref()
                            .map(|s| format!(" \"{}\"", s))
                            .unwrap_or_default()
                    ),
                    SerialPortType::BluetoothPort => "Bluetooth".into(),
                    SerialPortType::PciPort => "PCI".into(),
                    SerialPortType::Unknown => "Serial".into(),
                };
                format!("{}  ({})", p.port_name, detail)
            })
            .collect())
    }
}

impl Default for SystemSerial {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialTransport for SystemSerial {
    fn list_ports(&self) -> Result<Vec<String>, LinkError> {
        let ports =
            serialport::available_ports().map_err(|e| LinkError::Enumeration(e.to_string()))?;
        let names: Vec<String> = ports.into_iter().map(|p| p.port_name).collect();
        debug!("Enumerated serial ports: {:?}", names);
        Ok(names)
    }

    fn open(&self, port: &str, baud_rate: u32) -> Result<Box<dyn SerialLink>, LinkError> {
        let serial = serialport::new(port, baud_rate)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| LinkError::TransportOpen {
                port: port.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Box::new(SystemLink { port: serial }))
    }
}

struct SystemLink {
    port: Box<dyn SerialPort>,
}

impl SerialLink for SystemLink {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.port.write_all(&[byte])?;
        self.port.flush()
    }

    fn clear(&mut self) -> io::Result<()> {
        self.port.clear(ClearBuffer::All).map_err(io::Error::from)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}
