//! Serial beacon support.

use std::io::{self, Write};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use super::{BeaconPort, LinkError};

/// The beacon controller only talks at 9600 baud.
pub const BAUD_RATE: u32 = 9600;

const WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// A beacon connected through a USB serial port.
pub struct SerialPortDevice {
    /// Path to the serial device.
    path: String,
    /// Output port, `None` while closed.
    port: Option<Box<dyn SerialPort>>,
}

impl SerialPortDevice {
    /// Construct a closed device; it is opened on first write.
    pub fn new(path: &str) -> SerialPortDevice {
        SerialPortDevice {
            path: path.to_owned(),
            port: None,
        }
    }

    /// Construct and open immediately, so a bad path fails at startup.
    pub fn open_now(path: &str) -> Result<SerialPortDevice, LinkError> {
        let mut device = SerialPortDevice::new(path);
        device.open()?;
        Ok(device)
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl BeaconPort for SerialPortDevice {
    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn open(&mut self) -> Result<(), LinkError> {
        let port = serialport::new(self.path.as_str(), BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(WRITE_TIMEOUT)
            .open()
            .map_err(|err| LinkError::Open {
                path: self.path.clone(),
                source: io::Error::from(err),
            })?;

        tracing::info!(path = %self.path, baud = BAUD_RATE, "Opened beacon device");
        self.port = Some(port);
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> Result<(), LinkError> {
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))?;
        port.write_all(line.as_bytes())?;
        port.write_all(b"\n")?;
        port.flush()?;
        Ok(())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            tracing::info!(path = %self.path, "Closed beacon device");
        }
    }
}

/// Names of the serial devices present on this machine.
pub fn list_available_devices() -> Result<Vec<String>, LinkError> {
    let ports = serialport::available_ports()
        .map_err(|err| LinkError::Enumerate(io::Error::from(err)))?;
    Ok(ports.into_iter().map(|info| info.port_name).collect())
}

/// The configured device, or the only one present.
///
/// With no path configured and several devices attached there is no safe
/// guess, so the candidates are returned in the error.
pub fn select_device(configured: Option<&str>, mut available: Vec<String>) -> Result<String, LinkError> {
    if let Some(path) = configured {
        return Ok(path.to_owned());
    }
    match available.len() {
        0 => Err(LinkError::NoDevice),
        1 => Ok(available.remove(0)),
        _ => Err(LinkError::AmbiguousDevice(available)),
    }
}
