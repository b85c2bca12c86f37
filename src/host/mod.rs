//! Beacon hosts receive frames and produce physical light.

use std::fmt;
use std::io;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::color::Rgb;

pub mod serial;
pub use self::serial::{list_available_devices, select_device, SerialPortDevice, BAUD_RATE};

/// A link shared between the controller and its flash loop.
pub type SharedLink = Arc<Mutex<BeaconLink>>;

/// Transport and device discovery failures. A failed open or write leaves
/// the port closed.
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Failed to open beacon device {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to write to beacon device: {0}")]
    Write(#[from] io::Error),
    #[error("Failed to enumerate serial devices: {0}")]
    Enumerate(#[source] io::Error),
    #[error("No serial devices found, connect the beacon or set beacon.path")]
    NoDevice,
    #[error("Several serial devices found ({}), set beacon.path to pick one", .0.join(", "))]
    AmbiguousDevice(Vec<String>),
}

/// Line-oriented transport to the beacon hardware.
///
/// - **Production:** [`SerialPortDevice`]
/// - **Testing:** any in-memory recorder
pub trait BeaconPort: Send {
    fn is_open(&self) -> bool;
    fn open(&mut self) -> Result<(), LinkError>;
    /// Write a single command line. The terminator is added by the port.
    fn write_line(&mut self, line: &str) -> Result<(), LinkError>;
    fn close(&mut self);
}

/// One command line sent to the beacon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// Write RGB register 0.
    Color(Rgb),
    /// Hardware reset, turns the beacon off.
    Clear,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Color(rgb) => write!(f, "WR 00 {}", rgb),
            Frame::Clear => f.write_str("WR 00 01 01 01"),
        }
    }
}

/// Owns the beacon port and writes frames to it.
pub struct BeaconLink {
    port: Box<dyn BeaconPort>,
}

impl BeaconLink {
    pub fn new(port: Box<dyn BeaconPort>) -> BeaconLink {
        BeaconLink { port }
    }

    /// Wrap the link for sharing with a flash loop.
    pub fn shared(self) -> SharedLink {
        Arc::new(Mutex::new(self))
    }

    pub fn is_open(&self) -> bool {
        self.port.is_open()
    }

    /// Set the beacon to a color.
    pub fn send_frame(&mut self, rgb: Rgb) -> Result<(), LinkError> {
        self.send(Frame::Color(rgb))
    }

    /// Send the hardware clear command.
    pub fn send_clear_frame(&mut self) -> Result<(), LinkError> {
        self.send(Frame::Clear)
    }

    pub fn send(&mut self, frame: Frame) -> Result<(), LinkError> {
        if !self.port.is_open() {
            tracing::debug!("Beacon port closed, reopening");
            self.port.open()?;
        }

        tracing::info!(frame = %frame, "Beacon frame");
        if let Err(err) = self.port.write_line(&frame.to_string()) {
            self.port.close();
            return Err(err);
        }
        Ok(())
    }

    pub fn close(&mut self) {
        self.port.close();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory port used by the unit tests.

    use std::io;
    use std::sync::{Arc, Mutex};

    use super::{BeaconPort, LinkError};

    #[derive(Default)]
    pub struct PortLog {
        pub lines: Vec<String>,
        pub opens: usize,
        pub fail_next_write: bool,
        pub fail_next_open: bool,
    }

    #[derive(Clone, Default)]
    pub struct MemoryPort {
        pub log: Arc<Mutex<PortLog>>,
        open: bool,
    }

    impl MemoryPort {
        pub fn new() -> MemoryPort {
            MemoryPort::default()
        }

        pub fn lines(&self) -> Vec<String> {
            self.log.lock().unwrap().lines.clone()
        }
    }

    impl BeaconPort for MemoryPort {
        fn is_open(&self) -> bool {
            self.open
        }

        fn open(&mut self) -> Result<(), LinkError> {
            let mut log = self.log.lock().unwrap();
            if log.fail_next_open {
                log.fail_next_open = false;
                return Err(LinkError::Open {
                    path: "memory".into(),
                    source: io::Error::new(io::ErrorKind::NotFound, "unplugged"),
                });
            }
            log.opens += 1;
            self.open = true;
            Ok(())
        }

        fn write_line(&mut self, line: &str) -> Result<(), LinkError> {
            let mut log = self.log.lock().unwrap();
            if log.fail_next_write {
                log.fail_next_write = false;
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged").into());
            }
            log.lines.push(line.to_owned());
            Ok(())
        }

        fn close(&mut self) {
            self.open = false;
        }
    }
}
