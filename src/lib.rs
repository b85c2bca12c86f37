//! Drives an RGB signal beacon over a serial line to show the most severe
//! active monitoring problem.

pub mod beacon;
pub mod color;
pub mod config;
pub mod flash;
pub mod host;
pub mod poller;
pub mod severity;

pub use beacon::{BeaconController, BeaconError, BeaconOutput};
pub use color::{encode, ColorError, Rgb};
pub use host::{list_available_devices, BeaconLink, BeaconPort, Frame, LinkError, SerialPortDevice};
pub use severity::{Severity, SeverityOption, SeverityTable};
