//! Beacon color codec.
//!
//! The beacon takes colors as three space-separated hex bytes. A channel
//! value of zero is treated as a command by the controller hardware, so
//! every `00` channel is sent as `01` instead.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Lowest channel value the beacon accepts as a color.
const MIN_CHANNEL: u8 = 0x01;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorError {
    /// Not `#` followed by exactly six hex digits.
    #[error("Invalid color format: {0:?} (expected #RRGGBB)")]
    InvalidColorFormat(String),
}

/// A color as it will be written to the beacon.
///
/// Channels are already remapped, so no channel is ever zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    /// Build a color from raw channel values, applying the zero remap.
    pub fn new(red: u8, green: u8, blue: u8) -> Rgb {
        Rgb {
            red: red.max(MIN_CHANNEL),
            green: green.max(MIN_CHANNEL),
            blue: blue.max(MIN_CHANNEL),
        }
    }

    /// The three two-digit hex segments in wire order.
    pub fn segments(&self) -> [String; 3] {
        [
            format!("{:02X}", self.red),
            format!("{:02X}", self.green),
            format!("{:02X}", self.blue),
        ]
    }
}

/// Encode a `#RRGGBB` string into device channels.
pub fn encode(hex: &str) -> Result<Rgb, ColorError> {
    let invalid = || ColorError::InvalidColorFormat(hex.to_owned());

    let digits = hex.strip_prefix('#').ok_or_else(invalid)?;
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let channel = |at: usize| u8::from_str_radix(&digits[at..at + 2], 16).map_err(|_| invalid());
    Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
}

impl FromStr for Rgb {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Rgb, ColorError> {
        encode(s)
    }
}

/// Renders the wire form, e.g. `FF 01 01`.
impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X} {:02X} {:02X}", self.red, self.green, self.blue)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&format_args!(
            "#{:02X}{:02X}{:02X}",
            self.red, self.green, self.blue
        ))
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Rgb, D::Error> {
        let s = String::deserialize(deserializer)?;
        encode(&s).map_err(serde::de::Error::custom)
    }
}
