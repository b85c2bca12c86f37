use std::path::Path;
use std::time::Duration;
use std::{fs, io};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::Rgb;
use crate::severity::{SeverityError, SeverityTable};

const DEFAULT_CLEAR_AFTER: u32 = 9;
const DEFAULT_INTERVAL_SECS: u64 = 15;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Error reading config file: {0}")]
    Io(#[from] io::Error),
    #[error("Error parsing YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Error parsing JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid severity option: {0}")]
    Severity(#[from] SeverityError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Root {
    /// Beacon device configuration.
    #[serde(default)]
    pub beacon: Beacon,
    /// Problem polling.
    #[serde(default)]
    pub poll: Poll,
    /// Severity options in `[name,#primary,#secondary,intervalMs]` form.
    /// The stock table is used when absent.
    #[serde(default)]
    pub severities: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Beacon {
    /// Path to a serial device. May be omitted when exactly one device is attached.
    #[serde(default)]
    pub path: Option<String>,
    /// Color shown while there are no problems but the beacon isn't cleared yet.
    #[serde(default = "default_idle_color")]
    pub idle_color: Rgb,
    /// Number of successive clear polls before the beacon is switched off.
    #[serde(default = "default_clear_after")]
    pub clear_after: u32,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    /// Seconds between polls.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_idle_color() -> Rgb {
    // #01FF01
    Rgb::new(0x01, 0xFF, 0x01)
}

fn default_clear_after() -> u32 {
    DEFAULT_CLEAR_AFTER
}

fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL_SECS
}

impl Default for Beacon {
    fn default() -> Beacon {
        Beacon {
            path: None,
            idle_color: default_idle_color(),
            clear_after: DEFAULT_CLEAR_AFTER,
        }
    }
}

impl Default for Poll {
    fn default() -> Poll {
        Poll {
            interval_secs: DEFAULT_INTERVAL_SECS,
        }
    }
}

impl Root {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll.interval_secs)
    }

    /// The configured severity table, or the stock one.
    pub fn severity_table(&self) -> Result<SeverityTable, ConfigError> {
        match &self.severities {
            Some(entries) => Ok(SeverityTable::parse_entries(entries)?),
            None => Ok(SeverityTable::default()),
        }
    }

    /// Quick sanity check for the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.beacon.clear_after == 0 {
            return Err(ConfigError::Invalid("beacon.clearAfter must be at least 1".into()));
        }
        if self.poll.interval_secs == 0 {
            return Err(ConfigError::Invalid("poll.intervalSecs must be at least 1".into()));
        }
        if self.severity_table()?.is_empty() {
            return Err(ConfigError::Invalid("no severities configured".into()));
        }
        Ok(())
    }
}

pub fn read_config_yaml<T: AsRef<Path>>(path: T) -> Result<Root, ConfigError> {
    let file = fs::File::open(path)?;
    let reader = io::BufReader::new(file);
    let root: Root = serde_yaml::from_reader(reader)?;
    root.validate()?;
    Ok(root)
}

pub fn read_config_json<T: AsRef<Path>>(path: T) -> Result<Root, ConfigError> {
    let file = fs::File::open(path)?;
    let reader = io::BufReader::new(file);
    let root: Root = serde_json::from_reader(reader)?;
    root.validate()?;
    Ok(root)
}

/// Pick the reader by file extension, YAML unless it ends in `.json`.
pub fn read_config<T: AsRef<Path>>(path: T) -> Result<Root, ConfigError> {
    let path = path.as_ref();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => read_config_json(path),
        _ => read_config_yaml(path),
    }
}
