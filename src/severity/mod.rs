//! Severity tiers and their beacon display policy.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::color::{self, ColorError, Rgb};

/// Problem severities, ordered by rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    NotClassified = 0,
    Information = 1,
    Warning = 2,
    Average = 3,
    High = 4,
    Disaster = 5,
}

impl Severity {
    pub const ALL: [Severity; 6] = [
        Severity::NotClassified,
        Severity::Information,
        Severity::Warning,
        Severity::Average,
        Severity::High,
        Severity::Disaster,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Severity::NotClassified => "not classified",
            Severity::Information => "information",
            Severity::Warning => "warning",
            Severity::Average => "average",
            Severity::High => "high",
            Severity::Disaster => "disaster",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Severity {
    type Err = SeverityError;

    fn from_str(s: &str) -> Result<Severity, SeverityError> {
        let name = s.trim().to_ascii_lowercase();
        Severity::ALL
            .iter()
            .copied()
            .find(|severity| severity.name() == name)
            .ok_or_else(|| SeverityError::UnknownSeverity(s.trim().to_owned()))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeverityError {
    #[error("Unknown severity {0:?}, expected one of: disaster, high, average, warning, information, not classified")]
    UnknownSeverity(String),
    #[error("Malformed severity option {0:?}, expected [name,#primary] or [name,#primary,#secondary,intervalMs]")]
    Malformed(String),
    #[error("Invalid interval {0:?}, expected a positive number of milliseconds")]
    InvalidInterval(String),
    #[error("Severity {0} is configured more than once")]
    Duplicate(Severity),
    #[error(transparent)]
    Color(#[from] ColorError),
}

/// How the beacon displays one severity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeverityOption {
    pub primary: Rgb,
    /// Flash partner for `primary`.
    pub secondary: Option<Rgb>,
    pub interval_to_secondary: Option<Duration>,
    /// Falls back to `interval_to_secondary` when unset.
    pub interval_to_primary: Option<Duration>,
    pub rank: Severity,
}

impl SeverityOption {
    /// A steady, single color option.
    pub fn steady(rank: Severity, primary: &str) -> Result<SeverityOption, SeverityError> {
        Ok(SeverityOption {
            primary: color::encode(primary)?,
            secondary: None,
            interval_to_secondary: None,
            interval_to_primary: None,
            rank,
        })
    }

    /// An option alternating between two colors every `interval_ms`.
    pub fn flashing(
        rank: Severity,
        primary: &str,
        secondary: &str,
        interval_ms: u64,
    ) -> Result<SeverityOption, SeverityError> {
        if interval_ms == 0 {
            return Err(SeverityError::InvalidInterval(interval_ms.to_string()));
        }
        Ok(SeverityOption {
            secondary: Some(color::encode(secondary)?),
            interval_to_secondary: Some(Duration::from_millis(interval_ms)),
            ..SeverityOption::steady(rank, primary)?
        })
    }

    /// Use a different wait before switching back to the primary color.
    pub fn with_interval_to_primary(mut self, interval_ms: u64) -> Result<SeverityOption, SeverityError> {
        if interval_ms == 0 {
            return Err(SeverityError::InvalidInterval(interval_ms.to_string()));
        }
        self.interval_to_primary = Some(Duration::from_millis(interval_ms));
        Ok(self)
    }

    /// The two colors and their timing, if this option flashes.
    pub fn flash_pattern(&self) -> Option<FlashPattern> {
        let secondary = self.secondary?;
        let to_secondary = self.interval_to_secondary?;
        Some(FlashPattern {
            primary: self.primary,
            secondary,
            to_secondary,
            to_primary: self.interval_to_primary.unwrap_or(to_secondary),
        })
    }

    /// Parse one entry in the `[name,#primary,#secondary,intervalMs]` syntax.
    ///
    /// The brackets are optional and an extra trailing field sets the
    /// interval back to the primary color.
    pub fn parse_entry(entry: &str) -> Result<SeverityOption, SeverityError> {
        let cleaned = entry.replace(['[', ']'], "");
        let fields: Vec<&str> = cleaned.split(',').map(str::trim).collect();

        match fields.as_slice() {
            [name, primary] => SeverityOption::steady(name.parse()?, primary),
            [name, primary, secondary, interval] => {
                SeverityOption::flashing(name.parse()?, primary, secondary, parse_interval(interval)?)
            }
            [name, primary, secondary, interval, back] => {
                SeverityOption::flashing(name.parse()?, primary, secondary, parse_interval(interval)?)?
                    .with_interval_to_primary(parse_interval(back)?)
            }
            _ => Err(SeverityError::Malformed(entry.to_owned())),
        }
    }
}

fn parse_interval(s: &str) -> Result<u64, SeverityError> {
    match s.parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(ms),
        _ => Err(SeverityError::InvalidInterval(s.to_owned())),
    }
}

/// Two colors and how long each is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashPattern {
    pub primary: Rgb,
    pub secondary: Rgb,
    pub to_secondary: Duration,
    pub to_primary: Duration,
}

/// Display options keyed by severity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeverityTable {
    options: BTreeMap<Severity, SeverityOption>,
}

impl SeverityTable {
    pub fn new() -> SeverityTable {
        SeverityTable {
            options: BTreeMap::new(),
        }
    }

    /// Build a table from option-syntax entries. Each severity may appear once.
    pub fn parse_entries<I, S>(entries: I) -> Result<SeverityTable, SeverityError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = SeverityTable::new();
        for entry in entries {
            table.insert(SeverityOption::parse_entry(entry.as_ref())?)?;
        }
        Ok(table)
    }

    pub fn insert(&mut self, option: SeverityOption) -> Result<(), SeverityError> {
        if self.options.contains_key(&option.rank) {
            return Err(SeverityError::Duplicate(option.rank));
        }
        self.options.insert(option.rank, option);
        Ok(())
    }

    pub fn get(&self, severity: Severity) -> Option<&SeverityOption> {
        self.options.get(&severity)
    }

    /// Severities the beacon reacts to, lowest first.
    pub fn severities(&self) -> impl Iterator<Item = Severity> + '_ {
        self.options.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Pick the option for the most severe of the active conditions.
    ///
    /// Severities without a configured option are ignored.
    pub fn select<I>(&self, active: I) -> Option<&SeverityOption>
    where
        I: IntoIterator<Item = Severity>,
    {
        active
            .into_iter()
            .filter_map(|severity| self.get(severity))
            .max_by_key(|option| option.rank)
    }
}

impl Default for SeverityTable {
    fn default() -> SeverityTable {
        let red = Rgb::new(0xFF, 0x01, 0x01);
        let flash = |rank, secondary| SeverityOption {
            primary: red,
            secondary: Some(secondary),
            interval_to_secondary: Some(Duration::from_millis(125)),
            interval_to_primary: None,
            rank,
        };
        let steady = |rank, primary| SeverityOption {
            primary,
            secondary: None,
            interval_to_secondary: None,
            interval_to_primary: None,
            rank,
        };

        let options = [
            flash(Severity::Disaster, Rgb::new(0x01, 0x01, 0xFF)),
            flash(Severity::High, Rgb::new(0x01, 0x01, 0x01)),
            steady(Severity::Average, Rgb::new(0xFF, 0xA5, 0x01)),
            steady(Severity::Warning, Rgb::new(0xFF, 0xFF, 0x01)),
        ];
        SeverityTable {
            options: options.into_iter().map(|option| (option.rank, option)).collect(),
        }
    }
}
