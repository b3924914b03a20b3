//! Device Selection
//!
//! Two selector formats reach the pipeline:
//! - the `--devices` option of NVBench executables (`0`, `0,1,2` or `all`)
//! - the `IB_DEVICES` environment value, which names InfiniBand devices either
//!   by index or by device name, but never a mix of both
//!
//! Both are validated here as pure functions over the raw string, so callers
//! decide where the value comes from.

use crate::error::ConfigError;
use std::fmt;

/// GPU selection passed through as `--devices <sel>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelector {
    /// Every visible device
    All,
    /// Explicit device indices, in the order given
    Indices(Vec<u32>),
}

impl DeviceSelector {
    /// Parse `"all"`, `"3"` or `"0,1,2"`.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(DeviceSelector::All);
        }

        let indices = trimmed
            .split(',')
            .map(|entry| entry.trim().parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ConfigError::InvalidDeviceSelector(value.to_string()))?;

        if indices.is_empty() {
            return Err(ConfigError::InvalidDeviceSelector(value.to_string()));
        }
        Ok(DeviceSelector::Indices(indices))
    }
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSelector::All => write!(f, "all"),
            DeviceSelector::Indices(indices) => {
                let joined: Vec<String> = indices.iter().map(|i| i.to_string()).collect();
                write!(f, "{}", joined.join(","))
            }
        }
    }
}

/// Validated InfiniBand device selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IbDeviceSelection {
    /// No selection given; devices are discovered from the system
    Discover,
    /// Numeric indices into the discovered device list
    Indices(Vec<u32>),
    /// Device names used as-is (e.g. `mlx5_ib0`)
    Names(Vec<String>),
}

/// Validate an `IB_DEVICES`-style value.
///
/// Entries must be either all numeric indices or all device names. A blank
/// value means "discover".
pub fn parse_ib_devices(value: &str) -> Result<IbDeviceSelection, ConfigError> {
    if value.trim().is_empty() {
        return Ok(IbDeviceSelection::Discover);
    }

    let entries: Vec<&str> = value.split(',').map(str::trim).collect();
    if entries.iter().any(|e| e.is_empty()) {
        return Err(ConfigError::EmptyDeviceEntry(value.to_string()));
    }

    let numeric = entries
        .iter()
        .filter(|e| e.bytes().all(|b| b.is_ascii_digit()))
        .count();

    if numeric == entries.len() {
        let indices = entries
            .iter()
            .map(|e| e.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ConfigError::InvalidDeviceSelector(value.to_string()))?;
        Ok(IbDeviceSelection::Indices(indices))
    } else if numeric == 0 {
        Ok(IbDeviceSelection::Names(
            entries.into_iter().map(String::from).collect(),
        ))
    } else {
        Err(ConfigError::MixedDeviceList(value.to_string()))
    }
}
