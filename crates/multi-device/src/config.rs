//! # Configuration
//!
//! The dispatcher accepts a single reconfiguration key, [`MULTI_DEVICE_PRIORITIES`],
//! whose value lists devices from highest to lowest priority, each optionally
//! followed by a slot-count override in parentheses:
//!
//! ```text
//! GPU(4),CPU
//! ```
//!
//! Here `GPU` gets four slots and `CPU` gets whatever its backend reports as
//! optimal. Slot counts are only honoured at construction.

use std::fmt;
use std::str::FromStr;
use crate::error::{DispatchError, Result};

/// Config key selecting the device priority order.
pub const MULTI_DEVICE_PRIORITIES: &str = "MULTI_DEVICE_PRIORITIES";

/// One entry of a device priority list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceInformation {
    /// Device name, matching the key the backend was registered under
    pub name: String,

    /// Slot-count override, `None` to use the backend's optimum
    pub num_requests: Option<usize>,
}

impl DeviceInformation {
    /// Creates an entry that uses the backend's optimal slot count.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            num_requests: None,
        }
    }

    /// Creates an entry with an explicit slot count.
    pub fn with_requests(name: impl Into<String>, num_requests: usize) -> Self {
        Self {
            name: name.into(),
            num_requests: Some(num_requests),
        }
    }
}

impl fmt::Display for DeviceInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.num_requests {
            None => write!(f, "{}", self.name),
            Some(n) => write!(f, "{}({})", self.name, n),
        }
    }
}

impl FromStr for DeviceInformation {
    type Err = DispatchError;

    fn from_str(entry: &str) -> Result<Self> {
        let invalid = |reason: &str| DispatchError::InvalidPriorities {
            value: entry.to_string(),
            reason: reason.to_string(),
        };

        let entry = entry.trim();
        let (name, num_requests) = match entry.find('(') {
            None => {
                if entry.contains(')') {
                    return Err(invalid("unbalanced parenthesis"));
                }
                (entry, None)
            }
            Some(open) => {
                let count = entry[open + 1..]
                    .strip_suffix(')')
                    .ok_or_else(|| invalid("unbalanced parenthesis"))?;
                let count = count
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| invalid("number of requests must be a non-negative integer"))?;
                (entry[..open].trim_end(), Some(count))
            }
        };

        if name.is_empty() {
            return Err(invalid("device name is empty"));
        }
        Ok(Self {
            name: name.to_string(),
            num_requests,
        })
    }
}

/// Parse a comma separated priority list.
///
/// # Parameters
///
/// * `value` - Priority string such as `"GPU(4),CPU"`
///
/// # Returns
///
/// The entries in priority order, or [`DispatchError::InvalidPriorities`]
/// if any entry is malformed
pub fn parse_device_priorities(value: &str) -> Result<Vec<DeviceInformation>> {
    if value.trim().is_empty() {
        return Err(DispatchError::InvalidPriorities {
            value: value.to_string(),
            reason: "no devices listed".to_string(),
        });
    }
    value.split(',').map(str::parse).collect()
}

/// Render a priority list back into its string form.
pub fn format_device_priorities(devices: &[DeviceInformation]) -> String {
    devices
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
