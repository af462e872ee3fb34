//! # Metric Keys
//!
//! Read-only, key-value introspection of a dispatcher. See
//! [`crate::MultiDeviceDispatcher::metric`].

use std::fmt;
use crate::config::MULTI_DEVICE_PRIORITIES;

/// Total number of execution slots across all devices.
pub const OPTIMAL_NUMBER_OF_INFER_REQUESTS: &str = "OPTIMAL_NUMBER_OF_INFER_REQUESTS";

/// Name of the network loaded onto the devices.
pub const NETWORK_NAME: &str = "NETWORK_NAME";

/// Lists every supported metric key.
pub const SUPPORTED_METRICS: &str = "SUPPORTED_METRICS";

/// Lists every supported config key.
pub const SUPPORTED_CONFIG_KEYS: &str = "SUPPORTED_CONFIG_KEYS";

/// Value of a metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricValue {
    /// A count
    Unsigned(usize),
    /// A name
    Text(String),
    /// A list of keys
    Keys(Vec<String>),
}

impl MetricValue {
    /// The count, if this is a count
    pub fn as_unsigned(&self) -> Option<usize> {
        match self {
            Self::Unsigned(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_keys(&self) -> Option<&[String]> {
        match self {
            Self::Keys(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsigned(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Keys(v) => f.write_str(&v.join(",")),
        }
    }
}

pub(crate) fn supported_metrics() -> Vec<String> {
    [
        OPTIMAL_NUMBER_OF_INFER_REQUESTS,
        SUPPORTED_METRICS,
        NETWORK_NAME,
        SUPPORTED_CONFIG_KEYS,
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

pub(crate) fn supported_config_keys() -> Vec<String> {
    vec![MULTI_DEVICE_PRIORITIES.to_string()]
}
