//! # Errors
//!
//! Every fallible operation in the crate reports a [`DispatchError`]. Backends
//! report their own failures with the lighter [`BackendError`], which the
//! dispatcher wraps together with the name of the device that produced it.

use std::fmt;
use thiserror::Error;
use crate::backend::CompletionStatus;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DispatchError>;

/// A failure reported by a backend or by an inference job running on one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    message: String,
    status: Option<CompletionStatus>,
}

impl BackendError {
    /// Creates a new error carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    /// Creates an error for a completion that finished with a non-OK status.
    pub fn from_status(status: CompletionStatus) -> Self {
        Self {
            message: format!("execution finished with status {status}"),
            status: Some(status),
        }
    }

    /// Human readable description of the failure
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The completion status that caused this error, if any.
    pub fn status(&self) -> Option<CompletionStatus> {
        self.status
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for BackendError {}

/// Errors surfaced by the dispatcher and the request facade.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(
        "every device must report its optimal number of infer requests; \
         failed to query it for {device}: {source}"
    )]
    BackendMetric {
        device: String,
        #[source]
        source: BackendError,
    },

    #[error("device {device} failed to create an execution slot: {source}")]
    SlotCreation {
        device: String,
        #[source]
        source: BackendError,
    },

    #[error("device {device} was not in the original device list; only priorities can be changed")]
    UnknownDevice { device: String },

    #[error("device {device} requested a slot count; only priorities can be changed, not the number of requests")]
    SlotCountChange { device: String },

    #[error("device {device} appears more than once in the priority list")]
    DuplicateDevice { device: String },

    #[error("invalid device priorities '{value}': {reason}")]
    InvalidPriorities { value: String, reason: String },

    #[error("unsupported configuration: {reason}")]
    UnsupportedConfig { reason: String },

    #[error("unsupported metric: {name}")]
    UnknownMetric { name: String },

    #[error("{name} not found in the dispatcher config")]
    UnknownConfigKey { name: String },

    #[error("dispatcher is shut down; work was not accepted")]
    Terminated,

    #[error("request was cancelled before it reached a device")]
    Cancelled,

    #[error("request was dropped before reporting a result")]
    Abandoned,

    #[error("inference on {device} failed: {source}")]
    Backend {
        device: String,
        #[source]
        source: BackendError,
    },
}

impl DispatchError {
    /// Whether this error rejected a configuration change without applying it.
    pub fn is_config_rejection(&self) -> bool {
        matches!(
            self,
            Self::UnknownDevice { .. }
                | Self::SlotCountChange { .. }
                | Self::DuplicateDevice { .. }
                | Self::InvalidPriorities { .. }
                | Self::UnsupportedConfig { .. }
        )
    }
}
