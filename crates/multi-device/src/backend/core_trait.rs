use std::any::Any;
use std::fmt;
use crate::error::BackendError;

/// Outcome reported by a backend when an execution slot finishes its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompletionStatus {
    /// Execution finished successfully
    #[default]
    Ok,
    /// Execution failed for a backend-specific reason
    GeneralError,
    /// The slot was started before it was ready
    InferNotStarted,
    /// The slot was already running
    RequestBusy,
    /// Execution was cancelled by the backend
    Cancelled,
    /// Something the backend did not anticipate
    Unexpected,
}

impl CompletionStatus {
    /// Returns `true` for [`CompletionStatus::Ok`]
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Ok => "OK",
            Self::GeneralError => "GENERAL_ERROR",
            Self::InferNotStarted => "INFER_NOT_STARTED",
            Self::RequestBusy => "REQUEST_BUSY",
            Self::Cancelled => "INFER_CANCELLED",
            Self::Unexpected => "UNEXPECTED",
        };
        f.write_str(text)
    }
}

/// Notification a slot invokes, on a backend-owned thread, every time it
/// finishes executing.
pub type CompletionCallback = Box<dyn Fn(CompletionStatus) + Send + Sync + 'static>;

/// A reusable execution context owned by a backend.
///
/// A slot runs at most one unit of work at a time. Starting execution must not
/// block: the backend runs the work elsewhere and reports back through the
/// completion callback.
///
/// The callback may release the dispatcher's last handle to the slot while it
/// runs, so whatever state the backend needs after invoking it must be kept
/// alive by the backend itself (typically an `Arc` cloned into the worker).
pub trait ExecutionSlot: Send + Sync + 'static {
    /// Register the notification to run whenever this slot completes.
    ///
    /// Called exactly once, when the dispatcher adopts the slot.
    fn set_completion_callback(&self, callback: CompletionCallback);

    /// Begin asynchronous execution of whatever the bound job has prepared.
    fn start_async(&self) -> Result<(), BackendError>;

    /// Access to the concrete slot type, for jobs that need to move data in and out.
    fn as_any(&self) -> &dyn Any;
}

/// A network loaded onto one device.
pub trait Backend: Send + Sync + 'static {
    /// The number of slots the device runs best with.
    ///
    /// Queried once at construction; failing here is fatal for the dispatcher.
    fn optimal_concurrency(&self) -> Result<usize, BackendError>;

    /// Create a fresh execution slot for this device.
    fn create_slot(&self) -> Result<Box<dyn ExecutionSlot>, BackendError>;

    /// Name of the loaded network. All devices are expected to agree.
    fn network_name(&self) -> String;
}
