use uuid::Uuid;
use crate::backend::CompletionStatus;
use crate::dispatch::BoundSlot;
use crate::error::BackendError;

/// Defines one inference as seen by a device slot.
///
/// # Implementation Notes
///
/// Implementations should:
/// * Keep [`InferenceJob::prepare`] short; it runs on the thread that bound
///   the slot, which may be another caller's thread
/// * Expect [`InferenceJob::complete`] on a backend-owned thread
/// * Use [`BoundSlot::downcast_ref`] to reach the concrete slot type
///
/// # Example
///
/// ```ignore
/// struct Classify { image: Vec<f32> }
///
/// impl InferenceJob for Classify {
///     type Output = Vec<f32>;
///
///     fn prepare(&mut self, slot: &BoundSlot) -> Result<(), BackendError> {
///         let native = slot.downcast_ref::<CpuSlot>().ok_or_else(|| BackendError::new("wrong device"))?;
///         native.set_input("data", &self.image);
///         Ok(())
///     }
///
///     fn complete(self, slot: &BoundSlot, _status: CompletionStatus) -> Result<Self::Output, BackendError> {
///         let native = slot.downcast_ref::<CpuSlot>().ok_or_else(|| BackendError::new("wrong device"))?;
///         Ok(native.output("prob"))
///     }
/// }
/// ```
pub trait InferenceJob: Send + 'static {
    /// What the caller receives
    type Output: Send + 'static;

    /// Load this job's inputs into the bound slot. Execution starts right after.
    fn prepare(&mut self, slot: &BoundSlot) -> Result<(), BackendError>;

    /// Read the results out of the slot after a successful execution.
    fn complete(self, slot: &BoundSlot, status: CompletionStatus) -> Result<Self::Output, BackendError>;
}

/// The outcome of a successful inference.
#[derive(Debug, Clone, PartialEq)]
pub struct Completed<T> {
    /// Identifier of the request that produced this result
    pub request_id: Uuid,

    /// Device that executed the request
    pub device: String,

    /// Status reported by the device
    pub status: CompletionStatus,

    /// The job's output
    pub value: T,
}
