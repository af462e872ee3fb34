use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use parking_lot::Mutex;
use crate::backend::{CompletionStatus, ExecutionSlot};
use crate::error::BackendError;

/// Follow-up work a bound job leaves on its slot, run on the backend thread
/// when the slot completes.
pub type Continuation = Box<dyn FnOnce(&BoundSlot, CompletionStatus) + Send + 'static>;

/// # WorkerSlot
///
/// The dispatcher's record of one backend execution slot.
///
/// Every `WorkerSlot` is owned by the registry for the dispatcher's whole
/// lifetime. While idle, a clone of it also sits in its device's
/// [`super::pool::SlotPool`]; while bound, the pool does not hold it.
pub(crate) struct WorkerSlot {
    /// Device this slot belongs to
    device: String,

    /// Position of the slot within its device
    index: usize,

    /// The backend's native execution context
    slot: Box<dyn ExecutionSlot>,

    /// Status reported by the most recent completion
    status: Mutex<CompletionStatus>,

    /// Follow-up action registered by the currently bound job
    continuation: Mutex<Option<Continuation>>,

    /// Set while a unit of work owns the slot
    bound: AtomicBool,

    /// Keeps the record alive while the backend executes, even if the
    /// dispatcher is dropped in the meantime
    in_flight: Mutex<Option<Arc<WorkerSlot>>>,
}

impl WorkerSlot {
    pub(crate) fn new(device: impl Into<String>, index: usize, slot: Box<dyn ExecutionSlot>) -> Self {
        Self {
            device: device.into(),
            index,
            slot,
            status: Mutex::new(CompletionStatus::Ok),
            continuation: Mutex::new(None),
            bound: AtomicBool::new(false),
            in_flight: Mutex::new(None),
        }
    }

    pub(crate) fn device(&self) -> &str {
        &self.device
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn slot(&self) -> &dyn ExecutionSlot {
        self.slot.as_ref()
    }

    pub(crate) fn status(&self) -> CompletionStatus {
        *self.status.lock()
    }

    pub(crate) fn set_status(&self, status: CompletionStatus) {
        *self.status.lock() = status;
    }

    pub(crate) fn set_continuation(&self, continuation: Continuation) {
        *self.continuation.lock() = Some(continuation);
    }

    /// Removes the continuation so it can run without the lock held.
    pub(crate) fn take_continuation(&self) -> Option<Continuation> {
        self.continuation.lock().take()
    }

    pub(crate) fn clear_continuation(&self) {
        // dropped outside the lock
        let stale = self.take_continuation();
        drop(stale);
    }

    /// Marks the slot as bound, returning whether it already was.
    pub(crate) fn mark_bound(self: &Arc<Self>) -> bool {
        *self.in_flight.lock() = Some(self.clone());
        self.bound.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn mark_idle(&self) {
        self.bound.store(false, Ordering::Release);
        let pin = self.take_in_flight();
        drop(pin);
    }

    /// Drop the in-flight self reference, handing it to the caller.
    pub(crate) fn take_in_flight(&self) -> Option<Arc<WorkerSlot>> {
        self.in_flight.lock().take()
    }

    pub(crate) fn is_bound(&self) -> bool {
        self.bound.load(Ordering::Acquire)
    }
}

impl fmt::Debug for WorkerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerSlot")
            .field("device", &self.device)
            .field("index", &self.index)
            .field("status", &self.status())
            .field("bound", &self.is_bound())
            .finish()
    }
}

/// # BoundSlot
///
/// The view of an execution slot handed to a unit of work once the dispatcher
/// has bound the two together.
///
/// A job uses it to prepare and start backend execution, and to leave a
/// [`Continuation`] that processes the results when the backend reports back.
pub struct BoundSlot {
    inner: Arc<WorkerSlot>,
}

impl BoundSlot {
    pub(crate) fn new(inner: Arc<WorkerSlot>) -> Self {
        Self { inner }
    }

    /// Name of the device executing this unit of work
    pub fn device(&self) -> &str {
        self.inner.device()
    }

    /// Index of the slot within its device
    pub fn index(&self) -> usize {
        self.inner.index()
    }

    /// Status stored by the most recent completion of this slot
    pub fn status(&self) -> CompletionStatus {
        self.inner.status()
    }

    /// The backend's execution slot
    pub fn slot(&self) -> &dyn ExecutionSlot {
        self.inner.slot()
    }

    /// The backend's execution slot as its concrete type.
    ///
    /// # Returns
    ///
    /// `None` if the slot belongs to a backend of a different type
    pub fn downcast_ref<S: ExecutionSlot>(&self) -> Option<&S> {
        self.inner.slot().as_any().downcast_ref::<S>()
    }

    /// Register the action to run when this slot completes.
    ///
    /// Must be set before execution is started; a backend may complete
    /// before `start_async` even returns. Replaces any earlier continuation.
    pub fn set_continuation<F>(&self, continuation: F)
    where F: FnOnce(&BoundSlot, CompletionStatus) + Send + 'static
    {
        self.inner.set_continuation(Box::new(continuation));
    }

    /// Start backend execution on this slot.
    pub fn start_async(&self) -> Result<(), BackendError> {
        self.inner.slot().start_async()
    }
}

impl fmt::Debug for BoundSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BoundSlot").field(&self.inner).finish()
    }
}
