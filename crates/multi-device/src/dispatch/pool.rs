use std::sync::Arc;
use parking_lot::Mutex;
use super::slot::WorkerSlot;

/// # SlotPool
///
/// The idle execution slots of one device.
///
/// Both operations are non-blocking and safe to call from any thread. No
/// ordering is promised between idle slots. A slot returns to the pool only
/// through [`SlotPool::push`], which also clears its bound marker.
#[derive(Debug)]
pub(crate) struct SlotPool {
    device: String,
    idle: Mutex<Vec<Arc<WorkerSlot>>>,
}

impl SlotPool {
    pub(crate) fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            idle: Mutex::new(Vec::new()),
        }
    }

    /// Take an idle slot, if any.
    pub(crate) fn try_pop(&self) -> Option<Arc<WorkerSlot>> {
        self.idle.lock().pop()
    }

    /// Return a slot to idle.
    pub(crate) fn push(&self, slot: Arc<WorkerSlot>) {
        debug_assert_eq!(slot.device(), self.device, "slot pushed into another device's pool");
        slot.mark_idle();
        self.idle.lock().push(slot);
    }

    /// Number of idle slots right now
    pub(crate) fn len(&self) -> usize {
        self.idle.lock().len()
    }
}
