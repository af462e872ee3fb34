use std::sync::Arc;
use super::pool::SlotPool;
use super::slot::WorkerSlot;

/// # IdleGuard
///
/// Returns a slot to its pool when dropped, unless the slot was claimed.
///
/// Every path that takes a slot out of a pool holds one of these, so an early
/// return, an `Err` from a unit of work, or a panic unwinding through the
/// dispatcher all put the slot back. Any continuation left on the slot is
/// discarded on the way back.
pub(crate) struct IdleGuard<'a> {
    slot: Option<Arc<WorkerSlot>>,
    pool: &'a SlotPool,
}

impl<'a> IdleGuard<'a> {
    pub(crate) fn new(slot: Arc<WorkerSlot>, pool: &'a SlotPool) -> Self {
        Self {
            slot: Some(slot),
            pool,
        }
    }

    /// The guarded slot
    pub(crate) fn slot(&self) -> &Arc<WorkerSlot> {
        // only `claim` empties the option, and it consumes the guard
        self.slot.as_ref().unwrap_or_else(|| unreachable!("guard already claimed"))
    }

    /// Take the slot out of the guard; it will not be returned on drop.
    pub(crate) fn claim(mut self) -> Arc<WorkerSlot> {
        self.slot.take().unwrap_or_else(|| unreachable!("guard already claimed"))
    }
}

impl Drop for IdleGuard<'_> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.clear_continuation();
            self.pool.push(slot);
        }
    }
}
