use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};
use crate::backend::{Backend, CompletionStatus};
use crate::config::{
    format_device_priorities, parse_device_priorities, DeviceInformation, MULTI_DEVICE_PRIORITIES,
};
use crate::error::{DispatchError, Result};
use crate::metrics::{
    supported_config_keys, supported_metrics, MetricValue, NETWORK_NAME,
    OPTIMAL_NUMBER_OF_INFER_REQUESTS, SUPPORTED_CONFIG_KEYS, SUPPORTED_METRICS,
};
use super::guard::IdleGuard;
use super::queue::{UnitOfWork, WorkQueue};
use super::registry::BackendRegistry;
use super::slot::{BoundSlot, WorkerSlot};

/// Outcome of offering one device the next unit of work
enum BindAttempt {
    /// A unit of work is now executing on the device
    Bound,
    /// The device had no idle slot
    NoIdleSlot,
    /// An idle slot was found but the queue was empty
    NoWork,
    /// The unit of work failed before starting; its slot is idle again
    Failed,
}

/// Shared state behind a [`MultiDeviceDispatcher`].
///
/// Completion callbacks reach it through a `Weak`, so a slot finishing after
/// the dispatcher is gone never touches freed state.
pub(crate) struct DispatcherInner {
    registry: BackendRegistry,
    queue: WorkQueue,
    terminated: AtomicBool,
}

impl DispatcherInner {
    fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// One scheduling attempt.
    ///
    /// Walks the devices in priority order and binds at most one unit of work
    /// to the first device that has an idle slot. Never blocks.
    fn schedule(&self) {
        loop {
            if self.is_terminated() {
                return;
            }

            let mut returned_idle = false;
            let mut failed = false;
            for device in self.registry.current_priorities() {
                match self.try_bind(&device.name) {
                    BindAttempt::Bound => return,
                    BindAttempt::NoIdleSlot => {}
                    BindAttempt::NoWork => returned_idle = true,
                    BindAttempt::Failed => {
                        failed = true;
                        break;
                    }
                }
            }

            // a released slot is a fresh trigger
            if failed {
                continue;
            }
            // work may have landed while we held the slot that found the queue empty
            if returned_idle && !self.queue.is_empty() {
                continue;
            }
            debug!(pending = self.queue.len(), "scheduling attempt found nothing to bind");
            return;
        }
    }

    /// Try the `Idle -> Bound -> Executing` transition on one device.
    fn try_bind(&self, device: &str) -> BindAttempt {
        let Some(pool) = self.registry.pool(device) else {
            return BindAttempt::NoIdleSlot;
        };
        let Some(slot) = pool.try_pop() else {
            return BindAttempt::NoIdleSlot;
        };
        let guard = IdleGuard::new(slot, pool);

        let Some(work) = self.queue.try_pop() else {
            return BindAttempt::NoWork;
        };

        let slot = guard.slot().clone();
        let was_bound = slot.mark_bound();
        if was_bound {
            error!(device, slot = slot.index(), "execution slot was bound twice");
        }
        debug_assert!(!was_bound, "execution slot {} of {device} was bound twice", slot.index());
        debug!(device, slot = slot.index(), "bound unit of work");

        match work(&BoundSlot::new(slot)) {
            Ok(()) => {
                guard.claim();
                BindAttempt::Bound
            }
            Err(err) => {
                warn!(device, error = %err, "unit of work failed before execution started");
                drop(guard);
                BindAttempt::Failed
            }
        }
    }

    /// Completion notification for `slot`, run on a backend-owned thread.
    ///
    /// Stores the status, runs the continuation left by the bound job, then
    /// either returns the slot to its pool and schedules again, or, once the
    /// dispatcher is terminating, leaves the slot out of the pool.
    fn on_completion(dispatcher: &Weak<Self>, slot: Arc<WorkerSlot>, status: CompletionStatus) {
        let _in_flight = slot.take_in_flight();
        slot.set_status(status);
        debug!(device = slot.device(), slot = slot.index(), %status, "execution slot completed");

        let Some(inner) = dispatcher.upgrade() else {
            // the dispatcher is gone, only the caller is left to notify
            if let Some(continuation) = slot.take_continuation() {
                continuation(&BoundSlot::new(slot.clone()), status);
            }
            return;
        };
        let Some(pool) = inner.registry.pool(slot.device()) else {
            return;
        };

        let guard = IdleGuard::new(slot.clone(), pool);
        if let Some(continuation) = slot.take_continuation() {
            continuation(&BoundSlot::new(slot), status);
        }

        let slot = guard.claim();
        if inner.is_terminated() {
            debug!(device = slot.device(), slot = slot.index(), "dispatcher terminating, slot not returned");
            return;
        }
        pool.push(slot);
        inner.schedule();
    }

    fn submit(&self, work: UnitOfWork) -> Result<()> {
        if self.is_terminated() {
            warn!("work submitted after shutdown was dropped");
            return Err(DispatchError::Terminated);
        }
        if self.queue.push(work).is_err() {
            warn!("work submitted during shutdown was dropped");
            return Err(DispatchError::Terminated);
        }
        self.schedule();
        Ok(())
    }
}

/// # MultiDeviceDispatcher
///
/// Spreads units of work across the execution slots of several devices.
///
/// Whenever work arrives or a slot finishes, the dispatcher walks the devices
/// from highest to lowest priority and hands one pending unit of work to the
/// first idle slot it finds. There is no dispatcher thread: scheduling runs
/// inline on whichever caller or backend thread triggered it.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use multi_device::{MultiDeviceDispatcher, config::parse_device_priorities};
///
/// let dispatcher = MultiDeviceDispatcher::new(
///     vec![("GPU".into(), gpu_backend), ("CPU".into(), cpu_backend)],
///     parse_device_priorities("GPU(4),CPU")?,
/// )?;
///
/// dispatcher.submit(Box::new(|slot| {
///     slot.set_continuation(|slot, status| println!("{} done: {status}", slot.device()));
///     slot.start_async().map_err(|source| DispatchError::Backend {
///         device: slot.device().to_string(),
///         source,
///     })
/// }))?;
/// ```
///
/// ## Shutdown
///
/// Dropping the dispatcher (or calling [`MultiDeviceDispatcher::shutdown`])
/// stops all new binding. Work still queued is dropped; work already running
/// finishes and runs its continuation, but its slot is not reused.
pub struct MultiDeviceDispatcher {
    inner: Arc<DispatcherInner>,
}

impl MultiDeviceDispatcher {
    /// Creates a dispatcher over the given devices.
    ///
    /// # Parameters
    ///
    /// * `backends` - The loaded network on each device, keyed by device name
    /// * `priorities` - Devices from highest to lowest priority, each with an
    ///   optional slot-count override. Devices left out get a pool sized by
    ///   their optimum but receive no work until prioritized.
    ///
    /// # Returns
    ///
    /// The dispatcher, or a fatal configuration error if any device cannot
    /// report its optimal concurrency or create its slots.
    pub fn new(
        backends: Vec<(String, Arc<dyn Backend>)>,
        priorities: Vec<DeviceInformation>,
    ) -> Result<Self> {
        let registry = BackendRegistry::configure(backends, priorities)?;

        let inner = Arc::new_cyclic(|dispatcher: &Weak<DispatcherInner>| {
            for (_, entry) in registry.devices() {
                for slot in &entry.slots {
                    let dispatcher = dispatcher.clone();
                    let weak_slot = Arc::downgrade(slot);
                    slot.slot().set_completion_callback(Box::new(move |status| {
                        if let Some(slot) = weak_slot.upgrade() {
                            DispatcherInner::on_completion(&dispatcher, slot, status);
                        }
                    }));
                }
            }
            DispatcherInner {
                registry,
                queue: WorkQueue::new(),
                terminated: AtomicBool::new(false),
            }
        });

        info!(
            devices = inner.registry.devices().count(),
            slots = inner.registry.total_slots(),
            "multi-device dispatcher ready"
        );
        Ok(Self { inner })
    }

    /// Enqueue a unit of work and trigger a scheduling attempt.
    ///
    /// The unit of work runs later, on whichever thread binds it to a slot, or
    /// right away on this thread if a slot is idle now.
    ///
    /// # Returns
    ///
    /// [`DispatchError::Terminated`] once the dispatcher is shutting down;
    /// the unit of work is dropped without running.
    pub fn submit(&self, work: UnitOfWork) -> Result<()> {
        self.inner.submit(work)
    }

    /// Replace the device priority order.
    ///
    /// Fails without any change if an entry names a device the dispatcher was
    /// not built with, asks for a slot count, or repeats a device. Work
    /// already running is unaffected; the next scheduling attempt uses the new order.
    /// After shutdown it fails with [`DispatchError::Terminated`].
    pub fn set_priorities(&self, priorities: Vec<DeviceInformation>) -> Result<()> {
        let value = format_device_priorities(&priorities);
        self.apply_priorities(priorities, value)
    }

    fn apply_priorities(&self, priorities: Vec<DeviceInformation>, value: String) -> Result<()> {
        self.inner.registry.set_priorities(priorities, value)?;
        info!(priorities = ?self.priorities(), "device priorities updated");
        // newly listed devices may have idle slots for queued work
        self.inner.schedule();
        Ok(())
    }

    /// Apply a key-value configuration.
    ///
    /// The only supported key is [`MULTI_DEVICE_PRIORITIES`], and it must be
    /// the only key in the map. The value is stored as given and read back
    /// unchanged by [`MultiDeviceDispatcher::config`].
    pub fn set_config(&self, config: &HashMap<String, String>) -> Result<()> {
        let priorities = match config.get(MULTI_DEVICE_PRIORITIES) {
            Some(value) if config.len() == 1 => value,
            _ => {
                return Err(DispatchError::UnsupportedConfig {
                    reason: format!(
                        "the only config supported by the dispatcher is {MULTI_DEVICE_PRIORITIES}"
                    ),
                });
            }
        };
        self.apply_priorities(parse_device_priorities(priorities)?, priorities.clone())
    }

    /// Read a config value.
    pub fn config(&self, name: &str) -> Result<String> {
        self.inner
            .registry
            .config_value(name)
            .ok_or_else(|| DispatchError::UnknownConfigKey {
                name: name.to_string(),
            })
    }

    /// Read a metric. See [`crate::metrics`] for the supported keys.
    pub fn metric(&self, name: &str) -> Result<MetricValue> {
        match name {
            OPTIMAL_NUMBER_OF_INFER_REQUESTS => Ok(MetricValue::Unsigned(self.total_slots())),
            NETWORK_NAME => self
                .inner
                .registry
                .network_name()
                .map(MetricValue::Text)
                .ok_or_else(|| DispatchError::UnknownMetric {
                    name: name.to_string(),
                }),
            SUPPORTED_METRICS => Ok(MetricValue::Keys(supported_metrics())),
            SUPPORTED_CONFIG_KEYS => Ok(MetricValue::Keys(supported_config_keys())),
            _ => Err(DispatchError::UnknownMetric {
                name: name.to_string(),
            }),
        }
    }

    /// Snapshot of the current priority order
    pub fn priorities(&self) -> Vec<DeviceInformation> {
        self.inner.registry.current_priorities()
    }

    /// Total slots across all devices
    pub fn total_slots(&self) -> usize {
        self.inner.registry.total_slots()
    }

    /// Configured slot count of a device
    pub fn slot_count(&self, device: &str) -> Option<usize> {
        self.inner.registry.device(device).map(|entry| entry.slots.len())
    }

    /// Number of idle slots a device has right now
    pub fn idle_slots(&self, device: &str) -> Option<usize> {
        self.inner.registry.pool(device).map(|pool| pool.len())
    }

    /// Units of work waiting for a slot
    pub fn pending(&self) -> usize {
        self.inner.queue.len()
    }

    pub fn is_terminated(&self) -> bool {
        self.inner.is_terminated()
    }

    /// Stop scheduling.
    ///
    /// Sets the termination flag, clears the priority order and drops every
    /// queued unit of work. Calling it more than once is harmless.
    pub fn shutdown(&self) {
        if self.inner.terminated.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.registry.close();
        let dropped = self.inner.queue.close();
        info!(dropped = dropped.len(), "multi-device dispatcher shutting down");
        drop(dropped);
    }
}

impl Drop for MultiDeviceDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
