use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use parking_lot::Mutex;
use tracing::{error, info};
use crate::backend::Backend;
use crate::config::{format_device_priorities, DeviceInformation, MULTI_DEVICE_PRIORITIES};
use crate::error::{DispatchError, Result};
use super::pool::SlotPool;
use super::slot::WorkerSlot;

/// Everything the dispatcher knows about one device.
pub(crate) struct DeviceEntry {
    pub(crate) backend: Arc<dyn Backend>,

    /// Every slot of the device, idle or bound
    pub(crate) slots: Vec<Arc<WorkerSlot>>,

    /// The idle subset of `slots`
    pub(crate) pool: SlotPool,
}

/// State guarded by the registry lock.
struct RegistryState {
    priorities: Vec<DeviceInformation>,
    config: HashMap<String, String>,

    /// Set at shutdown; the priority order stays empty from then on
    closed: bool,
}

/// # BackendRegistry
///
/// The fixed set of devices, their pools, and the mutable priority order.
///
/// The device map never changes after [`BackendRegistry::configure`]. The
/// priority list and the config map sit behind a single lock and are only
/// ever replaced together.
pub(crate) struct BackendRegistry {
    devices: BTreeMap<String, DeviceEntry>,
    state: Mutex<RegistryState>,
}

impl BackendRegistry {
    /// Builds one pool per backend and fills it with freshly created slots.
    ///
    /// # Parameters
    ///
    /// * `backends` - Backends keyed by device name
    /// * `priorities` - Initial priority order with optional slot-count overrides
    ///
    /// # Returns
    ///
    /// The registry, or the first fatal configuration error. Nothing is
    /// half-built on failure.
    pub(crate) fn configure(
        backends: Vec<(String, Arc<dyn Backend>)>,
        priorities: Vec<DeviceInformation>,
    ) -> Result<Self> {
        if backends.is_empty() {
            return Err(DispatchError::InvalidPriorities {
                value: format_device_priorities(&priorities),
                reason: "no devices listed".to_string(),
            });
        }

        let mut by_name: BTreeMap<String, Arc<dyn Backend>> = BTreeMap::new();
        for (name, backend) in backends {
            if by_name.insert(name.clone(), backend).is_some() {
                return Err(DispatchError::DuplicateDevice { device: name });
            }
        }
        check_unique(&priorities)?;
        check_known(&priorities, |name| by_name.contains_key(name))?;

        let mut devices = BTreeMap::new();
        for (name, backend) in by_name {
            let optimal = backend.optimal_concurrency().map_err(|source| {
                error!(device = %name, error = %source, "device cannot report its optimal number of infer requests");
                DispatchError::BackendMetric {
                    device: name.clone(),
                    source,
                }
            })?;
            let requested = priorities
                .iter()
                .find(|d| d.name == name)
                .and_then(|d| d.num_requests);
            let num_requests = requested.unwrap_or(optimal);

            let pool = SlotPool::new(name.clone());
            let mut slots = Vec::with_capacity(num_requests);
            for index in 0..num_requests {
                let native = backend.create_slot().map_err(|source| {
                    error!(device = %name, error = %source, "device failed to create an execution slot");
                    DispatchError::SlotCreation {
                        device: name.clone(),
                        source,
                    }
                })?;
                let slot = Arc::new(WorkerSlot::new(name.clone(), index, native));
                pool.push(slot.clone());
                slots.push(slot);
            }

            info!(
                device = %name,
                slots = num_requests,
                overridden = requested.is_some(),
                "configured device"
            );
            devices.insert(name, DeviceEntry { backend, slots, pool });
        }

        let mut config = HashMap::new();
        config.insert(MULTI_DEVICE_PRIORITIES.to_string(), format_device_priorities(&priorities));

        Ok(Self {
            devices,
            state: Mutex::new(RegistryState {
                priorities,
                config,
                closed: false,
            }),
        })
    }

    /// Replace the priority order and store `value` as its config string.
    ///
    /// Rejects, without changing anything, an entry that names an unknown
    /// device, carries a slot count, or repeats a device. Once the registry
    /// is closed every call fails with [`DispatchError::Terminated`].
    pub(crate) fn set_priorities(&self, priorities: Vec<DeviceInformation>, value: String) -> Result<()> {
        if let Some(device) = priorities.iter().find(|d| d.num_requests.is_some()) {
            return Err(DispatchError::SlotCountChange {
                device: device.name.clone(),
            });
        }
        check_unique(&priorities)?;

        let mut state = self.state.lock();
        if state.closed {
            return Err(DispatchError::Terminated);
        }
        check_known(&priorities, |name| self.devices.contains_key(name))?;
        state.config.insert(MULTI_DEVICE_PRIORITIES.to_string(), value);
        state.priorities = priorities;
        Ok(())
    }

    /// Point-in-time copy of the priority order.
    pub(crate) fn current_priorities(&self) -> Vec<DeviceInformation> {
        self.state.lock().priorities.clone()
    }

    /// Empty the priority order for good so no device is offered new work.
    pub(crate) fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.priorities.clear();
    }

    pub(crate) fn config_value(&self, name: &str) -> Option<String> {
        self.state.lock().config.get(name).cloned()
    }

    pub(crate) fn device(&self, name: &str) -> Option<&DeviceEntry> {
        self.devices.get(name)
    }

    pub(crate) fn pool(&self, name: &str) -> Option<&SlotPool> {
        self.devices.get(name).map(|entry| &entry.pool)
    }

    pub(crate) fn devices(&self) -> impl Iterator<Item = (&str, &DeviceEntry)> {
        self.devices.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Sum of the configured slot counts
    pub(crate) fn total_slots(&self) -> usize {
        self.devices.values().map(|entry| entry.slots.len()).sum()
    }

    /// Network name reported by the first device
    pub(crate) fn network_name(&self) -> Option<String> {
        self.devices.values().next().map(|entry| entry.backend.network_name())
    }
}

fn check_unique(priorities: &[DeviceInformation]) -> Result<()> {
    let mut seen = HashSet::new();
    for device in priorities {
        if !seen.insert(device.name.as_str()) {
            return Err(DispatchError::DuplicateDevice {
                device: device.name.clone(),
            });
        }
    }
    Ok(())
}

fn check_known(priorities: &[DeviceInformation], known: impl Fn(&str) -> bool) -> Result<()> {
    match priorities.iter().find(|d| !known(&d.name)) {
        Some(device) => Err(DispatchError::UnknownDevice {
            device: device.name.clone(),
        }),
        None => Ok(()),
    }
}
