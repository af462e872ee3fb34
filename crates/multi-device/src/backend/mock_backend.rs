use std::any::Any;
use std::sync::{Arc, OnceLock};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use parking_lot::Mutex;
use crate::backend::{Backend, CompletionCallback, CompletionStatus, ExecutionSlot};
use crate::error::BackendError;

/// How a mock slot reports completion
#[derive(Clone, Copy, Debug)]
pub enum CompletionMode {
    /// The test calls [`MockSlot::complete`]
    Manual,
    /// A spawned thread completes the slot after the delay
    Threaded(Duration),
}

// A simple mock device for testing
pub struct MockBackend {
    network: String,
    optimal: Result<usize, BackendError>,
    mode: CompletionMode,
    fail_slot_creation: bool,
    fail_start: Arc<AtomicBool>,
    slots: Mutex<Vec<MockSlot>>,
}

impl MockBackend {
    pub fn new(network: &str, optimal: usize) -> Self {
        Self {
            network: network.to_string(),
            optimal: Ok(optimal),
            mode: CompletionMode::Manual,
            fail_slot_creation: false,
            fail_start: Arc::new(AtomicBool::new(false)),
            slots: Mutex::new(vec![]),
        }
    }

    /// A backend that cannot report its optimal concurrency
    pub fn without_metric(network: &str) -> Self {
        Self {
            optimal: Err(BackendError::new("OPTIMAL_NUMBER_OF_INFER_REQUESTS not supported")),
            ..Self::new(network, 0)
        }
    }

    pub fn threaded(mut self, delay: Duration) -> Self {
        self.mode = CompletionMode::Threaded(delay);
        self
    }

    pub fn failing_slot_creation(mut self) -> Self {
        self.fail_slot_creation = true;
        self
    }

    /// Make every slot of this backend refuse to start, or start again
    pub fn set_fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    pub fn slots(&self) -> Vec<MockSlot> {
        self.slots.lock().clone()
    }

    pub fn running_slots(&self) -> Vec<MockSlot> {
        self.slots().into_iter().filter(MockSlot::is_running).collect()
    }

    pub fn total_starts(&self) -> usize {
        self.slots().iter().map(MockSlot::starts).sum()
    }

    pub fn total_overlaps(&self) -> usize {
        self.slots().iter().map(MockSlot::overlaps).sum()
    }
}

impl Backend for MockBackend {
    fn optimal_concurrency(&self) -> Result<usize, BackendError> {
        self.optimal.clone()
    }

    fn create_slot(&self) -> Result<Box<dyn ExecutionSlot>, BackendError> {
        if self.fail_slot_creation {
            return Err(BackendError::new("out of device memory"));
        }
        let slot = MockSlot {
            inner: Arc::new(MockSlotInner {
                callback: OnceLock::new(),
                running: AtomicBool::new(false),
                starts: AtomicUsize::new(0),
                overlaps: AtomicUsize::new(0),
                mode: self.mode,
                fail_start: self.fail_start.clone(),
                input: Mutex::new(0),
                output: Mutex::new(None),
            }),
        };
        self.slots.lock().push(slot.clone());
        Ok(Box::new(slot))
    }

    fn network_name(&self) -> String {
        self.network.clone()
    }
}

struct MockSlotInner {
    callback: OnceLock<CompletionCallback>,
    running: AtomicBool,
    starts: AtomicUsize,
    overlaps: AtomicUsize,
    mode: CompletionMode,
    fail_start: Arc<AtomicBool>,
    input: Mutex<i64>,
    output: Mutex<Option<i64>>,
}

/// A slot that doubles its input
#[derive(Clone)]
pub struct MockSlot {
    inner: Arc<MockSlotInner>,
}

impl MockSlot {
    pub fn set_input(&self, value: i64) {
        *self.inner.input.lock() = value;
    }

    pub fn output(&self) -> Option<i64> {
        *self.inner.output.lock()
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    pub fn starts(&self) -> usize {
        self.inner.starts.load(Ordering::SeqCst)
    }

    /// Number of times this slot was started while still running
    pub fn overlaps(&self) -> usize {
        self.inner.overlaps.load(Ordering::SeqCst)
    }

    /// Finish the running execution and fire the completion callback
    pub fn complete(&self, status: CompletionStatus) {
        complete(&self.inner, status);
    }
}

fn complete(inner: &MockSlotInner, status: CompletionStatus) {
    let input = *inner.input.lock();
    *inner.output.lock() = Some(input * 2);
    inner.running.store(false, Ordering::SeqCst);
    if let Some(callback) = inner.callback.get() {
        callback(status);
    }
}

impl ExecutionSlot for MockSlot {
    fn set_completion_callback(&self, callback: CompletionCallback) {
        let _ = self.inner.callback.set(callback);
    }

    fn start_async(&self) -> Result<(), BackendError> {
        if self.inner.fail_start.load(Ordering::SeqCst) {
            return Err(BackendError::new("device lost"));
        }
        if self.inner.running.swap(true, Ordering::SeqCst) {
            self.inner.overlaps.fetch_add(1, Ordering::SeqCst);
            return Err(BackendError::from_status(CompletionStatus::RequestBusy));
        }
        self.inner.starts.fetch_add(1, Ordering::SeqCst);
        *self.inner.output.lock() = None;

        if let CompletionMode::Threaded(delay) = self.inner.mode {
            let inner = self.inner.clone();
            std::thread::spawn(move || {
                std::thread::sleep(delay);
                complete(&inner, CompletionStatus::Ok);
            });
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
