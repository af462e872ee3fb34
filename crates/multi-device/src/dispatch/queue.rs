use std::collections::VecDeque;
use parking_lot::Mutex;
use crate::error::DispatchError;
use super::slot::BoundSlot;

/// One schedulable step of a caller's request.
///
/// Runs exactly once, synchronously, on whichever thread bound it to a slot.
/// It is expected to start backend execution and return promptly. Returning
/// `Err` tells the dispatcher the slot was not started and can be reused.
pub type UnitOfWork = Box<dyn FnOnce(&BoundSlot) -> Result<(), DispatchError> + Send + 'static>;

/// # WorkQueue
///
/// Pending units of work shared by every device.
///
/// Safe for any number of producers and consumers. Entries from a single
/// producer leave in the order they were pushed. Once closed, the queue
/// refuses new entries; closing and draining happen under one lock so no
/// push can land between them.
#[derive(Default)]
pub(crate) struct WorkQueue {
    state: Mutex<QueueState>,
}

#[derive(Default)]
struct QueueState {
    items: VecDeque<UnitOfWork>,
    closed: bool,
}

impl WorkQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append a unit of work.
    ///
    /// # Returns
    ///
    /// The unit of work back if the queue has been closed
    pub(crate) fn push(&self, work: UnitOfWork) -> Result<(), UnitOfWork> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(work);
        }
        state.items.push_back(work);
        Ok(())
    }

    pub(crate) fn try_pop(&self) -> Option<UnitOfWork> {
        self.state.lock().items.pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Refuse further pushes and remove every pending entry.
    ///
    /// The entries are returned rather than dropped so the caller can drop
    /// them after the lock is released.
    pub(crate) fn close(&self) -> Vec<UnitOfWork> {
        let mut state = self.state.lock();
        state.closed = true;
        state.items.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::backend::Backend;
    use crate::backend::mock_backend::MockBackend;
    use crate::dispatch::slot::WorkerSlot;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tagged(tag: usize, seen: Arc<Mutex<Vec<usize>>>) -> UnitOfWork {
        Box::new(move |_| {
            seen.lock().push(tag);
            Ok(())
        })
    }

    #[test]
    fn test_single_producer_order_is_kept() {
        let queue = WorkQueue::new();
        let seen = Arc::new(Mutex::new(vec![]));
        for tag in 0..5 {
            queue.push(tagged(tag, seen.clone())).ok().unwrap();
        }
        assert_eq!(queue.len(), 5);

        let backend = MockBackend::new("net", 1);
        let slot = BoundSlot::new(Arc::new(WorkerSlot::new("CPU", 0, backend.create_slot().unwrap())));
        while let Some(work) = queue.try_pop() {
            work(&slot).unwrap();
        }
        assert_eq!(*seen.lock(), vec![0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_close_drains_and_refuses_later_pushes() {
        let queue = WorkQueue::new();
        let seen = Arc::new(Mutex::new(vec![]));
        queue.push(tagged(1, seen.clone())).ok().unwrap();
        queue.push(tagged(2, seen.clone())).ok().unwrap();
        assert_eq!(queue.close().len(), 2);
        assert!(queue.try_pop().is_none());

        assert!(queue.push(tagged(3, seen)).is_err(), "a closed queue takes no work");
        assert!(queue.is_empty());
        assert!(queue.close().is_empty());
    }

    #[test]
    fn test_concurrent_producers_and_consumers() {
        let queue = Arc::new(WorkQueue::new());
        let popped = Arc::new(AtomicUsize::new(0));

        let producers: Vec<_> = (0..4)
            .map(|_| {
                let queue = queue.clone();
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        queue.push(Box::new(|_| Ok(()))).ok().unwrap();
                    }
                })
            })
            .collect();
        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let queue = queue.clone();
                let popped = popped.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        if queue.try_pop().is_some() {
                            popped.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();
        for handle in producers.into_iter().chain(consumers) {
            handle.join().unwrap();
        }

        let remaining = queue.close().len();
        assert_eq!(popped.load(Ordering::SeqCst) + remaining, 1000, "no entry lost or duplicated");
    }
}
