use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use futures::ready;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use uuid::Uuid;
use crate::error::{DispatchError, Result};
use super::job::Completed;

/// Shared, clonable switch that cancels a request before it reaches a device.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    ///
    /// Has no effect once the request is executing on a device.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// The sending half of a request's outcome, usable from whichever path
/// finishes first.
pub(crate) struct Reply<T> {
    sender: Mutex<Option<oneshot::Sender<Result<Completed<T>>>>>,
}

impl<T> Reply<T> {
    pub(crate) fn new(sender: oneshot::Sender<Result<Completed<T>>>) -> Self {
        Self {
            sender: Mutex::new(Some(sender)),
        }
    }

    /// Deliver the outcome. Only the first call has any effect.
    pub(crate) fn send(&self, outcome: Result<Completed<T>>) {
        let sender = self.sender.lock().take();
        if let Some(sender) = sender {
            // the caller may have stopped waiting
            let _ = sender.send(outcome);
        }
    }
}

/// # PendingInference
///
/// A submitted request whose outcome is not known yet.
///
/// Await it from async code, or call [`PendingInference::wait`] from a plain
/// thread. The outcome can be taken once.
pub struct PendingInference<T> {
    /// Identifier of the submitted request
    id: Uuid,

    /// The underlying channel receiver
    receiver: oneshot::Receiver<Result<Completed<T>>>,

    cancel: CancelHandle,
}

impl<T> PendingInference<T> {
    pub(crate) fn new(id: Uuid, receiver: oneshot::Receiver<Result<Completed<T>>>, cancel: CancelHandle) -> Self {
        Self {
            id,
            receiver,
            cancel,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Cancel the request if it has not reached a device yet
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A handle that can cancel this request from elsewhere
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Non-blocking check for the outcome.
    ///
    /// # Returns
    ///
    /// `None` while the request is still queued or executing
    pub fn try_result(&mut self) -> Option<Result<Completed<T>>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(DispatchError::Abandoned)),
        }
    }

    /// Block the current thread until the outcome arrives.
    ///
    /// # Panics
    ///
    /// When called from within an async runtime; await the request there instead.
    pub fn wait(self) -> Result<Completed<T>> {
        self.receiver
            .blocking_recv()
            .unwrap_or(Err(DispatchError::Abandoned))
    }
}

impl<T> Future for PendingInference<T> {
    type Output = Result<Completed<T>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let outcome = ready!(Pin::new(&mut self.get_mut().receiver).poll(cx));
        Poll::Ready(outcome.unwrap_or(Err(DispatchError::Abandoned)))
    }
}
