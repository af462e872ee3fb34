use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::debug;
use uuid::Uuid;
use crate::backend::CompletionStatus;
use crate::dispatch::{BoundSlot, MultiDeviceDispatcher, UnitOfWork};
use crate::error::{BackendError, DispatchError, Result};
use super::job::{Completed, InferenceJob};
use super::pending::{CancelHandle, PendingInference, Reply};

/// # AsyncInferRequest
///
/// One caller request on its way to a device.
///
/// Starting the request wraps the job into a unit of work and submits it.
/// Once a slot is bound, the unit of work prepares the job, leaves a
/// continuation on the slot, and starts execution; the continuation collects
/// the results on the backend thread and resolves the [`PendingInference`].
pub struct AsyncInferRequest<'d, J> {
    id: Uuid,
    dispatcher: &'d MultiDeviceDispatcher,
    job: J,
    cancel: CancelHandle,
}

impl<'d, J> AsyncInferRequest<'d, J>
where J: InferenceJob
{
    pub fn new(dispatcher: &'d MultiDeviceDispatcher, job: J) -> Self {
        Self {
            id: Uuid::new_v4(),
            dispatcher,
            job,
            cancel: CancelHandle::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// A handle that cancels this request while it is still queued
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Submit the request.
    ///
    /// # Returns
    ///
    /// A [`PendingInference`] for the outcome, or
    /// [`DispatchError::Terminated`] if the dispatcher no longer accepts work
    pub fn start_async(self) -> Result<PendingInference<J::Output>> {
        let (tx, rx) = oneshot::channel();
        let reply = Arc::new(Reply::new(tx));
        let work = bind_job(self.id, self.job, self.cancel.clone(), reply);

        self.dispatcher.submit(work)?;
        Ok(PendingInference::new(self.id, rx, self.cancel))
    }
}

/// Build the unit of work that runs `job` on whatever slot it gets bound to.
fn bind_job<J>(id: Uuid, mut job: J, cancel: CancelHandle, reply: Arc<Reply<J::Output>>) -> UnitOfWork
where J: InferenceJob
{
    Box::new(move |slot: &BoundSlot| {
        if cancel.is_cancelled() {
            debug!(request = %id, "request cancelled before execution");
            reply.send(Err(DispatchError::Cancelled));
            return Err(DispatchError::Cancelled);
        }

        let fail = |source: BackendError| DispatchError::Backend {
            device: slot.device().to_string(),
            source,
        };

        if let Err(source) = job.prepare(slot) {
            reply.send(Err(fail(source.clone())));
            return Err(fail(source));
        }

        let on_complete = reply.clone();
        slot.set_continuation(move |slot, status| {
            on_complete.send(collect(id, job, slot, status));
        });

        debug!(request = %id, device = slot.device(), "starting request");
        slot.start_async().map_err(|source| {
            reply.send(Err(fail(source.clone())));
            fail(source)
        })
    })
}

fn collect<J>(id: Uuid, job: J, slot: &BoundSlot, status: CompletionStatus) -> Result<Completed<J::Output>>
where J: InferenceJob
{
    let fail = |source: BackendError| DispatchError::Backend {
        device: slot.device().to_string(),
        source,
    };
    if !status.is_ok() {
        return Err(fail(BackendError::from_status(status)));
    }
    let value = job.complete(slot, status).map_err(fail)?;
    Ok(Completed {
        request_id: id,
        device: slot.device().to_string(),
        status,
        value,
    })
}

/// Submits a job and waits for its outcome in one call.
#[async_trait]
pub trait InferenceDispatcher<J>
where J: InferenceJob
{
    /// Run `job` on whichever device picks it up first.
    async fn infer(&self, job: J) -> Result<Completed<J::Output>>;
}

#[async_trait]
impl<J> InferenceDispatcher<J> for MultiDeviceDispatcher
where J: InferenceJob
{
    async fn infer(&self, job: J) -> Result<Completed<J::Output>> {
        AsyncInferRequest::new(self, job).start_async()?.await
    }
}
