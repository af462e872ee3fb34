//! # Async Request Facade
//!
//! The caller-facing side of the dispatcher. A caller describes one inference
//! as an [`InferenceJob`], submits it through an [`AsyncInferRequest`], and
//! gets back a [`PendingInference`] that resolves once a device has run it.
//!
//! ## Key Components
//!
//! * [`InferenceJob`] - Prepares a bound slot and collects its results
//! * [`AsyncInferRequest`] - Turns a job into a unit of work and submits it
//! * [`PendingInference`] - A future (or blocking handle) for the outcome
//! * [`InferenceDispatcher`] - Submit and await in one call
//!
//! ## Failure Reporting
//!
//! Failures never stay inside the dispatcher. A job that fails to prepare, a
//! slot that refuses to start, and a non-OK completion status all reach the
//! caller as [`crate::DispatchError::Backend`]. A request cancelled before it
//! reached a device resolves to [`crate::DispatchError::Cancelled`], and one
//! dropped at shutdown to [`crate::DispatchError::Abandoned`].

mod facade;
mod job;
mod pending;

pub use facade::{AsyncInferRequest, InferenceDispatcher};
pub use job::{Completed, InferenceJob};
pub use pending::{CancelHandle, PendingInference};
