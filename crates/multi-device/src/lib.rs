//! # Multi-Device
//!
//! Spreads inference requests for one network across several execution
//! devices, each with its own pool of reusable execution slots.
//!
//! ## Overview
//!
//! A caller hands the dispatcher units of work. The dispatcher keeps them in a
//! single FIFO queue and, whenever a slot is free, binds the oldest unit to an
//! idle slot of the highest-priority device that has one. The unit prepares the
//! slot and starts asynchronous execution; the backend later reports completion
//! on its own thread, the slot goes back to its pool, and the next unit is bound.
//!
//! Key components include:
//!
//! - Device backend traits, implemented once per kind of device
//! - A thread-safe dispatcher with runtime-adjustable device priorities
//! - An async request facade resolving to per-request results
//! - Textual configuration and metric introspection
//!
//! ## Architecture
//!
//! ### Backend Traits
//!
//! The [`backend::Backend`] and [`backend::ExecutionSlot`] traits are the only
//! thing a device has to provide. The dispatcher never looks inside a slot.
//!
//! ### Priorities
//!
//! Device priorities are written as `NAME[(N)],...`, e.g. `GPU(4),CPU`. The
//! optional `N` overrides how many slots a device gets at construction. Only
//! the order can change afterwards; see
//! [`MultiDeviceDispatcher::set_priorities`].
//!
//! ### Requests
//!
//! Most callers go through [`request::InferenceDispatcher::infer`], which takes
//! an [`request::InferenceJob`] and resolves to its output along with the
//! device that ran it.
//!
//! ## Implementation Details
//!
//! Scheduling has no thread of its own. It runs inline on the submitting thread
//! and on backend completion threads. A slot is bound to at most one unit of
//! work at a time, and a unit of work is bound at most once.
//!

mod dispatch;

pub mod backend;
pub mod config;
pub mod error;
pub mod metrics;
pub mod request;

pub use config::DeviceInformation;
pub use dispatch::{BoundSlot, Continuation, MultiDeviceDispatcher, UnitOfWork};
pub use error::{BackendError, DispatchError, Result};
