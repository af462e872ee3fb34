//! # Dispatch Core
//!
//! Matches queued units of work with idle execution slots.
//!
//! ## Key Components
//!
//! * `BackendRegistry` - The devices, their slots, and the priority order
//! * `SlotPool` - The idle slots of one device
//! * `WorkQueue` - Units of work waiting for a slot, oldest first
//! * `IdleGuard` - Puts a slot back into its pool unless the bound work claims it
//! * [`MultiDeviceDispatcher`] - Ties the above together
//!
//! There is no scheduler thread. A scheduling attempt runs on whichever thread
//! submits work or reports a completion.

mod dispatcher;
mod guard;
mod pool;
mod queue;
mod registry;
mod slot;

pub use dispatcher::MultiDeviceDispatcher;
pub use queue::UnitOfWork;
pub use slot::{BoundSlot, Continuation};
