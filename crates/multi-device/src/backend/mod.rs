//! # Device Backends
//!
//! This module defines the interface every execution device must provide to be
//! driven by the dispatcher. The dispatcher owns no computation: a backend
//! compiles and runs the network, the dispatcher only decides which of the
//! backend's execution slots receives the next unit of work.
//!
//! ## Usage
//!
//! Users of this crate plug a device in by:
//!
//! 1. Implementing [`ExecutionSlot`] for the device's native infer-request object
//! 2. Implementing [`Backend`] for the loaded network that creates those slots
//! 3. Handing the backend to [`crate::MultiDeviceDispatcher::new`] under a device name
//!
//! Backends of different kinds can be mixed freely; the dispatcher works on
//! trait objects.

mod core_trait;

// Re-export the core traits for convenient imports
pub use core_trait::*;


#[cfg(test)]
/// Mock backend implementation.
///
/// Slots complete either when a test tells them to, or from a spawned thread.
pub(crate) mod mock_backend;
