//! `hearth-core` – the service registry.
//!
//! Independently initialized components publish named services here and
//! discover each other by name, without a compile-time dependency graph.
//!
//! # Modules
//!
//! - [`registry`] – [`ServiceCore`][registry::ServiceCore]: the
//!   single-threaded registry.  Unique names, newest-first lookup,
//!   oldest-first dump, newest-first teardown, and a synchronous
//!   registration-notification event.
//! - [`shared`] – [`SharedServiceCore`][shared::SharedServiceCore]: the same
//!   contract behind a single mutex for multi-threaded hosts, with
//!   notifications queued and delivered outside the lock.
//! - [`observer`] – [`ObserverId`][observer::ObserverId] subscription
//!   handles.

pub mod observer;
pub mod registry;
pub mod shared;

pub use observer::ObserverId;
pub use registry::{RegistrationObserver, ServiceCore};
pub use shared::{SharedServiceCore, SyncRegistrationObserver, SyncService, SyncServiceHandle};
