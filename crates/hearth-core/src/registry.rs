//! [`ServiceCore`] – the central named-lookup table for services.
//!
//! Components publish themselves with [`ServiceCore::add`] and find each
//! other with [`ServiceCore::get`].  Names are unique: a second `add` with a
//! name that is already present is refused and leaves the registry
//! untouched.
//!
//! # Ordering
//!
//! The registry behaves as a list with the newest service at its head:
//!
//! - [`get`][ServiceCore::get] scans newest → oldest.
//! - [`dump`][ServiceCore::dump] and [`names`][ServiceCore::names] walk
//!   oldest → newest.
//! - On drop, services are released newest first, so a service registered
//!   on top of another one goes away before its dependency does.
//!
//! # Registration events
//!
//! [`ServiceCore::on_registered`] subscribes a callback that fires exactly
//! once per successful `add`, after the new service is visible.  `add` takes
//! `&mut self`, so observers cannot re-enter the registry while an event is
//! being delivered.

use std::fmt;
use std::io;
use std::rc::Rc;

use hearth_types::{HearthError, Service, ServiceHandle, downcast_service};
use tracing::{debug, trace};

use crate::observer::{ObserverId, ObserverList};

/// Callback type for the registration-notification event.
pub type RegistrationObserver = dyn FnMut(&ServiceHandle);

/// Single-threaded service registry.
///
/// # Example
///
/// ```
/// use hearth_core::ServiceCore;
/// use hearth_types::BasicService;
///
/// let mut core = ServiceCore::new();
/// assert!(core.add(BasicService::handle("kde-core", "KDE support")));
/// assert!(!core.add(BasicService::handle("kde-core", "dup")));
///
/// let kde = core.get("kde-core").unwrap();
/// assert_eq!(kde.description(), "KDE support");
/// ```
pub struct ServiceCore {
    // Stored oldest first; the logical head of the list is the last element.
    services: Vec<ServiceHandle>,
    observers: ObserverList<RegistrationObserver>,
}

impl ServiceCore {
    /// Create an empty registry with no observers.
    pub fn new() -> Self {
        Self {
            services: Vec::new(),
            observers: ObserverList::new(),
        }
    }

    /// Register `service`.
    ///
    /// Returns `false` without touching the registry (and without notifying
    /// anyone) when a service with the same name is already present.
    pub fn add(&mut self, service: ServiceHandle) -> bool {
        if self.contains(service.name()) {
            debug!(service = %service.name(), "refusing duplicate service registration");
            return false;
        }

        debug!(service = %service.name(), description = %service.description(), "service registered");
        self.services.push(Rc::clone(&service));

        for observer in self.observers.iter_mut() {
            observer(&service);
        }
        true
    }

    /// Like [`add`][Self::add], but reports a duplicate as
    /// [`HearthError::DuplicateName`].
    pub fn try_add(&mut self, service: ServiceHandle) -> Result<(), HearthError> {
        let name = service.name().to_string();
        if self.add(service) {
            Ok(())
        } else {
            Err(HearthError::DuplicateName(name))
        }
    }

    /// Look up the service called `name`.
    pub fn get(&self, name: &str) -> Option<ServiceHandle> {
        self.services
            .iter()
            .rev()
            .find(|service| service.name() == name)
            .cloned()
    }

    /// Look up `name` and downcast it to the concrete type `T`.
    ///
    /// Returns `None` when nothing is registered under `name` or when the
    /// registered service is of another type.
    pub fn get_as<T: Service>(&self, name: &str) -> Option<Rc<T>> {
        self.get(name).and_then(downcast_service::<T>)
    }

    /// Like [`get`][Self::get], but reports a miss as
    /// [`HearthError::NotFound`].
    pub fn require(&self, name: &str) -> Result<ServiceHandle, HearthError> {
        self.get(name)
            .ok_or_else(|| HearthError::NotFound(name.to_string()))
    }

    /// `true` when a service called `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.services.iter().any(|service| service.name() == name)
    }

    /// Number of registered services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Registered services, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ServiceHandle> {
        self.services.iter()
    }

    /// Registered service names, oldest first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|service| service.name())
    }

    /// Write one `name: description` line per service to `sink`, oldest
    /// first.
    pub fn dump<W: io::Write>(&self, sink: &mut W) -> io::Result<()> {
        for service in self.iter() {
            writeln!(sink, "{}: {}", service.name(), service.description())?;
        }
        Ok(())
    }

    /// Subscribe `observer` to the registration event.
    ///
    /// Observers are called in subscription order with the exact handle
    /// that was added.
    pub fn on_registered<F>(&mut self, observer: F) -> ObserverId
    where
        F: FnMut(&ServiceHandle) + 'static,
    {
        self.observers.subscribe(Box::new(observer))
    }

    /// Drop the subscription `id`.  Returns `false` if it was unknown.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }
}

impl Default for ServiceCore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ServiceCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCore")
            .field("services", &self.names().collect::<Vec<_>>())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Drop for ServiceCore {
    fn drop(&mut self) {
        while let Some(service) = self.services.pop() {
            trace!(
                service = %service.name(),
                other_holders = Rc::strong_count(&service) - 1,
                "releasing service"
            );
        }
    }
}
