//! [`SharedServiceCore`] – the registry adapted to a multi-threaded host.
//!
//! Semantics match [`ServiceCore`][crate::ServiceCore]: unique names,
//! newest-first lookup, oldest-first enumeration, newest-first teardown and
//! exactly one notification per successful registration.
//!
//! # Locking
//!
//! A single mutex guards the service list for `add`, `get` and `dump`.
//! Registration events are queued while that lock is held, so the queue
//! order is the registration order, and dispatched after it is released.
//!
//! Only one thread dispatches at a time.  An `add` issued while a dispatch
//! is in progress (from another thread, or from inside an observer) only
//! enqueues, and the active dispatcher delivers it.  The dispatcher runs
//! callbacks without holding any registry lock, so observers may add
//! services, subscribe and unsubscribe.  An observer subscribed during a
//! dispatch sees the events queued after the one in progress.  An observer
//! unsubscribed during a dispatch receives no further events.

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use hearth_types::{HearthError, Service};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::observer::{ObserverId, ObserverList};

/// A [`Service`] that can be shared across threads.
///
/// Blanket-implemented for every `Service + Send + Sync`.
pub trait SyncService: Service + Send + Sync {
    /// Convert a shared handle into `Arc<dyn Any>` for downcasting.
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Service + Send + Sync> SyncService for T {
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Thread-safe shared handle to a registered service.
pub type SyncServiceHandle = Arc<dyn SyncService>;

/// Callback type for [`SharedServiceCore`] registration events.
pub type SyncRegistrationObserver = dyn FnMut(&SyncServiceHandle) + Send;

/// Mutex-protected service registry.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use hearth_core::SharedServiceCore;
/// use hearth_types::BasicService;
///
/// let core = SharedServiceCore::new();
/// std::thread::scope(|s| {
///     s.spawn(|| core.add(Arc::new(BasicService::new("call-core", "Calls"))));
///     s.spawn(|| core.add(Arc::new(BasicService::new("chat-core", "Chats"))));
/// });
/// assert_eq!(core.len(), 2);
/// ```
pub struct SharedServiceCore {
    // Oldest first, as in `ServiceCore`.
    services: Mutex<Vec<SyncServiceHandle>>,
    pending: Mutex<VecDeque<SyncServiceHandle>>,
    subscriptions: Mutex<Subscriptions>,
    dispatching: AtomicBool,
}

struct Subscriptions {
    list: ObserverList<SyncRegistrationObserver>,
    // Ids of the observers currently held by the dispatcher.
    detached: Vec<ObserverId>,
    // Detached observers unsubscribed mid-dispatch.
    cancelled: Vec<ObserverId>,
}

type Detached = Vec<(ObserverId, Box<SyncRegistrationObserver>)>;

impl SharedServiceCore {
    pub fn new() -> Self {
        Self {
            services: Mutex::new(Vec::new()),
            pending: Mutex::new(VecDeque::new()),
            subscriptions: Mutex::new(Subscriptions {
                list: ObserverList::new(),
                detached: Vec::new(),
                cancelled: Vec::new(),
            }),
            dispatching: AtomicBool::new(false),
        }
    }

    /// Register `service`.  Returns `false`, with no mutation and no
    /// notification, when the name is already taken.
    pub fn add(&self, service: SyncServiceHandle) -> bool {
        {
            let mut services = self.services.lock();
            if services.iter().any(|s| s.name() == service.name()) {
                debug!(service = %service.name(), "refusing duplicate service registration");
                return false;
            }
            debug!(service = %service.name(), description = %service.description(), "service registered");
            services.push(Arc::clone(&service));
            self.pending.lock().push_back(service);
        }
        self.dispatch_pending();
        true
    }

    /// Like [`add`][Self::add], but reports a duplicate as
    /// [`HearthError::DuplicateName`].
    pub fn try_add(&self, service: SyncServiceHandle) -> Result<(), HearthError> {
        let name = service.name().to_string();
        if self.add(service) {
            Ok(())
        } else {
            Err(HearthError::DuplicateName(name))
        }
    }

    /// Look up the service called `name`, newest first.
    pub fn get(&self, name: &str) -> Option<SyncServiceHandle> {
        self.services
            .lock()
            .iter()
            .rev()
            .find(|service| service.name() == name)
            .cloned()
    }

    /// Look up `name` and downcast it to the concrete type `T`.
    pub fn get_as<T: Service + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.get(name)
            .and_then(|service| service.into_any_arc().downcast::<T>().ok())
    }

    /// Like [`get`][Self::get], but reports a miss as
    /// [`HearthError::NotFound`].
    pub fn require(&self, name: &str) -> Result<SyncServiceHandle, HearthError> {
        self.get(name)
            .ok_or_else(|| HearthError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.lock().iter().any(|service| service.name() == name)
    }

    pub fn len(&self) -> usize {
        self.services.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.lock().is_empty()
    }

    /// Snapshot of the registered names, oldest first.
    pub fn names(&self) -> Vec<String> {
        self.services
            .lock()
            .iter()
            .map(|service| service.name().to_string())
            .collect()
    }

    /// Write one `name: description` line per service, oldest first.  The
    /// registry lock is held for the whole dump.
    pub fn dump<W: io::Write>(&self, sink: &mut W) -> io::Result<()> {
        let services = self.services.lock();
        for service in services.iter() {
            writeln!(sink, "{}: {}", service.name(), service.description())?;
        }
        Ok(())
    }

    /// Subscribe `observer` to the registration event.
    pub fn on_registered<F>(&self, observer: F) -> ObserverId
    where
        F: FnMut(&SyncServiceHandle) + Send + 'static,
    {
        self.subscriptions.lock().list.subscribe(Box::new(observer))
    }

    /// Drop the subscription `id`.  Returns `false` if it was unknown.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut subs = self.subscriptions.lock();
        if subs.list.unsubscribe(id) {
            return true;
        }
        if subs.detached.contains(&id) && !subs.cancelled.contains(&id) {
            subs.cancelled.push(id);
            return true;
        }
        false
    }

    fn dispatch_pending(&self) {
        loop {
            // Someone else is dispatching; they will pick our event up.
            if self
                .dispatching
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_err()
            {
                return;
            }
            Dispatch::begin(self).run();
            // An event may have been queued between the last pop and the
            // flag reset; its producer saw the flag set and left it to us.
            if self.pending.lock().is_empty() {
                return;
            }
        }
    }
}

/// The observers borrowed by the active dispatcher.  Dropping it hands them
/// back and clears the dispatching flag, also when an observer panics.
struct Dispatch<'a> {
    core: &'a SharedServiceCore,
    observers: Detached,
}

impl<'a> Dispatch<'a> {
    fn begin(core: &'a SharedServiceCore) -> Self {
        Self {
            core,
            observers: Vec::new(),
        }
    }

    fn run(&mut self) {
        loop {
            let next = self.core.pending.lock().pop_front();
            let Some(service) = next else {
                break;
            };

            let cancelled = {
                let mut subs = self.core.subscriptions.lock();
                let joined = subs.list.detach();
                subs.detached.extend(joined.iter().map(|(id, _)| *id));
                self.observers.extend(joined);
                subs.cancelled.clone()
            };

            trace!(service = %service.name(), observers = self.observers.len(), "dispatching registration");
            for (id, observer) in self.observers.iter_mut() {
                if !cancelled.contains(id) {
                    observer(&service);
                }
            }
        }
    }
}

impl Drop for Dispatch<'_> {
    fn drop(&mut self) {
        let observers = mem::take(&mut self.observers);
        let removed = {
            let mut subs = self.core.subscriptions.lock();
            let cancelled = mem::take(&mut subs.cancelled);
            subs.detached.clear();
            let (removed, kept): (Detached, Detached) = observers
                .into_iter()
                .partition(|(id, _)| cancelled.contains(id));
            subs.list.reattach(kept);
            removed
        };
        // Released outside the lock; a captured value may call back in.
        drop(removed);
        self.core.dispatching.store(false, Ordering::Release);
    }
}

impl Default for SharedServiceCore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SharedServiceCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedServiceCore")
            .field("services", &self.names())
            .finish_non_exhaustive()
    }
}

impl Drop for SharedServiceCore {
    fn drop(&mut self) {
        self.pending.get_mut().clear();
        let services = self.services.get_mut();
        while let Some(service) = services.pop() {
            trace!(
                service = %service.name(),
                other_holders = Arc::strong_count(&service) - 1,
                "releasing service"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_types::BasicService;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn basic(name: &str, description: &str) -> SyncServiceHandle {
        Arc::new(BasicService::new(name, description))
    }

    struct Tracked {
        name: String,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Service for Tracked {
        fn name(&self) -> &str {
            &self.name
        }

        fn description(&self) -> &str {
            "tracked"
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.log.lock().push(self.name.clone());
        }
    }

    #[test]
    fn duplicate_is_refused_without_notification() {
        let core = SharedServiceCore::new();
        let events = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&events);
        core.on_registered(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(core.add(basic("kde-core", "KDE support")));
        assert!(!core.add(basic("kde-core", "dup")));

        assert_eq!(core.get("kde-core").unwrap().description(), "KDE support");
        assert_eq!(events.load(Ordering::SeqCst), 1);
        assert!(matches!(
            core.try_add(basic("kde-core", "again")),
            Err(HearthError::DuplicateName(_))
        ));
    }

    #[test]
    fn observer_may_reenter_the_registry() {
        let core = Arc::new(SharedServiceCore::new());
        let inner = Arc::clone(&core);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let id = core.on_registered(move |service| {
            log.lock().push(service.name().to_string());
            // Registering from inside the callback must neither deadlock nor
            // lose the nested event.
            if service.name() == "presence-core" {
                assert!(inner.get("presence-core").is_some());
                inner.add(basic("status-icon", "Status icon"));
            }
        });

        core.add(basic("presence-core", "Presence"));

        assert_eq!(*seen.lock(), vec!["presence-core", "status-icon"]);
        assert_eq!(core.names(), vec!["presence-core", "status-icon"]);

        // The observer holds `inner`; release it to break the cycle.
        assert!(core.unsubscribe(id));
    }

    #[test]
    fn observer_may_subscribe_during_dispatch() {
        let core = Arc::new(SharedServiceCore::new());
        let inner = Arc::clone(&core);
        let late_seen = Arc::new(Mutex::new(Vec::new()));
        let mut late_log = Some(Arc::clone(&late_seen));
        let id = core.on_registered(move |_| {
            if let Some(log) = late_log.take() {
                inner.on_registered(move |service| log.lock().push(service.name().to_string()));
            }
        });

        assert!(core.add(basic("call-core", "Calls")));
        assert!(core.add(basic("chat-core", "Chats")));

        // Subscribed while "call-core" was being delivered.
        assert_eq!(*late_seen.lock(), vec!["chat-core"]);
        assert!(core.unsubscribe(id));
    }

    #[test]
    fn observer_may_unsubscribe_itself() {
        let core = Arc::new(SharedServiceCore::new());
        let inner = Arc::clone(&core);
        let own_id = Arc::new(Mutex::new(None::<ObserverId>));
        let slot = Arc::clone(&own_id);
        let events = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&events);

        let id = core.on_registered(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = slot.lock().take() {
                assert!(inner.unsubscribe(id));
            }
        });
        *own_id.lock() = Some(id);

        core.add(basic("call-core", "Calls"));
        core.add(basic("chat-core", "Chats"));

        assert_eq!(events.load(Ordering::SeqCst), 1);
        assert!(!core.unsubscribe(id));
    }

    #[test]
    fn add_during_subscription_is_still_notified() {
        let core = SharedServiceCore::new();
        let events = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&events);
        core.on_registered(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        std::thread::scope(|s| {
            // Stands in for another thread inside `on_registered`.
            let held = core.subscriptions.lock();
            let adder = s.spawn(|| core.add(basic("call-core", "Calls")));
            std::thread::sleep(std::time::Duration::from_millis(50));
            drop(held);
            assert!(adder.join().unwrap());
        });

        assert_eq!(events.load(Ordering::SeqCst), 1);
        assert!(core.pending.lock().is_empty());
    }

    #[test]
    fn subscription_churn_does_not_lose_events() {
        let core = SharedServiceCore::new();
        let events = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&events);
        core.on_registered(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        std::thread::scope(|s| {
            let core = &core;
            s.spawn(move || {
                for _ in 0..200 {
                    let id = core.on_registered(|_| {});
                    assert!(core.unsubscribe(id));
                }
            });
            for t in 0..4 {
                s.spawn(move || {
                    for i in 0..25 {
                        core.add(basic(&format!("service-{t}-{i}"), "x"));
                    }
                });
            }
        });

        assert_eq!(events.load(Ordering::SeqCst), 100);
        assert_eq!(core.len(), 100);
        assert_eq!(core.subscriptions.lock().list.len(), 1);
    }

    #[test]
    fn concurrent_adds_of_one_name_have_a_single_winner() {
        let core = SharedServiceCore::new();
        let events = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&events);
        core.on_registered(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let wins = AtomicUsize::new(0);
        std::thread::scope(|s| {
            for i in 0..8 {
                let core = &core;
                let wins = &wins;
                s.spawn(move || {
                    if core.add(basic("call-core", &format!("thread {i}"))) {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(wins.load(Ordering::SeqCst), 1);
        assert_eq!(events.load(Ordering::SeqCst), 1);
        assert_eq!(core.len(), 1);
    }

    #[test]
    fn concurrent_distinct_adds_all_notify() {
        let core = SharedServiceCore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        core.on_registered(move |service| log.lock().push(service.name().to_string()));

        std::thread::scope(|s| {
            for i in 0..16 {
                let core = &core;
                s.spawn(move || core.add(basic(&format!("service-{i}"), "x")));
            }
        });

        // Every registration is delivered exactly once, in registration order.
        assert_eq!(*seen.lock(), core.names());
        assert_eq!(core.len(), 16);
    }

    #[test]
    fn typed_lookup() {
        let core = SharedServiceCore::new();
        core.add(basic("basic", "plain"));
        assert_eq!(core.get_as::<BasicService>("basic").unwrap().description(), "plain");
        assert!(core.get_as::<Tracked>("basic").is_none());
        assert!(matches!(core.require("missing"), Err(HearthError::NotFound(_))));
    }

    #[test]
    fn dump_and_teardown_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let kept;
        {
            let core = SharedServiceCore::new();
            for name in ["base", "middle", "top"] {
                core.add(Arc::new(Tracked {
                    name: name.to_string(),
                    log: Arc::clone(&log),
                }));
            }
            let mut out = Vec::new();
            core.dump(&mut out).unwrap();
            assert_eq!(
                String::from_utf8(out).unwrap(),
                "base: tracked\nmiddle: tracked\ntop: tracked\n"
            );
            kept = core.get("middle").unwrap();
        }
        assert_eq!(*log.lock(), vec!["top", "base"]);
        drop(kept);
        assert_eq!(*log.lock(), vec!["top", "base", "middle"]);
    }
}
