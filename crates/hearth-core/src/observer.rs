//! Ordered observer list backing the registration-notification event.
//!
//! Observers are invoked in subscription order. Each subscription is
//! identified by an [`ObserverId`] so it can later be removed without
//! disturbing the order of the remaining observers.

/// Identifies one subscription on a registry's registration event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

/// Ordered list of boxed callbacks.
///
/// `F` is the (unsized) callback trait object, e.g.
/// `dyn FnMut(&ServiceHandle)`.
pub(crate) struct ObserverList<F: ?Sized> {
    next_id: u64,
    entries: Vec<(ObserverId, Box<F>)>,
}

impl<F: ?Sized> ObserverList<F> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    /// Append `observer`; it runs after every observer subscribed before it.
    pub(crate) fn subscribe(&mut self, observer: Box<F>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, observer));
        id
    }

    /// Remove the subscription `id`.  Returns `false` if it is unknown (or
    /// was already removed).
    pub(crate) fn unsubscribe(&mut self, id: ObserverId) -> bool {
        match self.entries.iter().position(|(entry_id, _)| *entry_id == id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<F>> {
        self.entries.iter_mut().map(|(_, observer)| observer)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Move every entry out, keeping the id counter so later subscriptions
    /// still get fresh ids.
    pub(crate) fn detach(&mut self) -> Vec<(ObserverId, Box<F>)> {
        std::mem::take(&mut self.entries)
    }

    /// Put entries taken by [`detach`][Self::detach] back in front of any
    /// subscribed since.
    pub(crate) fn reattach(&mut self, mut detached: Vec<(ObserverId, Box<F>)>) {
        detached.append(&mut self.entries);
        self.entries = detached;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Callback = dyn FnMut(&mut Vec<&'static str>);

    #[test]
    fn observers_run_in_subscription_order() {
        let mut list: ObserverList<Callback> = ObserverList::new();
        list.subscribe(Box::new(|log: &mut Vec<&'static str>| log.push("first")));
        list.subscribe(Box::new(|log: &mut Vec<&'static str>| log.push("second")));

        let mut log = Vec::new();
        for observer in list.iter_mut() {
            observer(&mut log);
        }
        assert_eq!(log, vec!["first", "second"]);
    }

    #[test]
    fn unsubscribe_removes_only_that_observer() {
        let mut list: ObserverList<Callback> = ObserverList::new();
        let a = list.subscribe(Box::new(|log: &mut Vec<&'static str>| log.push("a")));
        list.subscribe(Box::new(|log: &mut Vec<&'static str>| log.push("b")));

        assert!(list.unsubscribe(a));
        assert!(!list.unsubscribe(a));
        assert_eq!(list.len(), 1);

        let mut log = Vec::new();
        for observer in list.iter_mut() {
            observer(&mut log);
        }
        assert_eq!(log, vec!["b"]);
    }

    #[test]
    fn reattach_keeps_subscription_order() {
        let mut list: ObserverList<Callback> = ObserverList::new();
        list.subscribe(Box::new(|log: &mut Vec<&'static str>| log.push("old")));
        let detached = list.detach();
        assert_eq!(list.len(), 0);

        let late = list.subscribe(Box::new(|log: &mut Vec<&'static str>| log.push("late")));
        assert!(detached.iter().all(|(id, _)| *id < late));
        list.reattach(detached);

        let mut log = Vec::new();
        for observer in list.iter_mut() {
            observer(&mut log);
        }
        assert_eq!(log, vec!["old", "late"]);
    }

    #[test]
    fn ids_are_never_reused() {
        let mut list: ObserverList<Callback> = ObserverList::new();
        let a = list.subscribe(Box::new(|_: &mut Vec<&'static str>| {}));
        list.unsubscribe(a);
        let b = list.subscribe(Box::new(|_: &mut Vec<&'static str>| {}));
        assert_ne!(a, b);
    }
}
