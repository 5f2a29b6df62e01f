//! Synchronous observable-subject capability.
//!
//! `Subject` is the notification primitive the whole engine composes:
//! handlers are invoked synchronously, in registration order, from a
//! snapshot taken before the first handler runs. Handlers may therefore
//! subscribe and unsubscribe freely (including themselves) while an
//! emission is in flight; a handler removed mid-emission still observes
//! the event it was registered for when the emission started.
//!
//! `SubscriptionLedger` records cancellation thunks for subscriptions taken
//! during a reconciliation pass so they can be released atomically,
//! regardless of which branches the pass took.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Identifies one registered handler on one [`Subject`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// A synchronous broadcast subject for events of type `E`.
pub struct Subject<E> {
    next_id: Cell<u64>,
    handlers: RefCell<Vec<(HandlerId, Rc<dyn Fn(&E)>)>>,
}

impl<E> Subject<E> {
    /// Creates a subject with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            handlers: RefCell::new(Vec::new()),
        }
    }

    /// Registers a handler and returns its id.
    pub fn subscribe<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&E) + 'static,
    {
        let id = HandlerId(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        self.handlers.borrow_mut().push((id, Rc::new(handler)));
        id
    }

    /// Removes a handler. Returns false if the id was not registered.
    pub fn unsubscribe(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let before = handlers.len();
        handlers.retain(|(h, _)| *h != id);
        handlers.len() != before
    }

    /// Invokes every handler registered at the time of the call.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Rc<dyn Fn(&E)>> = self
            .handlers
            .borrow()
            .iter()
            .map(|(_, h)| Rc::clone(h))
            .collect();
        for handler in snapshot {
            handler(event);
        }
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().len()
    }
}

impl<E> Default for Subject<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Subject<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject")
            .field("handlers", &self.handler_count())
            .finish()
    }
}

/// Records subscriptions so they can be released atomically.
///
/// Each entry is a cancellation thunk capturing whatever is needed to undo
/// one subscription. [`SubscriptionLedger::release_all`] runs and clears
/// them; releasing an already-empty ledger is a no-op.
#[derive(Default)]
pub struct SubscriptionLedger {
    entries: RefCell<Vec<Box<dyn FnOnce()>>>,
}

impl SubscriptionLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a cancellation thunk.
    pub fn record<F>(&self, cancel: F)
    where
        F: FnOnce() + 'static,
    {
        self.entries.borrow_mut().push(Box::new(cancel));
    }

    /// Runs every recorded thunk and clears the ledger.
    pub fn release_all(&self) {
        let entries: Vec<Box<dyn FnOnce()>> = self.entries.borrow_mut().drain(..).collect();
        for cancel in entries {
            cancel();
        }
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// True if nothing is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl fmt::Debug for SubscriptionLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionLedger")
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_subscribe_and_emit() {
        let subject: Subject<u32> = Subject::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let log = Rc::clone(&seen);
        subject.subscribe(move |n| log.borrow_mut().push(*n));

        subject.emit(&1);
        subject.emit(&2);
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let subject: Subject<u32> = Subject::new();
        let seen = Rc::new(RefCell::new(0u32));

        let log = Rc::clone(&seen);
        let id = subject.subscribe(move |n| *log.borrow_mut() += *n);

        subject.emit(&1);
        assert!(subject.unsubscribe(id));
        assert!(!subject.unsubscribe(id));
        subject.emit(&1);

        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn test_emit_uses_snapshot() {
        // A handler that subscribes another handler mid-emission: the new
        // handler must not observe the in-flight event.
        let subject: Rc<Subject<u32>> = Rc::new(Subject::new());
        let late_seen = Rc::new(RefCell::new(0u32));

        let subj = Rc::clone(&subject);
        let late = Rc::clone(&late_seen);
        subject.subscribe(move |_| {
            let late = Rc::clone(&late);
            subj.subscribe(move |n| *late.borrow_mut() += *n);
        });

        subject.emit(&10);
        assert_eq!(*late_seen.borrow(), 0);
        subject.emit(&10);
        // Two handlers were added by now (one per emission); the first one
        // sees the second event.
        assert_eq!(*late_seen.borrow(), 10);
    }

    #[test]
    fn test_handler_can_remove_itself() {
        let subject: Rc<Subject<u32>> = Rc::new(Subject::new());
        let count = Rc::new(RefCell::new(0u32));

        let subj = Rc::clone(&subject);
        let seen = Rc::clone(&count);
        let slot: Rc<RefCell<Option<HandlerId>>> = Rc::new(RefCell::new(None));
        let slot_inner = Rc::clone(&slot);
        let id = subject.subscribe(move |_| {
            *seen.borrow_mut() += 1;
            if let Some(id) = slot_inner.borrow_mut().take() {
                subj.unsubscribe(id);
            }
        });
        *slot.borrow_mut() = Some(id);

        subject.emit(&0);
        subject.emit(&0);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_ledger_releases_everything_once() {
        let ledger = SubscriptionLedger::new();
        let released = Rc::new(RefCell::new(0u32));

        for _ in 0..3 {
            let counter = Rc::clone(&released);
            ledger.record(move || *counter.borrow_mut() += 1);
        }
        assert_eq!(ledger.len(), 3);

        ledger.release_all();
        assert_eq!(*released.borrow(), 3);
        assert!(ledger.is_empty());

        ledger.release_all();
        assert_eq!(*released.borrow(), 3);
    }

    #[test]
    fn test_ledger_release_unsubscribes_subject() {
        let subject: Subject<u32> = Subject::new();
        let ledger = SubscriptionLedger::new();
        let subject = Rc::new(subject);

        let id = subject.subscribe(|_| {});
        let subj = Rc::clone(&subject);
        ledger.record(move || {
            subj.unsubscribe(id);
        });

        assert_eq!(subject.handler_count(), 1);
        ledger.release_all();
        assert_eq!(subject.handler_count(), 0);
    }
}
