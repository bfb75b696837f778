#![forbid(unsafe_code)]

//! Ownership-free notification channels.
//!
//! # Design
//!
//! A [`Signal<E>`] is a shared list of subscriber callbacks. The signal only
//! holds `Weak` references; the strong `Rc` lives in the [`Subscription`]
//! guard returned to the subscriber, so dropping the guard unsubscribes.
//! Cloning a `Signal` yields another handle onto the same list.
//!
//! # Failure Modes
//!
//! - **Re-entrant emit**: a callback may emit on the same signal; the
//!   callback list is snapshotted before dispatch, so no borrow is held while
//!   callbacks run.
//! - **Subscriber leak**: dead entries are pruned lazily on the next emit.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type CallbackRc<E> = Rc<dyn Fn(&E)>;
type CallbackWeak<E> = Weak<dyn Fn(&E)>;

/// A multicast notification channel carrying events of type `E`.
pub struct Signal<E> {
    subscribers: Rc<RefCell<Vec<CallbackWeak<E>>>>,
}

impl<E> Clone for Signal<E> {
    fn clone(&self) -> Self {
        Self {
            subscribers: Rc::clone(&self.subscribers),
        }
    }
}

impl<E> Default for Signal<E> {
    fn default() -> Self {
        Self {
            subscribers: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl<E> fmt::Debug for Signal<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("subscriber_count", &self.subscribers.borrow().len())
            .finish()
    }
}

impl<E: 'static> Signal<E> {
    /// Create a signal with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback`. It stays registered while the returned guard is
    /// alive.
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&E) + 'static) -> Subscription {
        let strong: CallbackRc<E> = Rc::new(callback);
        self.subscribers.borrow_mut().push(Rc::downgrade(&strong));
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Deliver `event` to every live subscriber in registration order.
    pub fn emit(&self, event: &E) {
        let callbacks: Vec<CallbackRc<E>> = {
            let mut subs = self.subscribers.borrow_mut();
            subs.retain(|w| w.strong_count() > 0);
            subs.iter().filter_map(Weak::upgrade).collect()
        };
        for cb in &callbacks {
            cb(event);
        }
    }

    /// Registered subscribers, including dead ones not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }
}

/// RAII guard for a subscriber callback.
pub struct Subscription {
    _guard: Box<dyn Any>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
