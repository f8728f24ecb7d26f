#![forbid(unsafe_code)]

//! Listener contracts and the weak listener adapter.
//!
//! Listeners are plain `Rc<dyn Fn(..)>` callbacks; registration identity is
//! `Rc` pointer identity, so callers keep a clone of the `Rc` they registered
//! in order to remove or query it later.
//!
//! [`WeakListener`] wraps a listener in a non-owning handle. A registry entry
//! backed by a `WeakListener` does not keep the listener alive: once every
//! strong `Rc` is dropped (or [`WeakListener::clear`] is called by the owner
//! during teardown), the adapter reports itself reclaimed and the registry
//! drops it at the next delivery or mutation.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Invalidation observer: told *that* an observable changed, not what to.
pub type InvalidationCallback = dyn Fn(&dyn Observable);

/// Value-change observer, invoked with `(old, new)`.
pub type ChangeCallback<T> = dyn Fn(&T, &T);

/// Anything that can be observed for invalidation.
///
/// This is the registration surface shared by [`Property`](crate::Property)
/// and the observable collections; value- and list-change listeners are
/// registered through inherent methods on the concrete types since their
/// callback signatures differ.
pub trait Observable {
    /// Register `listener`. A no-op if this exact `Rc` is already registered.
    fn add_listener(&self, listener: Rc<InvalidationCallback>);
    /// Register a non-owning entry for `listener`.
    fn add_listener_weak(&self, listener: &Rc<InvalidationCallback>) -> Rc<WeakListener<InvalidationCallback>>;
    /// Remove `listener` (matched by identity, strong or weak referent).
    fn remove_listener(&self, listener: &Rc<InvalidationCallback>);
    /// Whether `listener` is currently registered.
    fn has_listener(&self, listener: &Rc<InvalidationCallback>) -> bool;
}

/// A non-owning wrapper around a listener of kind `L`.
///
/// One generic adapter covers every listener kind (invalidation, value
/// change, list change); the registry stores the adapter and forwards through
/// [`upgrade`](Self::upgrade) on each delivery.
///
/// # Invariants
///
/// 1. `was_reclaimed()` is monotone: once true it stays true.
/// 2. After [`clear`](Self::clear), `upgrade()` returns `None` even while
///    strong references to the referent still exist.
pub struct WeakListener<L: ?Sized> {
    handle: RefCell<Option<Weak<L>>>,
}

impl<L: ?Sized> WeakListener<L> {
    /// Create an adapter holding a weak handle to `listener`.
    pub fn new(listener: &Rc<L>) -> Rc<Self> {
        Rc::new(Self {
            handle: RefCell::new(Some(Rc::downgrade(listener))),
        })
    }

    /// Dereference the handle, or `None` if the referent is gone.
    pub fn upgrade(&self) -> Option<Rc<L>> {
        self.handle.borrow().as_ref().and_then(Weak::upgrade)
    }

    /// Explicitly release the handle.
    ///
    /// Used by the referent's owner during teardown; the registry purges the
    /// now-reclaimed entry lazily.
    pub fn clear(&self) {
        self.handle.borrow_mut().take();
    }

    /// Whether the referent has been dropped or the handle cleared.
    pub fn was_reclaimed(&self) -> bool {
        self.handle
            .borrow()
            .as_ref()
            .is_none_or(|w| w.strong_count() == 0)
    }

    /// Whether this adapter currently refers to `listener`.
    pub(crate) fn refers_to(&self, listener: &Rc<L>) -> bool {
        self.handle
            .borrow()
            .as_ref()
            .is_some_and(|w| std::ptr::addr_eq(w.as_ptr(), Rc::as_ptr(listener)))
    }
}

impl<L: ?Sized> std::fmt::Debug for WeakListener<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakListener")
            .field("reclaimed", &self.was_reclaimed())
            .finish()
    }
}
